//! Handshake state machine.
//!
//! The machine is pure: one step maps (current state, inbound packet) to
//! (next state, required [`Effect`]). It performs no I/O and never fails;
//! protocol violations are ordinary outputs ([`Effect::CloseError`]), not
//! errors.
//!
//! State path: `Init -> Negotiating -> Ready -> Close`, strictly forward.
//! There is no recovery within a session; a violated session is replaced,
//! never repaired.
//!
//! The active opener calls [`ProtocolFsm::on_session_start`], which emits
//! the first HELLO and advances to `Negotiating` (HELLO_ACK is then the
//! only acceptable reply). The passive opener stays in `Init` until the
//! peer's HELLO arrives and answers with HELLO_ACK.

use crate::packet::{Packet, PacketType};

/// Protocol-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Fresh session, no handshake traffic yet.
    Init,
    /// Handshake in progress.
    Negotiating,
    /// Handshake complete, data transfer active.
    Ready,
    /// Session over; every further input is a violation.
    Close,
}

/// Tolerance for DATA frames that arrive before the handshake completes.
///
/// A peer may pipeline DATA behind its HELLO_ACK; whether that is accepted
/// is a policy choice, not a fixed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EarlyDataPolicy {
    /// Ignore DATA received in `Negotiating` (default).
    #[default]
    Tolerate,
    /// Treat DATA received in `Negotiating` as a protocol violation.
    Reject,
}

/// Declarative outcome of one state-machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to do; keep receiving.
    None,
    /// Transmit these packets, in order.
    Send(Vec<Packet>),
    /// Peer initiated an orderly shutdown; finish writes, stop reading.
    CloseGraceful,
    /// Protocol violation; abort the connection.
    CloseError,
}

impl Effect {
    /// Append a packet to a `Send` effect's output list.
    ///
    /// No-op on any other variant; only the producer appends, before the
    /// effect is returned.
    pub fn push_output(&mut self, packet: Packet) {
        if let Effect::Send(outputs) = self {
            outputs.push(packet);
        }
    }
}

/// The handshake state machine. One instance per session.
#[derive(Debug)]
pub struct ProtocolFsm {
    state: ProtocolState,
    early_data: EarlyDataPolicy,
}

impl ProtocolFsm {
    /// Create a machine in `Init` with the default early-data policy.
    pub fn new() -> Self {
        Self::with_policy(EarlyDataPolicy::default())
    }

    /// Create a machine in `Init` with an explicit early-data policy.
    pub fn with_policy(early_data: EarlyDataPolicy) -> Self {
        Self {
            state: ProtocolState::Init,
            early_data,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Whether the machine has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.state == ProtocolState::Close
    }

    /// Active-open step: emit the initial HELLO.
    ///
    /// Legal only in `Init`; afterwards the machine expects HELLO_ACK, so
    /// it advances to `Negotiating` here. Calling from any other state is
    /// a violation.
    pub fn on_session_start(&mut self) -> Effect {
        if self.state != ProtocolState::Init {
            return Effect::CloseError;
        }
        self.state = ProtocolState::Negotiating;
        Effect::Send(vec![Packet::hello()])
    }

    /// Feed one inbound packet through the transition table.
    pub fn handle_packet(&mut self, packet: &Packet) -> Effect {
        match self.state {
            ProtocolState::Init => match packet.packet_type() {
                PacketType::Hello => {
                    self.state = ProtocolState::Negotiating;
                    Effect::Send(vec![Packet::hello_ack()])
                }
                _ => Effect::CloseError,
            },
            ProtocolState::Negotiating => match packet.packet_type() {
                PacketType::HelloAck => {
                    self.state = ProtocolState::Ready;
                    Effect::None
                }
                PacketType::Data if self.early_data == EarlyDataPolicy::Tolerate => Effect::None,
                // The passive opener never sees a HELLO_ACK, so an orderly
                // shutdown can reach it while still negotiating.
                PacketType::Close => {
                    self.state = ProtocolState::Close;
                    Effect::CloseGraceful
                }
                _ => Effect::CloseError,
            },
            ProtocolState::Ready => match packet.packet_type() {
                PacketType::Data => Effect::None,
                PacketType::Close => {
                    self.state = ProtocolState::Close;
                    Effect::CloseGraceful
                }
                _ => Effect::CloseError,
            },
            ProtocolState::Close => Effect::CloseError,
        }
    }
}

impl Default for ProtocolFsm {
    fn default() -> Self {
        Self::new()
    }
}
