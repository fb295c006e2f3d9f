//! Session: binds one connection to one state machine.
//!
//! A session owns exactly one [`Connection`] and one [`ProtocolFsm`] and
//! converts the machine's declarative effects into transport actions. It
//! guarantees that decoded packets reach the listener and the machine at
//! most once and in arrival order, and that at most one receive is in
//! flight on the connection at any time.
//!
//! Session lifecycle is `Init -> Running -> Closed`; `Closed` is
//! absorbing. It is independent of, but coordinated with, the protocol
//! state: protocol progress requires `Running`, and a terminal protocol
//! outcome forces `Closed`.

pub mod ready;

pub use ready::ReadyGate;

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::constants::SESSION_READ_BUFFER_SIZE;
use crate::core::error::TransportError;
use crate::packet::codec::{self, Accumulator};
use crate::packet::Packet;
use crate::protocol::{Effect, ProtocolFsm, ProtocolState};
use crate::transport::Connection;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet started.
    Init,
    /// Actively driving the protocol.
    Running,
    /// Terminal; the connection is no longer driven.
    Closed,
}

/// Outcome of one external drive attempt on a session.
///
/// The driving loop polls: no drive attempt blocks indefinitely, and a
/// `Noop` simply means "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Nothing to drive (session not running).
    Noop,
    /// One receive was attempted; the protocol may have advanced.
    Progressed,
    /// The connection or session is closed; driving is over.
    Closed,
    /// The drive attempt failed in a way the session absorbed.
    Error,
}

/// Why a session closed, as reported to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Orderly, peer-initiated shutdown completed.
    Normal,
    /// The peer violated the protocol; the connection was aborted.
    ProtocolError,
    /// Closed from this side (or the remote stream ended).
    LocalClose,
    /// A transport failure forced the session down.
    IoError,
}

/// Observer for session events.
///
/// The session depends only on this interface; forwarding, storage, or
/// wakeup behavior is injected by the embedding application.
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// A batch of freshly decoded inbound packets, in arrival order.
    ///
    /// Called before the packets are fed to the state machine.
    async fn on_packets(&self, packets: &[Packet]);

    /// The session reached `Closed`.
    async fn on_closed(&self, reason: CloseReason);
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Size of the per-receive read buffer.
    pub read_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: SESSION_READ_BUFFER_SIZE,
        }
    }
}

/// One live protocol session over one connection.
pub struct Session {
    connection: Arc<dyn Connection>,
    fsm: StdMutex<ProtocolFsm>,
    listener: Option<Arc<dyn SessionListener>>,
    state: StdMutex<SessionState>,
    /// Single-flight receive guard; owned by whichever call wins the CAS.
    receiving: AtomicBool,
    /// Unparsed tail of the inbound stream. Only touched while `receiving`
    /// is held.
    acc: StdMutex<Accumulator>,
    read_buffer_size: usize,
}

impl Session {
    /// Bind a connection and a state machine, with an optional listener.
    pub fn new(
        connection: Arc<dyn Connection>,
        fsm: ProtocolFsm,
        listener: Option<Arc<dyn SessionListener>>,
    ) -> Self {
        Self::with_config(connection, fsm, listener, SessionConfig::default())
    }

    /// Like [`new`](Self::new), with explicit tunables.
    pub fn with_config(
        connection: Arc<dyn Connection>,
        fsm: ProtocolFsm,
        listener: Option<Arc<dyn SessionListener>>,
        config: SessionConfig,
    ) -> Self {
        Self {
            connection,
            fsm: StdMutex::new(fsm),
            listener,
            state: StdMutex::new(SessionState::Init),
            receiving: AtomicBool::new(false),
            acc: StdMutex::new(Accumulator::new()),
            read_buffer_size: config.read_buffer_size,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Current protocol state of the owned machine.
    pub fn protocol_state(&self) -> ProtocolState {
        self.fsm.lock().unwrap().state()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Active open: start the session and emit the initial HELLO.
    ///
    /// No-op if the session has already been started or the connection is
    /// not established. Mutually exclusive with [`start_passive`](Self::start_passive).
    pub async fn start(&self) {
        if !self.connection.is_connected() || self.connection.is_closed() {
            return;
        }
        if !self.transition_running() {
            return;
        }
        let effect = self.fsm.lock().unwrap().on_session_start();
        self.apply(effect).await;
    }

    /// Passive open: start the session without touching the state machine.
    ///
    /// The first protocol input is expected to be the peer's HELLO.
    pub fn start_passive(&self) {
        let _ = self.transition_running();
    }

    /// Drive one inbound receive.
    ///
    /// At most one receive is in flight per session: a call while one is
    /// outstanding is a safe no-op, not an error. The guard is released
    /// unconditionally when the receive completes, on every path.
    pub async fn on_readable(&self) {
        if self.state() != SessionState::Running {
            return;
        }
        if self
            .receiving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.receive_once().await;
        self.receiving.store(false, Ordering::Release);
    }

    /// Force-close the session. Idempotent.
    ///
    /// Best-effort on the connection; close failures are swallowed since
    /// there is nothing left to recover. The listener is notified with
    /// [`CloseReason::LocalClose`].
    pub async fn close(&self) {
        if !self.mark_closed() {
            return;
        }
        if let Err(e) = self.connection.close().await {
            debug!(error = %e, "connection close failed");
        }
        self.notify_closed(CloseReason::LocalClose).await;
    }

    /// One receive completion: read, decode, dispatch.
    async fn receive_once(&self) {
        let mut read_buf = vec![0u8; self.read_buffer_size];
        let n = match self.connection.recv(&mut read_buf).await {
            Ok(0) => {
                // Remote end of stream.
                self.close().await;
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "receive failed");
                self.close().await;
                return;
            }
        };

        let decoded = {
            let mut acc = self.acc.lock().unwrap();
            acc.extend(&read_buf[..n]);
            acc.decode_frames()
        };
        let packets = match decoded {
            Ok(packets) => packets,
            Err(e) => {
                // Corrupted framing is indistinguishable from
                // desynchronization; abort like a protocol violation.
                warn!(error = %e, "framing error on inbound stream");
                self.apply(Effect::CloseError).await;
                return;
            }
        };
        if packets.is_empty() {
            return;
        }

        if let Some(listener) = &self.listener {
            listener.on_packets(&packets).await;
        }

        for packet in &packets {
            let effect = self.fsm.lock().unwrap().handle_packet(packet);
            self.apply(effect).await;
            if self.state() != SessionState::Running {
                // Fail-fast: the rest of the batch is not processed.
                break;
            }
        }
    }

    /// Translate one effect into transport actions.
    async fn apply(&self, effect: Effect) {
        if self.state() != SessionState::Running {
            return;
        }

        let outcome: Result<Option<CloseReason>, TransportError> = match effect {
            Effect::None => Ok(None),
            Effect::Send(outputs) => self.send_all(&outputs).await.map(|_| None),
            Effect::CloseGraceful => self
                .connection
                .shutdown()
                .await
                .map(|_| Some(CloseReason::Normal)),
            Effect::CloseError => {
                if let Err(e) = self.connection.close().await {
                    debug!(error = %e, "connection close failed");
                }
                Ok(Some(CloseReason::ProtocolError))
            }
        };

        match outcome {
            Ok(None) => {}
            Ok(Some(reason)) => {
                if self.mark_closed() {
                    self.notify_closed(reason).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "i/o failure while applying effect");
                if let Err(e) = self.connection.close().await {
                    debug!(error = %e, "connection close failed");
                }
                if self.mark_closed() {
                    self.notify_closed(CloseReason::IoError).await;
                }
            }
        }
    }

    async fn send_all(&self, outputs: &[Packet]) -> Result<(), TransportError> {
        for packet in outputs {
            self.connection.send(&codec::encode(packet)).await?;
        }
        Ok(())
    }

    /// `Init -> Running`; false if the session was already started.
    fn transition_running(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state != SessionState::Init {
            return false;
        }
        *state = SessionState::Running;
        true
    }

    /// `* -> Closed`; false if already closed (the loser must not notify).
    fn mark_closed(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Closed {
            return false;
        }
        *state = SessionState::Closed;
        true
    }

    async fn notify_closed(&self, reason: CloseReason) {
        if let Some(listener) = &self.listener {
            listener.on_closed(reason).await;
        }
    }
}
