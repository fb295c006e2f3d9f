//! Passive-opener driver.
//!
//! [`ServerSession`] is the accepting-side counterpart of
//! [`ClientSession`](crate::client::ClientSession): `start` arms the
//! session without touching the state machine (the first protocol input
//! is the peer's HELLO), and the same polling `drive_once` loop applies.
//! No I/O, selector, or proxy logic lives here; `drive_once` never
//! blocks beyond a single receive.

use std::sync::Arc;
use std::time::Duration;

use crate::core::error::SessionError;
use crate::protocol::ProtocolState;
use crate::session::{ReadyGate, Session, SessionState, StepResult};

/// Driver for a passively opened (accepted) session.
pub struct ServerSession {
    session: Arc<Session>,
    ready: ReadyGate,
}

impl ServerSession {
    /// Wrap a constructed, accepted session.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            ready: ReadyGate::new(),
        }
    }

    /// The wrapped session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Passive open, guarded by preconditions.
    ///
    /// Arms the session for driving without emitting anything; the state
    /// machine waits in `Init` for the peer's HELLO. Safe to call
    /// repeatedly.
    pub fn start(&self) {
        let connection = self.session.connection();
        if !connection.is_connected() || connection.is_closed() {
            return;
        }
        if self.session.protocol_state() != ProtocolState::Init
            || self.session.state() != SessionState::Init
        {
            return;
        }
        self.session.start_passive();
    }

    /// Attempt one step of protocol progress.
    pub async fn drive_once(&self) -> StepResult {
        let connection = self.session.connection();
        if self.session.state() == SessionState::Closed
            || connection.is_closed()
            || !connection.is_connected()
        {
            return StepResult::Closed;
        }
        if self.session.state() != SessionState::Running {
            return StepResult::Noop;
        }
        self.session.on_readable().await;
        StepResult::Progressed
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    /// Mark the session ready and wake waiters.
    pub fn mark_ready(&self) {
        self.ready.mark_ready();
    }

    /// Block until ready, up to `timeout`.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), SessionError> {
        self.ready.wait(timeout).await
    }
}
