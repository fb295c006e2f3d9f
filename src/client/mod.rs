//! Active-opener driver.
//!
//! [`ClientSession`] wraps a [`Session`] for the peer that opens the
//! conversation: `start` performs the active open (first HELLO), and an
//! external loop calls `drive_once` until the session closes. Readiness
//! ("handshake complete, safe to send DATA") is a separate gate marked by
//! the driving loop once the protocol reaches `Ready`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::error::SessionError;
use crate::protocol::ProtocolState;
use crate::session::{ReadyGate, Session, SessionState, StepResult};

/// Driver for an actively opened session.
pub struct ClientSession {
    session: Arc<Session>,
    ready: ReadyGate,
}

impl ClientSession {
    /// Wrap a constructed, connected session.
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

    /// Active open, guarded by preconditions.
    ///
    /// No-op unless the connection is established and both the session and
    /// its state machine are still fresh. Safe to call repeatedly.
    pub async fn start(&self) {
        let connection = self.session.connection();
        if !connection.is_connected() || connection.is_closed() {
            return;
        }
        if self.session.protocol_state() != ProtocolState::Init
            || self.session.state() != SessionState::Init
        {
            return;
        }
        self.session.start().await;
    }

    /// Attempt one step of protocol progress.
    ///
    /// Never blocks beyond a single receive; the caller polls.
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
    ///
    /// Called by the driving loop once the handshake completes.
    pub fn mark_ready(&self) {
        self.ready.mark_ready();
    }

    /// Block until ready, up to `timeout`.
    ///
    /// Does not advance the protocol; `drive_once` must keep being called
    /// elsewhere.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), SessionError> {
        self.ready.wait(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::codec;
    use crate::packet::Packet;
    use crate::protocol::ProtocolFsm;
    use crate::transport::mock::MockConnection;
    use crate::transport::Connection;

    fn client(conn: Arc<MockConnection>) -> ClientSession {
        ClientSession::new(Arc::new(Session::new(conn, ProtocolFsm::new(), None)))
    }

    #[tokio::test]
    async fn test_start_sends_hello_once() {
        let (conn, _handle) = MockConnection::pair();
        let client = client(conn.clone());

        client.start().await;
        client.start().await;

        assert_eq!(conn.sent_bytes(), codec::encode(&Packet::hello()));
        assert_eq!(client.session().protocol_state(), ProtocolState::Negotiating);
    }

    #[tokio::test]
    async fn test_start_requires_connected() {
        let (conn, _handle) = MockConnection::pair();
        conn.close().await.unwrap();
        let client = client(conn.clone());

        client.start().await;

        assert!(conn.sent_bytes().is_empty());
        assert_eq!(client.session().state(), SessionState::Init);
    }

    #[tokio::test]
    async fn test_drive_once_noop_before_start() {
        let (conn, _handle) = MockConnection::pair();
        let client = client(conn.clone());

        assert_eq!(client.drive_once().await, StepResult::Noop);
        assert_eq!(conn.recv_calls(), 0);
    }

    #[tokio::test]
    async fn test_drive_once_progresses_handshake() {
        let (conn, handle) = MockConnection::pair();
        let client = client(conn.clone());

        client.start().await;
        handle.feed(&codec::encode(&Packet::hello_ack()));

        assert_eq!(client.drive_once().await, StepResult::Progressed);
        assert_eq!(client.session().protocol_state(), ProtocolState::Ready);
    }

    #[tokio::test]
    async fn test_drive_once_reports_closed() {
        let (conn, _handle) = MockConnection::pair();
        let client = client(conn.clone());

        client.start().await;
        client.session().close().await;

        assert_eq!(client.drive_once().await, StepResult::Closed);
    }

    #[tokio::test]
    async fn test_ready_gate_roundtrip() {
        let (conn, _handle) = MockConnection::pair();
        let client = client(conn);

        assert!(!client.is_ready());
        assert!(matches!(
            client.await_ready(Duration::from_millis(5)).await,
            Err(SessionError::ReadyTimeout)
        ));

        client.mark_ready();
        assert!(client.is_ready());
        client.await_ready(Duration::from_millis(5)).await.unwrap();
    }
}
