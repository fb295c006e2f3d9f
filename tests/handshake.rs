//! Integration tests for the session handshake and lifecycle.
//!
//! Each test runs both peers over a real TCP loopback connection: the
//! passive side drives in a background task, the active side in the test
//! body, and assertions check the states and close reasons both ends
//! settle on.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use ferry_protocol::client::ClientSession;
use ferry_protocol::packet::{Packet, PacketType, codec};
use ferry_protocol::protocol::{ProtocolFsm, ProtocolState};
use ferry_protocol::server::ServerSession;
use ferry_protocol::session::{
    CloseReason, Session, SessionListener, SessionState, StepResult,
};
use ferry_protocol::transport::{Connection, TcpConnection, TcpServer};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingListener {
    packets: Mutex<Vec<Packet>>,
    reasons: Mutex<Vec<CloseReason>>,
}

impl RecordingListener {
    fn packets(&self) -> Vec<Packet> {
        self.packets.lock().unwrap().clone()
    }

    fn reasons(&self) -> Vec<CloseReason> {
        self.reasons.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionListener for RecordingListener {
    async fn on_packets(&self, packets: &[Packet]) {
        self.packets.lock().unwrap().extend_from_slice(packets);
    }

    async fn on_closed(&self, reason: CloseReason) {
        self.reasons.lock().unwrap().push(reason);
    }
}

/// Establish a loopback TCP pair: (client side, accepted side).
async fn tcp_pair() -> (Arc<TcpConnection>, Arc<TcpConnection>) {
    let server = TcpServer::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .expect("bind loopback listener");
    let addr = server.local_addr().unwrap();

    let accept = tokio::spawn(async move { server.accept().await });
    let client = TcpConnection::connect(addr).await.expect("connect");
    let accepted = accept
        .await
        .expect("accept task panicked")
        .expect("accept failed");

    (Arc::new(client), Arc::new(accepted))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Active HELLO -> passive HELLO_ACK -> active reaches Ready.
#[tokio::test]
async fn handshake_completes_over_loopback() {
    let (client_conn, server_conn) = tcp_pair().await;

    let server = ServerSession::new(Arc::new(Session::new(
        server_conn,
        ProtocolFsm::new(),
        None,
    )));
    server.start();
    let server_task = tokio::spawn(async move {
        // One receive resolves the HELLO and replies with HELLO_ACK.
        server.drive_once().await;
        server.session().protocol_state()
    });

    let client = ClientSession::new(Arc::new(Session::new(
        client_conn,
        ProtocolFsm::new(),
        None,
    )));
    client.start().await;
    assert_eq!(client.session().protocol_state(), ProtocolState::Negotiating);

    // One receive resolves the HELLO_ACK.
    assert_eq!(client.drive_once().await, StepResult::Progressed);
    assert_eq!(client.session().protocol_state(), ProtocolState::Ready);

    let server_protocol_state = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server drive timed out")
        .expect("server task panicked");
    assert_eq!(server_protocol_state, ProtocolState::Negotiating);
}

/// The full scenario: handshake, one DATA frame, orderly CLOSE.
///
/// The receiving side must observe the DATA frame through its listener,
/// close with reason Normal, and the sending side must also end Closed.
#[tokio::test]
async fn data_and_graceful_close_end_to_end() {
    let (client_conn, server_conn) = tcp_pair().await;

    let server_listener = Arc::new(RecordingListener::default());
    let server = ServerSession::new(Arc::new(Session::new(
        server_conn,
        ProtocolFsm::new(),
        Some(server_listener.clone()),
    )));
    server.start();
    let server_task = tokio::spawn(async move {
        while server.drive_once().await != StepResult::Closed {}
        server
    });

    let client_listener = Arc::new(RecordingListener::default());
    let client = ClientSession::new(Arc::new(Session::new(
        client_conn.clone(),
        ProtocolFsm::new(),
        Some(client_listener.clone()),
    )));
    client.start().await;

    // Drive until the handshake completes.
    while client.session().protocol_state() != ProtocolState::Ready {
        assert_eq!(client.drive_once().await, StepResult::Progressed);
    }
    client.mark_ready();
    client
        .await_ready(Duration::from_secs(1))
        .await
        .expect("ready gate");

    // DATA then CLOSE, from the application layer.
    client_conn
        .send(&codec::encode(&Packet::data(Bytes::from_static(b"Hello-1"))))
        .await
        .unwrap();
    client_conn
        .send(&codec::encode(&Packet::close()))
        .await
        .unwrap();

    // The sender keeps draining until the peer's shutdown surfaces as EOF.
    while client.drive_once().await != StepResult::Closed {}

    let server = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server loop timed out")
        .expect("server task panicked");

    // Receiving side: observed the DATA frame, closed Normal.
    let observed: Vec<PacketType> = server_listener
        .packets()
        .iter()
        .map(Packet::packet_type)
        .collect();
    assert_eq!(
        observed,
        vec![PacketType::Hello, PacketType::Data, PacketType::Close]
    );
    let data_packet = &server_listener.packets()[1];
    assert_eq!(data_packet.body_slice(), b"Hello-1");
    assert_eq!(server_listener.reasons(), vec![CloseReason::Normal]);
    assert_eq!(server.session().state(), SessionState::Closed);
    assert_eq!(server.session().protocol_state(), ProtocolState::Close);

    // Sending side: ended Closed once the peer went away.
    assert_eq!(client.session().state(), SessionState::Closed);
    assert_eq!(client_listener.reasons(), vec![CloseReason::LocalClose]);
}

/// A protocol violation aborts the session with reason ProtocolError.
#[tokio::test]
async fn violation_aborts_with_protocol_error() {
    let (client_conn, server_conn) = tcp_pair().await;

    let listener = Arc::new(RecordingListener::default());
    let server = ServerSession::new(Arc::new(Session::new(
        server_conn,
        ProtocolFsm::new(),
        Some(listener.clone()),
    )));
    server.start();

    // HELLO_ACK is not a legal first packet for a passive opener.
    client_conn
        .send(&codec::encode(&Packet::hello_ack()))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), server.drive_once())
        .await
        .expect("drive timed out");

    assert_eq!(server.session().state(), SessionState::Closed);
    assert_eq!(listener.reasons(), vec![CloseReason::ProtocolError]);
}
