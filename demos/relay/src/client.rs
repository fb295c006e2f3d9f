//! Demo client: active open, a handful of DATA frames, orderly close.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use ferry_protocol::client::ClientSession;
use ferry_protocol::packet::{Packet, codec};
use ferry_protocol::protocol::{ProtocolFsm, ProtocolState};
use ferry_protocol::session::{CloseReason, Session, SessionListener, StepResult};
use ferry_protocol::transport::{Connection, TcpConnection};
use ferry_protocol::FerryError;

/// Prints every observed packet body as UTF-8.
struct PrintListener;

#[async_trait]
impl SessionListener for PrintListener {
    async fn on_packets(&self, packets: &[Packet]) {
        for packet in packets {
            info!(
                packet = %packet,
                body = %String::from_utf8_lossy(packet.body_slice()),
                "received"
            );
        }
    }

    async fn on_closed(&self, reason: CloseReason) {
        info!(?reason, "session closed");
    }
}

pub async fn run(proxy_addr: SocketAddr) -> Result<(), FerryError> {
    let connection = Arc::new(TcpConnection::connect(proxy_addr).await?);
    info!(%proxy_addr, "connected");

    let session = Arc::new(Session::new(
        connection.clone(),
        ProtocolFsm::new(),
        Some(Arc::new(PrintListener)),
    ));
    let client = ClientSession::new(session);
    client.start().await;

    let mut data_sent = false;
    loop {
        let step = client.drive_once().await;

        // DATA is only legal once the handshake has completed; sending
        // earlier would be a violation on the receiving side.
        if !data_sent && client.session().protocol_state() == ProtocolState::Ready {
            send_frames(connection.as_ref()).await?;
            data_sent = true;
            client.mark_ready();
        }

        match step {
            StepResult::Noop => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            StepResult::Progressed => {}
            StepResult::Closed => {
                info!("client session finished");
                return Ok(());
            }
            StepResult::Error => {
                info!("client session errored");
                return Ok(());
            }
        }
    }
}

async fn send_frames(connection: &TcpConnection) -> Result<(), FerryError> {
    for i in 1..=5 {
        let body = Bytes::from(format!("Hello-{i}"));
        let packet = Packet::data(body);
        connection.send(&codec::encode(&packet)).await?;
        info!(%packet, "sent");
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    connection.send(&codec::encode(&Packet::close())).await?;
    info!("sent CLOSE");
    Ok(())
}
