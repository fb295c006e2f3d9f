//! Demo proxy: one passive session whose DATA frames are relayed upstream.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use ferry_protocol::protocol::ProtocolFsm;
use ferry_protocol::proxy::{ForwardingListener, ProxyForwarder};
use ferry_protocol::server::ServerSession;
use ferry_protocol::session::{Session, StepResult};
use ferry_protocol::transport::{Connection, TcpConnection, TcpServer};
use ferry_protocol::FerryError;

pub async fn run(listen_addr: SocketAddr, upstream_addr: SocketAddr) -> Result<(), FerryError> {
    let server = TcpServer::bind(listen_addr).await?;
    info!(%listen_addr, "proxy listening, waiting for client");

    let downstream: Arc<dyn Connection> = Arc::new(server.accept().await?);
    info!(peer = ?downstream.remote_addr(), "client connected");

    let upstream: Arc<dyn Connection> = Arc::new(TcpConnection::connect(upstream_addr).await?);
    info!(%upstream_addr, "upstream connected");

    let forwarder = Arc::new(ProxyForwarder::new(upstream, downstream.clone()));
    let listener = Arc::new(ForwardingListener::new(forwarder));
    let session = ServerSession::new(Arc::new(Session::new(
        downstream,
        ProtocolFsm::new(),
        Some(listener),
    )));

    session.start();
    loop {
        match session.drive_once().await {
            StepResult::Noop => tokio::task::yield_now().await,
            StepResult::Progressed => {}
            StepResult::Closed | StepResult::Error => {
                info!("proxy session finished");
                return Ok(());
            }
        }
    }
}
