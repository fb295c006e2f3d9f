//! TCP implementation of the [`Connection`] abstraction.
//!
//! A [`TcpConnection`] owns the split halves of a tokio `TcpStream` behind
//! independent locks, so one task can be draining reads while another
//! writes. Hard close drops both halves, which releases the socket even if
//! a read is pending elsewhere in the process.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::debug;

use super::Connection;
use crate::core::error::TransportError;

/// A connected TCP byte stream.
pub struct TcpConnection {
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    closed: AtomicBool,
}

impl TcpConnection {
    /// Wrap an established stream (e.g. from [`TcpServer::accept`]).
    pub fn new(stream: TcpStream) -> Self {
        let local_addr = stream.local_addr().ok();
        let remote_addr = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            local_addr,
            remote_addr,
            closed: AtomicBool::new(false),
        }
    }

    /// Connect to a remote address.
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        debug!(%addr, "tcp connected");
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl Connection for TcpConnection {
    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, data: &[u8]) -> Result<usize, TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(data.len())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(TransportError::NotConnected)?;
        let n = reader.read(buf).await?;
        Ok(n)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            writer.shutdown().await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        // Dropping both halves releases the socket; unsent data is abandoned.
        self.writer.lock().await.take();
        self.reader.lock().await.take();
        Ok(())
    }
}

/// A TCP listener that yields [`TcpConnection`]s.
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Bind to a local address.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;
        Ok(Self { listener })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next inbound connection.
    pub async fn accept(&self) -> Result<TcpConnection, TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        debug!(%addr, "tcp accepted");
        Ok(TcpConnection::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_send_recv() {
        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpConnection::connect(addr).await.unwrap();
        let accepted = server.accept().await.unwrap();

        client.send(b"over the wire").await.unwrap();

        let mut buf = [0u8; 64];
        let n = accepted.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"over the wire");
    }

    #[tokio::test]
    async fn test_shutdown_signals_eof_to_peer() {
        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpConnection::connect(addr).await.unwrap();
        let accepted = server.accept().await.unwrap();

        client.shutdown().await.unwrap();

        let mut buf = [0u8; 16];
        let n = accepted.recv(&mut buf).await.unwrap();
        assert_eq!(n, 0);

        // Half-close: the shutting-down side is not closed locally.
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_send() {
        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpConnection::connect(addr).await.unwrap();
        let _accepted = server.accept().await.unwrap();

        client.close().await.unwrap();
        client.close().await.unwrap();

        assert!(client.is_closed());
        assert!(!client.is_connected());
        assert!(matches!(
            client.send(b"late").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_addresses_reported() {
        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpConnection::connect(addr).await.unwrap();
        let accepted = server.accept().await.unwrap();

        assert_eq!(client.remote_addr(), Some(addr));
        assert_eq!(accepted.local_addr(), Some(addr));
    }
}
