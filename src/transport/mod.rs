//! Transport layer: the byte-stream connection abstraction and its TCP
//! implementation.
//!
//! The protocol core never touches sockets directly; it depends on
//! [`Connection`], which models a connected, bidirectional byte stream
//! with a graceful half-close and a hard close. Receive completions may
//! run on any worker of the runtime; implementations must therefore be
//! safe to share behind an `Arc`.

mod tcp;

pub use tcp::{TcpConnection, TcpServer};

#[cfg(test)]
pub(crate) mod mock;

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::core::error::TransportError;

/// A connected byte-stream transport.
///
/// `recv` returning `Ok(0)` is the end-of-stream marker (remote close).
/// Exactly one receive should be outstanding per connection at a time;
/// the session layer enforces this with its single-flight guard.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Local address, if bound.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Remote peer address, if connected.
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Whether the connection is established and usable.
    fn is_connected(&self) -> bool;

    /// Whether the connection has been closed locally.
    fn is_closed(&self) -> bool;

    /// Send all of `data`, returning the number of bytes written.
    async fn send(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Receive at most `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read; `Ok(0)` means the remote side
    /// closed the stream.
    async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Graceful half-close: flush and stop sending, keep draining reads.
    async fn shutdown(&self) -> Result<(), TransportError>;

    /// Hard close: abandon unsent data and release the connection.
    async fn close(&self) -> Result<(), TransportError>;
}
