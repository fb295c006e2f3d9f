//! Error types for the FERRY protocol.

use thiserror::Error;

/// Errors that can occur when decoding frames from the wire.
///
/// A framing error is fatal for the stream it occurred on: once the
/// decoder loses frame alignment there is no way to resynchronize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Frame header carried an unknown packet type code.
    #[error("unknown packet type code: {0}")]
    UnknownType(u16),

    /// Frame header carried the wrong protocol magic.
    #[error("bad protocol magic: 0x{0:08x}")]
    BadMagic(u32),

    /// Header length field does not match the supplied body.
    #[error("header length {expected} does not match body length {actual}")]
    LengthMismatch {
        /// Length declared in the header.
        expected: u32,
        /// Actual body byte length.
        actual: usize,
    },
}

/// Errors in the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to bind a listener.
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// Failed to establish a connection.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Send on a connection that is not established.
    #[error("connection not established")]
    NotConnected,

    /// I/O error on an established connection.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the session drivers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Waiting for handshake readiness exceeded the caller's deadline.
    ///
    /// Distinct from protocol errors: the session itself is untouched.
    #[error("timed out waiting for session readiness")]
    ReadyTimeout,

    /// The session is closed and cannot be driven further.
    #[error("session closed")]
    Closed,
}

/// Top-level FERRY errors.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Framing error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session driver error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
