//! Protocol constants for FERRY.
//!
//! These values are fixed by the wire format and MUST NOT be changed.

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Protocol magic, first four bytes of every frame.
pub const MAGIC: u32 = 0x5650_4E44;

/// Protocol version (v0).
pub const PROTOCOL_VERSION: u16 = 0x0000;

/// Fixed header size: magic(4) + version(2) + type(2) + length(4).
pub const HEADER_SIZE: usize = 12;

/// Maximum body length the application layer accepts (16 KiB).
///
/// The codec itself does not enforce this; receivers reject oversized
/// DATA frames before acting on them.
pub const MAX_BODY_SIZE: usize = 16 * 1024;

// =============================================================================
// PACKET TYPES
// =============================================================================

/// Handshake initiation, sent by the active opener.
pub const PACKET_TYPE_HELLO: u16 = 1;

/// Handshake acknowledgment, sent by the passive opener.
pub const PACKET_TYPE_HELLO_ACK: u16 = 2;

/// Application data frame.
pub const PACKET_TYPE_DATA: u16 = 3;

/// Graceful connection close.
pub const PACKET_TYPE_CLOSE: u16 = 4;

// =============================================================================
// BUFFER SIZING
// =============================================================================

/// Per-receive read buffer for a session.
pub const SESSION_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Per-iteration read buffer for the proxy pump.
pub const PUMP_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Initial capacity of an accumulation buffer.
pub const ACC_INITIAL_CAPACITY: usize = 64 * 1024;
