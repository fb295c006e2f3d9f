//! Packet model for the FERRY wire format.
//!
//! A packet is a fixed 12-byte header plus an optional opaque body:
//!
//! ```text
//! +----------+----------+----------+----------+------------------+
//! | Magic    | Version  | Type     | Length   | Body             |
//! | 4 bytes  | 2 bytes  | 2 bytes  | 4 bytes  | `length` bytes   |
//! | (BE32)   | (BE16)   | (BE16)   | (BE32)   |                  |
//! +----------+----------+----------+----------+------------------+
//! ```
//!
//! Control packets (HELLO, HELLO_ACK, CLOSE) never carry a body.

use bytes::Bytes;

use crate::core::constants::{
    MAGIC, PACKET_TYPE_CLOSE, PACKET_TYPE_DATA, PACKET_TYPE_HELLO, PACKET_TYPE_HELLO_ACK,
    PROTOCOL_VERSION,
};
use crate::core::error::CodecError;

pub mod codec;

pub use codec::{Accumulator, decode, encode};

/// Packet type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketType {
    /// Handshake initiation, sent by the active opener.
    Hello = PACKET_TYPE_HELLO,
    /// Handshake acknowledgment, sent by the passive opener.
    HelloAck = PACKET_TYPE_HELLO_ACK,
    /// Application data.
    Data = PACKET_TYPE_DATA,
    /// Graceful connection close.
    Close = PACKET_TYPE_CLOSE,
}

impl PacketType {
    /// Parse a packet type from its wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            PACKET_TYPE_HELLO => Some(Self::Hello),
            PACKET_TYPE_HELLO_ACK => Some(Self::HelloAck),
            PACKET_TYPE_DATA => Some(Self::Data),
            PACKET_TYPE_CLOSE => Some(Self::Close),
            _ => None,
        }
    }

    /// Convert a packet type to its wire code.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Fixed packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Protocol magic.
    pub magic: u32,
    /// Protocol version.
    pub version: u16,
    /// Packet type.
    pub packet_type: PacketType,
    /// Byte length of the body (0 for control packets).
    pub length: u32,
}

impl PacketHeader {
    /// Create a header with the protocol's fixed magic and version.
    pub fn new(packet_type: PacketType, length: u32) -> Self {
        Self {
            magic: MAGIC,
            version: PROTOCOL_VERSION,
            packet_type,
            length,
        }
    }
}

/// One logical packet: header plus optional immutable body.
///
/// The body is absent exactly when `header.length == 0`. Once constructed a
/// packet never changes; the body is exposed as [`Bytes`], so a consumer
/// cannot mutate a frame that is already queued or dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    body: Option<Bytes>,
}

impl Packet {
    /// Build a packet from an existing header and body, validating that the
    /// header length matches the body.
    pub fn from_parts(header: PacketHeader, body: Option<Bytes>) -> Result<Self, CodecError> {
        let actual = body.as_ref().map(Bytes::len).unwrap_or(0);
        if header.length as usize != actual {
            return Err(CodecError::LengthMismatch {
                expected: header.length,
                actual,
            });
        }
        // Normalize: a zero-length body is represented as absent.
        let body = body.filter(|b| !b.is_empty());
        Ok(Self { header, body })
    }

    /// Build a DATA packet; the header length is derived from the body.
    pub fn data(body: Bytes) -> Self {
        let header = PacketHeader::new(PacketType::Data, body.len() as u32);
        let body = if body.is_empty() { None } else { Some(body) };
        Self { header, body }
    }

    /// Build a HELLO control packet.
    pub fn hello() -> Self {
        Self {
            header: PacketHeader::new(PacketType::Hello, 0),
            body: None,
        }
    }

    /// Build a HELLO_ACK control packet.
    pub fn hello_ack() -> Self {
        Self {
            header: PacketHeader::new(PacketType::HelloAck, 0),
            body: None,
        }
    }

    /// Build a CLOSE control packet.
    pub fn close() -> Self {
        Self {
            header: PacketHeader::new(PacketType::Close, 0),
            body: None,
        }
    }

    /// Get the packet header.
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// Get the packet type.
    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type
    }

    /// Get the body, if present.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Get the body as a byte slice (empty for control packets).
    pub fn body_slice(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}({} bytes)",
            self.header.packet_type, self.header.length
        )
    }
}
