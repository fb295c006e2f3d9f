//! Frame encoding and decoding over a byte stream.
//!
//! TCP delivers a byte stream, not frames: one read may carry half a frame
//! or several frames back to back. [`decode`] therefore drains as many
//! complete frames as the buffer holds and leaves any incomplete tail in
//! place for the next read. [`Accumulator`] pairs that discipline with a
//! growable buffer that preserves the unconsumed tail across reads.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Packet, PacketHeader, PacketType};
use crate::core::constants::{HEADER_SIZE, MAGIC};
use crate::core::error::CodecError;

/// Encode a packet to its wire representation.
///
/// Allocates exactly the output size. Never fails: a [`Packet`] is
/// consistent by construction.
pub fn encode(packet: &Packet) -> Bytes {
    let header = packet.header();
    let body = packet.body_slice();

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u32(header.magic);
    buf.put_u16(header.version);
    buf.put_u16(header.packet_type.code());
    buf.put_u32(header.length);
    buf.put_slice(body);
    buf.freeze()
}

/// Decode as many complete frames as `buf` holds, consuming them.
///
/// Policy per frame:
/// - fewer than [`HEADER_SIZE`] bytes left: stop, consume nothing;
/// - full header but fewer than `length` body bytes left: stop with the
///   header bytes unconsumed, so the partial frame survives intact;
/// - otherwise consume header and body and emit the packet.
///
/// A wrong magic or an unknown type code is a fatal [`CodecError`]: past a
/// corrupted header every subsequent byte would be misread, so the error
/// must surface instead of being skipped.
pub fn decode(buf: &mut BytesMut) -> Result<Vec<Packet>, CodecError> {
    let mut packets = Vec::new();

    loop {
        if buf.len() < HEADER_SIZE {
            break;
        }

        // Peek the header without consuming; roll-back is then free.
        let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let version = u16::from_be_bytes([buf[4], buf[5]]);
        let type_code = u16::from_be_bytes([buf[6], buf[7]]);
        let length = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;

        if magic != MAGIC {
            return Err(CodecError::BadMagic(magic));
        }

        if buf.len() - HEADER_SIZE < length {
            // Incomplete body: leave header + partial body for the next read.
            break;
        }

        let packet_type =
            PacketType::from_code(type_code).ok_or(CodecError::UnknownType(type_code))?;

        buf.advance(HEADER_SIZE);
        let body = if length == 0 {
            None
        } else {
            Some(buf.split_to(length).freeze())
        };

        let header = PacketHeader {
            magic,
            version,
            packet_type,
            length: length as u32,
        };
        packets.push(Packet::from_parts(header, body)?);
    }

    Ok(packets)
}

/// Per-direction accumulation buffer.
///
/// Holds bytes read from a stream but not yet resolved into complete
/// frames. Appending grows the buffer geometrically when the incoming
/// bytes plus the unconsumed residue exceed the current capacity; bytes
/// belonging to an incomplete frame are never dropped.
#[derive(Debug)]
pub struct Accumulator {
    buf: BytesMut,
}

impl Accumulator {
    /// Create an accumulator with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(crate::core::constants::ACC_INITIAL_CAPACITY)
    }

    /// Create an accumulator with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append freshly read bytes, growing the buffer if they do not fit.
    ///
    /// Growth at least doubles the capacity (and always covers the residue
    /// plus the incoming bytes), so repeated appends stay amortized O(1).
    pub fn extend(&mut self, data: &[u8]) {
        let free = self.buf.capacity() - self.buf.len();
        if free < data.len() {
            let min_capacity = self.buf.len() + data.len();
            let target = (self.buf.capacity() * 2).max(min_capacity);
            self.buf.reserve(target - self.buf.len());
        }
        self.buf.extend_from_slice(data);
    }

    /// Drain all complete frames, compacting the buffer so any partial
    /// tail stays at the front for the next [`extend`](Self::extend).
    pub fn decode_frames(&mut self) -> Result<Vec<Packet>, CodecError> {
        decode(&mut self.buf)
    }

    /// Number of unconsumed bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no unconsumed bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}
