//! Datagram families and the 24-byte control header.
//!
//! Every datagram opens with a 2-byte family tag. Control and audio
//! datagrams continue with `private_id(4) public_id(4) counter(4)`, control
//! additionally with `version(2) reserved(2) crc(4)`. The version counter
//! at byte offset 16 is rewritten on every retransmission.

use crate::crc;
use crate::error::{ProtocolError, Result};
use crate::wire::{self, Reader};
use bytes::BufMut;

/// Family tag of control requests and notifications.
pub const FAMILY_CONTROL: u16 = 0xbef0;
/// Family tag of acknowledgements.
pub const FAMILY_ACK: u16 = 0xbef1;
/// Family tag of inbound audio datagrams.
pub const FAMILY_AUDIO: u16 = 0xbef2;
/// Family tag of outbound (server to client) audio datagrams.
pub const FAMILY_AUDIO_OUT: u16 = 0xbef3;
/// Family tag of login, keepalive and accept datagrams.
pub const FAMILY_CONNECTION: u16 = 0xbef4;

/// Size of the control header (up to and including the checksum).
pub const CONTROL_HEADER_LEN: usize = 24;
/// Byte offset of the retransmission version counter.
pub const VERSION_OFFSET: usize = 16;
/// Byte offset of the per-player packet counter.
pub const COUNTER_OFFSET: usize = 12;

/// The four datagram families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Control,
    Ack,
    Audio,
    Connection,
}

impl Family {
    /// Classify a datagram by its first two bytes.
    pub fn of(data: &[u8]) -> Result<Family> {
        if data.len() < 2 {
            return Err(ProtocolError::TooShort {
                kind: "family tag",
                len: data.len(),
            });
        }
        match wire::get_u16(data, 0) {
            FAMILY_CONTROL => Ok(Family::Control),
            FAMILY_ACK => Ok(Family::Ack),
            FAMILY_AUDIO => Ok(Family::Audio),
            FAMILY_CONNECTION => Ok(Family::Connection),
            other => Err(ProtocolError::UnknownFamily(other)),
        }
    }
}

/// Decoded header of an inbound control request.
#[derive(Debug, Clone, Copy)]
pub struct ControlHeader {
    /// Request code (datagram byte 2).
    pub code: u8,
    /// Direction discriminator (datagram byte 3).
    pub direction: u8,
    pub private_id: u32,
    pub public_id: u32,
    pub counter: u32,
}

impl ControlHeader {
    /// Decode and validate an inbound control datagram: minimum length and
    /// checksum, then the fixed header fields.
    pub fn decode(data: &[u8]) -> Result<ControlHeader> {
        if data.len() < CONTROL_HEADER_LEN {
            return Err(ProtocolError::TooShort {
                kind: "control",
                len: data.len(),
            });
        }
        if !crc::check(data, crc::CRC_OFFSET_CONTROL) {
            return Err(ProtocolError::BadChecksum);
        }
        let mut r = Reader::at(data, 2);
        let code = r.u8()?;
        let direction = r.u8()?;
        let private_id = r.u32()?;
        let public_id = r.u32()?;
        let counter = r.u32()?;
        Ok(ControlHeader {
            code,
            direction,
            private_id,
            public_id,
            counter,
        })
    }
}

/// Decoded acknowledgement.
#[derive(Debug, Clone, Copy)]
pub struct Ack {
    pub version: u16,
    pub private_id: u32,
    pub public_id: u32,
    pub counter: u32,
}

impl Ack {
    pub fn decode(data: &[u8]) -> Result<Ack> {
        let mut r = Reader::at(data, 2);
        let version = r.u16()?;
        let private_id = r.u32()?;
        let public_id = r.u32()?;
        let counter = r.u32()?;
        Ok(Ack {
            version,
            private_id,
            public_id,
            counter,
        })
    }

    /// Build the 16-byte acknowledgement the server sends for a request.
    /// Acks carry no checksum.
    pub fn encode(private_id: u32, public_id: u32, counter: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.put_u16_le(FAMILY_ACK);
        buf.put_u16_le(0);
        buf.put_u32_le(private_id);
        buf.put_u32_le(public_id);
        buf.put_u32_le(counter);
        buf
    }
}

/// Start a notification datagram: the 24-byte control header with the given
/// opcode and every per-recipient field left zero. Recipient ids, counter
/// and checksum are patched per recipient before enqueueing.
pub fn begin_notify(opcode: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.put_u16_le(FAMILY_CONTROL);
    buf.put_u16_le(opcode);
    buf.put_bytes(0, CONTROL_HEADER_LEN - 4);
    buf
}

/// Patch the per-recipient header fields of a notification in place.
/// The checksum must be recomputed afterwards.
pub fn address_notify(data: &mut [u8], private_id: u32, public_id: u32, counter: u32) {
    wire::patch_u32(data, 4, private_id);
    wire::patch_u32(data, 8, public_id);
    wire::patch_u32(data, COUNTER_OFFSET, counter);
    crc::patch(data, crc::CRC_OFFSET_CONTROL);
}
