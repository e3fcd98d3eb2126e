//! Wire layer for the parleyd voice conferencing protocol.
//!
//! The protocol is a legacy binary UDP format: little-endian integers,
//! fixed string slots, a CRC-32 over the whole datagram and four packet
//! families selected by the first two bytes. This crate owns every byte
//! offset; the daemon above it only ever sees decoded structs and opaque
//! `Vec<u8>` datagrams ready for sending.
//!
//! - [`wire`] — bounds-checked little-endian primitives and string slots
//! - [`crc`] — the zlib-variant CRC-32 and its two slot offsets
//! - [`header`] — family tags, the 24-byte control header, acks
//! - [`opcode`] — request codes, notification opcodes, reason codes
//! - [`codec`] — the audio codec size/offset tables
//! - [`connect`] — login / accept / keepalive fixed layouts
//! - [`audio`] — audio validation and per-recipient rewriting
//! - [`records`] — channel / player / ban wire forms

pub mod audio;
pub mod codec;
pub mod connect;
pub mod crc;
pub mod error;
pub mod header;
pub mod opcode;
pub mod records;
pub mod wire;

pub use error::{ProtocolError, Result};
