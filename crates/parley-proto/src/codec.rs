//! Audio codec table.
//!
//! The server never decodes audio; the codec id only determines the size of
//! the opaque block it routes. Index 4 (CELP Windows 5.2) has a zero-size
//! table entry and is treated as reserved: no datagram length can ever match
//! it, so it is rejected outright.

use crate::error::{ProtocolError, Result};

/// Number of codec ids carried by the protocol.
pub const CODEC_COUNT: usize = 13;

/// Raw audio block sizes in bytes, indexed by codec id.
const AUDIO_SIZE: [usize; CODEC_COUNT] =
    [153, 51, 165, 132, 0, 27, 50, 75, 100, 138, 188, 228, 308];
/// Number of frames per block, indexed by codec id.
const FRAMES: [usize; CODEC_COUNT] = [9, 3, 5, 4, 0, 5, 5, 5, 5, 5, 5, 5, 5];
/// Offset of the audio block after the 16-byte header, indexed by codec id.
const OFFSET: [usize; CODEC_COUNT] = [6, 6, 6, 6, 0, 1, 1, 1, 1, 1, 1, 1, 1];

/// The codecs clients may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Codec {
    Celp51 = 0,
    Celp63 = 1,
    Gsm148 = 2,
    Gsm164 = 3,
    CelpWin52 = 4,
    Speex34 = 5,
    Speex52 = 6,
    Speex72 = 7,
    Speex93 = 8,
    Speex123 = 9,
    Speex163 = 10,
    Speex196 = 11,
    Speex259 = 12,
}

impl Codec {
    pub fn from_id(id: u8) -> Result<Codec> {
        if id as usize >= CODEC_COUNT {
            return Err(ProtocolError::UnknownCodec(id));
        }
        if id == Codec::CelpWin52 as u8 {
            return Err(ProtocolError::ReservedCodec(id));
        }
        // Bounds checked above.
        Ok(match id {
            0 => Codec::Celp51,
            1 => Codec::Celp63,
            2 => Codec::Gsm148,
            3 => Codec::Gsm164,
            5 => Codec::Speex34,
            6 => Codec::Speex52,
            7 => Codec::Speex72,
            8 => Codec::Speex93,
            9 => Codec::Speex123,
            10 => Codec::Speex163,
            11 => Codec::Speex196,
            _ => Codec::Speex259,
        })
    }

    /// Size of the raw audio block in bytes.
    pub fn audio_size(self) -> usize {
        AUDIO_SIZE[self as usize]
    }

    /// Frames per audio block.
    pub fn frames(self) -> usize {
        FRAMES[self as usize]
    }

    /// Offset of the audio block after the 16-byte header.
    pub fn offset(self) -> usize {
        OFFSET[self as usize]
    }

    /// Total expected datagram length for this codec.
    pub fn expected_len(self) -> usize {
        16 + self.offset() + self.audio_size()
    }
}

/// Build the u16 capability mask from a set of codec ids.
pub fn mask_of(ids: impl IntoIterator<Item = u8>) -> u16 {
    ids.into_iter()
        .filter(|&id| (id as usize) < CODEC_COUNT)
        .fold(0u16, |m, id| m | (1 << id))
}
