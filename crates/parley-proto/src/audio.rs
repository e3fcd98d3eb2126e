//! Audio datagram validation and per-recipient rewriting.
//!
//! Inbound audio (family 0xbef2) carries a 16-byte header followed by an
//! opaque block whose size the codec table dictates. The server validates
//! the length, rewrites the header into the outbound 0xbef3 form once, then
//! patches the recipient ids per listener. Audio is never queued.

use crate::codec::Codec;
use crate::error::{ProtocolError, Result};
use crate::header::FAMILY_AUDIO_OUT;
use crate::wire::{self, Reader};
use bytes::BufMut;

/// Size of the inbound audio header.
pub const AUDIO_HEADER_LEN: usize = 16;

/// Byte offsets of the recipient ids in the outbound datagram.
const OUT_PRIVATE_OFFSET: usize = 4;
const OUT_PUBLIC_OFFSET: usize = 8;

/// Decoded header of an inbound audio datagram.
#[derive(Debug, Clone, Copy)]
pub struct AudioHeader {
    pub codec: Codec,
    pub private_id: u32,
    pub public_id: u32,
    /// Conversation counter, bytes 12..14.
    pub conversation: u16,
    /// Packet counter, bytes 14..16.
    pub counter: u16,
}

impl AudioHeader {
    pub fn decode(data: &[u8]) -> Result<AudioHeader> {
        if data.len() < AUDIO_HEADER_LEN {
            return Err(ProtocolError::TooShort {
                kind: "audio",
                len: data.len(),
            });
        }
        let mut r = Reader::at(data, 3);
        let codec = Codec::from_id(r.u8()?)?;
        let private_id = r.u32()?;
        let public_id = r.u32()?;
        let conversation = r.u16()?;
        let counter = r.u16()?;
        Ok(AudioHeader {
            codec,
            private_id,
            public_id,
            conversation,
            counter,
        })
    }

    /// Validate the datagram length against the codec table.
    pub fn check_len(&self, len: usize) -> Result<()> {
        let expected = self.codec.expected_len();
        if len != expected {
            return Err(ProtocolError::BadLength { len, expected });
        }
        Ok(())
    }
}

/// Build the outbound datagram template for one inbound audio datagram:
/// six bytes longer, recipient ids zeroed, sender public id and both
/// counters carried over, audio block copied verbatim.
pub fn build_forward(inbound: &[u8], header: &AudioHeader, sender_public_id: u32) -> Vec<u8> {
    let block = &inbound[AUDIO_HEADER_LEN..];
    let mut buf = Vec::with_capacity(inbound.len() + 6);
    buf.put_u16_le(FAMILY_AUDIO_OUT);
    buf.put_u8(0);
    buf.put_u8(header.codec as u8);
    buf.put_u32_le(0); // recipient private id
    buf.put_u32_le(0); // recipient public id
    buf.put_u16_le(0);
    buf.put_u16_le(header.counter);
    buf.put_u32_le(sender_public_id);
    buf.put_u16_le(header.conversation);
    buf.put_slice(block);
    buf
}

/// Patch the recipient ids of a forward template in place. Audio datagrams
/// carry no checksum, so this is all the per-recipient work there is.
pub fn address_forward(data: &mut [u8], private_id: u32, public_id: u32) {
    wire::patch_u32(data, OUT_PRIVATE_OFFSET, private_id);
    wire::patch_u32(data, OUT_PUBLIC_OFFSET, public_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FAMILY_AUDIO;

    fn sample_datagram(codec: u8, block_len: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u16_le(FAMILY_AUDIO);
        buf.put_u8(0);
        buf.put_u8(codec);
        buf.put_u32_le(0x1111_2222); // private
        buf.put_u32_le(7); // public
        buf.put_u16_le(0x0301); // conversation
        buf.put_u16_le(0x0042); // counter
        buf.extend((0..block_len).map(|i| i as u8));
        buf
    }

    #[test]
    fn decode_and_length_check() {
        // SPEEX 12.3: offset 1, block 138 -> 155 bytes total.
        let data = sample_datagram(9, 1 + 138);
        assert_eq!(data.len(), 155);
        let hdr = AudioHeader::decode(&data).unwrap();
        assert_eq!(hdr.codec as u8, 9);
        assert_eq!(hdr.public_id, 7);
        assert!(hdr.check_len(data.len()).is_ok());
        assert!(matches!(
            hdr.check_len(154),
            Err(ProtocolError::BadLength { .. })
        ));
    }

    #[test]
    fn forward_preserves_block_and_counters() {
        let data = sample_datagram(9, 1 + 138);
        let hdr = AudioHeader::decode(&data).unwrap();
        let mut out = build_forward(&data, &hdr, 7);
        assert_eq!(out.len(), data.len() + 6);
        assert_eq!(wire::get_u16(&out, 0), FAMILY_AUDIO_OUT);
        assert_eq!(out[3], 9);
        // Counter and conversation swap positions on the way out.
        assert_eq!(wire::get_u16(&out, 14), 0x0042);
        assert_eq!(wire::get_u16(&out, 20), 0x0301);
        assert_eq!(wire::get_u32(&out, 16), 7);
        assert_eq!(&out[22..], &data[16..]);

        address_forward(&mut out, 0xAAAA_BBBB, 3);
        assert_eq!(wire::get_u32(&out, 4), 0xAAAA_BBBB);
        assert_eq!(wire::get_u32(&out, 8), 3);
        // The audio block is untouched by addressing.
        assert_eq!(&out[22..], &data[16..]);
    }

    #[test]
    fn reserved_codec_never_decodes() {
        let data = sample_datagram(4, 0);
        assert!(matches!(
            AudioHeader::decode(&data),
            Err(ProtocolError::ReservedCodec(4))
        ));
    }
}
