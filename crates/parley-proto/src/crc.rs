//! CRC-32 over whole datagrams, zlib variant.
//!
//! Every control and connection datagram carries a CRC-32 computed with the
//! checksum slot zeroed: polynomial 0xEDB88320, initial value 0xFFFFFFFF,
//! final XOR, bytes fed LSB-first. The slot sits at byte offset 20 for the
//! default (control) layout and at offset 16 for connection datagrams.

use std::sync::OnceLock;

const POLY: u32 = 0xEDB8_8320;

/// Checksum offset in the default control layout.
pub const CRC_OFFSET_CONTROL: usize = 20;
/// Checksum offset in login / keepalive / accept datagrams.
pub const CRC_OFFSET_CONNECTION: usize = 16;

fn table() -> &'static [u32; 256] {
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0u32; 256];
        for (i, entry) in t.iter_mut().enumerate() {
            let mut v = i as u32;
            for _ in 0..8 {
                v = if v & 1 != 0 { (v >> 1) ^ POLY } else { v >> 1 };
            }
            *entry = v;
        }
        t
    })
}

/// Raw CRC-32 over a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let t = table();
    let mut crc = 0xFFFF_FFFFu32;
    for &b in data {
        crc = (crc >> 8) ^ t[((crc ^ b as u32) & 0xFF) as usize];
    }
    !crc
}

/// Zero the 4-byte slot at `offset`, checksum the whole datagram and write
/// the result back little-endian.
pub fn patch(data: &mut [u8], offset: usize) {
    data[offset..offset + 4].fill(0);
    let sum = crc32(data);
    data[offset..offset + 4].copy_from_slice(&sum.to_le_bytes());
}

/// Verify the checksum at `offset`. Returns false for datagrams too short to
/// hold the slot.
pub fn check(data: &[u8], offset: usize) -> bool {
    if data.len() < offset + 4 {
        return false;
    }
    let stored = u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]);
    let mut scratch = data.to_vec();
    scratch[offset..offset + 4].fill(0);
    crc32(&scratch) == stored
}
