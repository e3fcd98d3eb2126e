//! The per-player reliable outbound queue.
//!
//! Every notification is enqueued here and sent by the retransmit task;
//! only the head entry is ever on the wire. Each send bumps the 16-bit
//! version counter inside the datagram and refreshes its checksum, so the
//! receiver can match acknowledgements against the exact bytes it saw.

use parley_proto::{crc, header, wire};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Resend the head entry when it has been quiet this long.
pub const RETRANSMIT_INTERVAL: Duration = Duration::from_millis(500);
/// Give up on a peer after this many resends of one datagram.
pub const MAX_RETRANSMITS: u16 = 50;

/// One queued datagram.
#[derive(Debug)]
struct Entry {
    data: Vec<u8>,
    last_sent: Option<Instant>,
}

/// FIFO of outbound datagrams for one player.
#[derive(Debug, Default)]
pub struct PacketQueue {
    entries: VecDeque<Entry>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a finished datagram (checksum already in place).
    pub fn push(&mut self, data: Vec<u8>) {
        self.entries.push_back(Entry {
            data,
            last_sent: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Version counter of the head entry.
    pub fn head_version(&self) -> Option<u16> {
        self.entries
            .front()
            .map(|e| wire::get_u16(&e.data, header::VERSION_OFFSET))
    }

    /// The head has been retransmitted past the give-up threshold.
    pub fn head_timed_out(&self) -> bool {
        matches!(self.head_version(), Some(v) if v > MAX_RETRANSMITS)
    }

    /// If the head entry is due for (re)transmission, return a copy of its
    /// bytes and advance its version counter and checksum in place.
    /// Freshly enqueued entries are due immediately.
    pub fn take_due(&mut self, now: Instant) -> Option<Vec<u8>> {
        let entry = self.entries.front_mut()?;
        let due = match entry.last_sent {
            None => true,
            Some(t) => now.duration_since(t) > RETRANSMIT_INTERVAL,
        };
        if !due {
            return None;
        }
        let wire_copy = entry.data.clone();
        let version = wire::get_u16(&entry.data, header::VERSION_OFFSET);
        wire::patch_u16(&mut entry.data, header::VERSION_OFFSET, version.wrapping_add(1));
        crc::patch(&mut entry.data, crc::CRC_OFFSET_CONTROL);
        entry.last_sent = Some(now);
        Some(wire_copy)
    }

    /// Pop the head iff the acknowledged counter matches it and the
    /// acknowledged version is not newer than what was last sent. Later
    /// entries never overtake the head, which is the ordering guarantee.
    pub fn acknowledge(&mut self, counter: u32, version: u16) -> bool {
        let matches = self.entries.front().is_some_and(|e| {
            let head_counter = wire::get_u32(&e.data, header::COUNTER_OFFSET);
            let head_version = wire::get_u16(&e.data, header::VERSION_OFFSET);
            head_counter == counter && version <= head_version
        });
        if matches {
            self.entries.pop_front();
        }
        matches
    }
}
