//! Traffic accounting for servers and players.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Direction of an accounted datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Per-server totals plus a one-minute window for rate reporting.
#[derive(Debug)]
pub struct ServerStats {
    pub start_time: DateTime<Utc>,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub total_logins: u64,
    window: VecDeque<(DateTime<Utc>, usize, Direction)>,
}

impl ServerStats {
    pub fn new() -> Self {
        ServerStats {
            start_time: Utc::now(),
            packets_received: 0,
            packets_sent: 0,
            bytes_received: 0,
            bytes_sent: 0,
            total_logins: 0,
            window: VecDeque::new(),
        }
    }

    /// Account one datagram and prune entries older than a minute.
    pub fn add_packet(&mut self, size: usize, direction: Direction) {
        match direction {
            Direction::In => {
                self.packets_received += 1;
                self.bytes_received += size as u64;
            }
            Direction::Out => {
                self.packets_sent += 1;
                self.bytes_sent += size as u64;
            }
        }
        let now = Utc::now();
        self.window.push_back((now, size, direction));
        let horizon = now - chrono::Duration::seconds(60);
        while matches!(self.window.front(), Some((t, _, _)) if *t < horizon) {
            self.window.pop_front();
        }
    }

    /// Bytes received and sent over the last second and the last minute:
    /// `[rx_1s, tx_1s, rx_60s, tx_60s]`.
    pub fn timed_rates(&self) -> [u32; 4] {
        let now = Utc::now();
        let second = now - chrono::Duration::seconds(1);
        let minute = now - chrono::Duration::seconds(60);
        let mut rates = [0u32; 4];
        for (t, size, direction) in &self.window {
            let (sec_slot, min_slot) = match direction {
                Direction::In => (0, 2),
                Direction::Out => (1, 3),
            };
            if *t >= minute {
                rates[min_slot] += *size as u32;
                if *t >= second {
                    rates[sec_slot] += *size as u32;
                }
            }
        }
        rates
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds().max(0) as u64
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-player connection statistics.
#[derive(Debug, Clone)]
pub struct PlayerStats {
    pub start_time: DateTime<Utc>,
    /// Last time the player sent anything; exposed as idle time.
    pub activity_time: DateTime<Utc>,
    pub packets_received: u32,
    pub packets_sent: u32,
    pub bytes_received: u32,
    pub bytes_sent: u32,
    /// Never incremented: loss reporting has no event source wired up.
    pub packets_lost: u32,
}

impl PlayerStats {
    pub fn new() -> Self {
        let now = Utc::now();
        PlayerStats {
            start_time: now,
            activity_time: now,
            packets_received: 0,
            packets_sent: 0,
            bytes_received: 0,
            bytes_sent: 0,
            packets_lost: 0,
        }
    }

    pub fn touch(&mut self) {
        self.activity_time = Utc::now();
    }

    pub fn connected_seconds(&self) -> u32 {
        (Utc::now() - self.start_time).num_seconds().max(0) as u32
    }

    pub fn idle_seconds(&self) -> u16 {
        (Utc::now() - self.activity_time).num_seconds().clamp(0, u16::MAX as i64) as u16
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::new()
    }
}
