//! Connected players.

use super::stats::PlayerStats;
use crate::network::queue::PacketQueue;
use parley_proto::connect::LoginRequest;
use parley_proto::records::PlayerEntry;
use std::collections::HashSet;
use std::net::SocketAddr;

/// Global flag bits.
pub mod global_flags {
    pub const SERVERADMIN: u16 = 1;
    pub const ALLOWREG: u16 = 2;
    pub const REGISTERED: u16 = 4;
}

/// Player attribute bits.
pub mod attributes {
    pub const BLOCK_WHISPER: u16 = 4;
    pub const AWAY: u16 = 8;
    pub const MUTE_MIC: u16 = 16;
    pub const MUTE_SPK: u16 = 32;
    pub const REQUEST_VOICE: u16 = 64;
}

/// Per-family packet counters, one pair per direction.
#[derive(Debug, Clone)]
pub struct Counters {
    pub f0_s: u32,
    pub f0_c: u32,
    pub f1_s: u32,
    pub f1_c: u32,
    pub f4_s: u32,
    pub f4_c: u32,
}

impl Default for Counters {
    fn default() -> Self {
        // The connection counter starts at 2: the accept reply itself is
        // counted as the first f4 exchange.
        Counters {
            f0_s: 1,
            f0_c: 1,
            f1_s: 1,
            f1_c: 1,
            f4_s: 2,
            f4_c: 1,
        }
    }
}

/// A connected player. The public id is a dense small integer every peer
/// sees; the private id is a random cookie only the owning client knows,
/// and the pair must match on every request.
#[derive(Debug)]
pub struct Player {
    pub public_id: u32,
    pub private_id: u32,

    pub nickname: String,
    pub login: String,
    pub client: String,
    pub machine: String,
    pub version: [u16; 4],

    pub global_flags: u16,
    pub attributes: u16,
    /// Reason text of a pending voice request.
    pub voice_request: String,

    /// Channel the player is in.
    pub channel_id: u32,
    /// Database id of the registration this player logged in with.
    pub registration: Option<u32>,

    /// Public ids of players this player muted.
    pub muted: HashSet<u32>,

    pub addr: SocketAddr,
    pub stats: PlayerStats,
    pub counters: Counters,
    pub queue: PacketQueue,
}

impl Player {
    /// Build a player from a decoded login request. Ids and channel are
    /// assigned at insertion.
    pub fn from_login(req: &LoginRequest, addr: SocketAddr) -> Self {
        Player {
            public_id: 0,
            private_id: 0,
            nickname: req.nickname.clone(),
            login: req.login.clone(),
            client: req.client.clone(),
            machine: req.machine.clone(),
            version: req.version,
            global_flags: 0,
            attributes: 0,
            voice_request: String::new(),
            channel_id: 0,
            registration: None,
            muted: HashSet::new(),
            addr,
            stats: PlayerStats::new(),
            counters: Counters::default(),
            queue: PacketQueue::new(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.global_flags & global_flags::REGISTERED != 0
    }

    /// Wire form for list replies and the new-player notification.
    /// `channel_privileges` is resolved by the arena (it lives on the
    /// channel, not the player).
    pub fn to_entry(&self, channel_privileges: u16) -> PlayerEntry {
        PlayerEntry {
            public_id: self.public_id,
            channel_id: self.channel_id,
            channel_privileges,
            global_flags: self.global_flags,
            attributes: self.attributes,
            nickname: self.nickname.clone(),
        }
    }
}
