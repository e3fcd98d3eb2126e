//! Channels and the two-level channel tree.

use super::privilege::ChannelPrivilege;
use parley_proto::records::{ChannelEntry, NO_PARENT};

/// Channel flag bits. `REGISTERED` is not a bit of its own: it means the
/// `UNREGISTERED` bit is clear.
pub mod flags {
    pub const UNREGISTERED: u16 = 1;
    pub const MODERATED: u16 = 2;
    pub const PASSWORD: u16 = 4;
    pub const SUBCHANNELS: u16 = 8;
    pub const DEFAULT: u16 = 16;
}

/// A text/voice channel. Subchannels are exactly one level deep; a
/// subchannel keeps its own codec and slots but inherits flags and password
/// from the parent (see [`ServerState::effective_flags`]).
///
/// [`ServerState::effective_flags`]: super::ServerState::effective_flags
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: u32,
    /// Row id in the store; 0 for unregistered channels.
    pub db_id: u32,
    pub flags: u16,
    pub codec: u16,
    pub sort_order: u16,
    pub max_users: u16,
    pub name: String,
    pub topic: String,
    pub description: String,
    pub password: String,
    /// Channel id of the parent, for subchannels.
    pub parent: Option<u32>,
    /// Public ids of the players currently inside.
    pub players: Vec<u32>,
    /// Subchannel ids.
    pub subchannels: Vec<u32>,
    /// Per-channel privilege records (top-level channels only).
    pub privileges: Vec<ChannelPrivilege>,
}

impl Channel {
    pub fn new(
        name: String,
        topic: String,
        description: String,
        flags: u16,
        codec: u16,
        sort_order: u16,
        max_users: u16,
    ) -> Self {
        Channel {
            id: 0,
            db_id: 0,
            flags,
            codec,
            sort_order,
            max_users,
            name,
            topic,
            description,
            password: String::new(),
            parent: None,
            players: Vec::new(),
            subchannels: Vec::new(),
            privileges: Vec::new(),
        }
    }

    /// The default channel never fills up; everyone else is bounded by
    /// `max_users`.
    pub fn is_full(&self) -> bool {
        if self.flags & flags::DEFAULT != 0 {
            return false;
        }
        self.players.len() >= self.max_users as usize
    }

    pub fn is_registered(&self) -> bool {
        self.flags & flags::UNREGISTERED == 0
    }

    pub fn to_entry(&self) -> ChannelEntry {
        ChannelEntry {
            id: self.id,
            flags: self.flags,
            codec: self.codec,
            parent_id: self.parent.unwrap_or(NO_PARENT),
            sort_order: self.sort_order,
            max_users: self.max_users,
            name: self.name.clone(),
            topic: self.topic.clone(),
            description: self.description.clone(),
        }
    }
}
