//! Wire forms of the entities that appear inside notification bodies.
//!
//! The daemon's domain types convert themselves into these plain records,
//! which own the exact byte layouts: channels and bans use zero-terminated
//! strings, players a fixed 44-byte slot form.

use crate::wire::{self, Reader, NAME_SLOT};
use crate::error::Result;
use bytes::BufMut;

/// Parent field value marking a root channel.
pub const NO_PARENT: u32 = 0xFFFF_FFFF;

/// `id(4) flags(2) codec(2) parent(4) sort_order(2) max_users(2) name\0 topic\0 desc\0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub id: u32,
    pub flags: u16,
    pub codec: u16,
    /// [`NO_PARENT`] for root channels.
    pub parent_id: u32,
    pub sort_order: u16,
    pub max_users: u16,
    pub name: String,
    pub topic: String,
    pub description: String,
}

impl ChannelEntry {
    pub fn encoded_len(&self) -> usize {
        16 + self.name.len() + 1 + self.topic.len() + 1 + self.description.len() + 1
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.id);
        buf.put_u16_le(self.flags);
        buf.put_u16_le(self.codec);
        buf.put_u32_le(self.parent_id);
        buf.put_u16_le(self.sort_order);
        buf.put_u16_le(self.max_users);
        wire::put_zt_string(buf, &self.name);
        wire::put_zt_string(buf, &self.topic);
        wire::put_zt_string(buf, &self.description);
    }

    /// Decode one entry; used for the create-channel request body (the id
    /// field is carried but ignored there).
    pub fn decode(r: &mut Reader<'_>) -> Result<ChannelEntry> {
        let id = r.u32()?;
        let flags = r.u16()?;
        let codec = r.u16()?;
        let parent_id = r.u32()?;
        let sort_order = r.u16()?;
        let max_users = r.u16()?;
        let name = r.zt_string()?;
        let topic = r.zt_string()?;
        let description = r.zt_string()?;
        Ok(ChannelEntry {
            id,
            flags,
            codec,
            parent_id,
            sort_order,
            max_users,
            name,
            topic,
            description,
        })
    }
}

/// `public(4) channel(4) chan_privs(2) global_flags(2) attributes(2) nick(1+29)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    pub public_id: u32,
    pub channel_id: u32,
    pub channel_privileges: u16,
    pub global_flags: u16,
    pub attributes: u16,
    pub nickname: String,
}

/// Fixed size of an encoded player entry.
pub const PLAYER_ENTRY_LEN: usize = 44;

impl PlayerEntry {
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.public_id);
        buf.put_u32_le(self.channel_id);
        buf.put_u16_le(self.channel_privileges);
        buf.put_u16_le(self.global_flags);
        buf.put_u16_le(self.attributes);
        wire::put_fixed_string(buf, &self.nickname, NAME_SLOT);
    }
}

/// `ip\0 duration(2) reason\0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
    pub ip: String,
    pub duration_minutes: u16,
    pub reason: String,
}

impl BanEntry {
    pub fn encoded_len(&self) -> usize {
        self.ip.len() + 1 + 2 + self.reason.len() + 1
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        wire::put_zt_string(buf, &self.ip);
        buf.put_u16_le(self.duration_minutes);
        wire::put_zt_string(buf, &self.reason);
    }
}
