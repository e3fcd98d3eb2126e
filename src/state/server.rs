//! The per-server arena: channels, players, bans, registrations and the
//! privilege matrix, linked by plain ids.

use super::ban::Ban;
use super::channel::{flags as chan_flags, Channel};
use super::player::{global_flags, Player};
use super::privilege::{
    channel_privs, ChannelPrivilege, Privilege, PrivilegeMatrix, PrivilegeOwner, UserGroup,
};
use super::registration::Registration;
use super::stats::ServerStats;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::warn;

/// Everything one virtual server owns.
#[derive(Debug)]
pub struct ServerState {
    pub id: u32,
    pub name: String,
    pub password: String,
    pub welcome: String,
    pub machine: String,
    pub port: u16,
    pub codec_mask: u16,

    pub channels: HashMap<u32, Channel>,
    pub players: HashMap<u32, Player>,
    /// Players removed from the active set but still draining their queue.
    pub leaving: HashMap<u32, Player>,
    pub bans: Vec<Ban>,
    /// Registrations keyed by their store row id.
    pub registrations: HashMap<u32, Registration>,
    pub privileges: PrivilegeMatrix,
    pub stats: ServerStats,
}

fn first_free_id(used: impl Fn(u32) -> bool) -> u32 {
    let mut id = 1;
    while used(id) {
        id += 1;
    }
    id
}

impl ServerState {
    pub fn new(id: u32, name: String, password: String, welcome: String, port: u16, codec_mask: u16) -> Self {
        ServerState {
            id,
            name,
            password,
            welcome,
            machine: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            port,
            codec_mask,
            channels: HashMap::new(),
            players: HashMap::new(),
            leaving: HashMap::new(),
            bans: Vec::new(),
            registrations: HashMap::new(),
            privileges: PrivilegeMatrix::new(),
            stats: ServerStats::new(),
        }
    }

    // -- channels ----------------------------------------------------------

    /// Insert a channel, assigning the first free id. The first channel
    /// ever added becomes the default; a channel arriving with the DEFAULT
    /// flag takes it away from whoever had it.
    pub fn add_channel(&mut self, mut channel: Channel) -> u32 {
        if self.channels.is_empty() {
            channel.flags |= chan_flags::DEFAULT;
        }
        if channel.flags & chan_flags::DEFAULT != 0 {
            for ch in self.channels.values_mut() {
                ch.flags &= !chan_flags::DEFAULT;
            }
        }
        let id = first_free_id(|id| self.channels.contains_key(&id));
        channel.id = id;
        self.channels.insert(id, channel);
        id
    }

    pub fn channel(&self, id: u32) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_mut(&mut self, id: u32) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    pub fn channel_by_db_id(&self, db_id: u32) -> Option<&Channel> {
        self.channels.values().find(|c| c.db_id == db_id)
    }

    /// Attach `child` under `parent`. Fails when the parent cannot host
    /// subchannels or is itself a subchannel.
    pub fn add_subchannel(&mut self, parent_id: u32, child_id: u32) -> bool {
        let Some(parent) = self.channels.get(&parent_id) else {
            return false;
        };
        if parent.parent.is_some() || parent.flags & chan_flags::SUBCHANNELS == 0 {
            warn!(channel = parent_id, "channel cannot host subchannels");
            return false;
        }
        self.channels.get_mut(&parent_id).unwrap().subchannels.push(child_id);
        if let Some(child) = self.channels.get_mut(&child_id) {
            child.parent = Some(parent_id);
        }
        true
    }

    /// Remove an empty channel. The caller is responsible for the
    /// not-empty business rule; this just unlinks the tree.
    pub fn destroy_channel(&mut self, id: u32) -> Option<Channel> {
        let channel = self.channels.remove(&id)?;
        if let Some(parent_id) = channel.parent {
            if let Some(parent) = self.channels.get_mut(&parent_id) {
                parent.subchannels.retain(|&c| c != id);
            }
        }
        Some(channel)
    }

    /// Id of the default channel, creating one when the server has none.
    pub fn default_channel_id(&mut self) -> u32 {
        if let Some(id) = self
            .channels
            .values()
            .find(|c| c.flags & chan_flags::DEFAULT != 0)
            .map(|c| c.id)
        {
            return id;
        }
        self.add_channel(Channel::new(
            "Default".into(),
            String::new(),
            String::new(),
            chan_flags::DEFAULT | chan_flags::UNREGISTERED,
            9,
            0,
            128,
        ))
    }

    /// A subchannel's effective flags are the parent's with SUBCHANNELS and
    /// DEFAULT cleared; a root channel answers for itself.
    pub fn effective_flags(&self, id: u32) -> u16 {
        let Some(channel) = self.channels.get(&id) else {
            return 0;
        };
        match channel.parent.and_then(|p| self.channels.get(&p)) {
            Some(parent) => parent.flags & !(chan_flags::SUBCHANNELS | chan_flags::DEFAULT),
            None => channel.flags,
        }
    }

    /// A subchannel's effective password is the parent's.
    pub fn effective_password(&self, id: u32) -> &str {
        let Some(channel) = self.channels.get(&id) else {
            return "";
        };
        match channel.parent.and_then(|p| self.channels.get(&p)) {
            Some(parent) => &parent.password,
            None => &channel.password,
        }
    }

    // -- players -----------------------------------------------------------

    /// Accept a player into the arena: dense public id, random private id,
    /// placement in the default channel. Counts as a login.
    pub fn add_player(&mut self, mut player: Player) -> u32 {
        let public_id = first_free_id(|id| self.players.contains_key(&id));
        player.public_id = public_id;
        player.private_id = rand::random();
        let default_id = self.default_channel_id();
        player.channel_id = default_id;
        self.channels
            .get_mut(&default_id)
            .expect("default channel exists")
            .players
            .push(public_id);
        self.players.insert(public_id, player);
        self.stats.total_logins += 1;
        public_id
    }

    pub fn player(&self, public_id: u32) -> Option<&Player> {
        self.players.get(&public_id)
    }

    pub fn player_mut(&mut self, public_id: u32) -> Option<&mut Player> {
        self.players.get_mut(&public_id)
    }

    /// Look up a live player by the id pair; both must match.
    pub fn player_by_ids(&self, public_id: u32, private_id: u32) -> Option<&Player> {
        self.players
            .get(&public_id)
            .filter(|p| p.private_id == private_id)
    }

    pub fn leaving_player_by_ids_mut(
        &mut self,
        public_id: u32,
        private_id: u32,
    ) -> Option<&mut Player> {
        self.leaving
            .get_mut(&public_id)
            .filter(|p| p.private_id == private_id)
    }

    /// Move a player out of the active set into the leaving set: drop him
    /// from his channel, discard the privilege records that die with him
    /// and scrub mute references both ways. His queue keeps draining until
    /// the retransmitter destroys him.
    pub fn remove_player(&mut self, public_id: u32) {
        let Some(mut player) = self.players.remove(&public_id) else {
            return;
        };
        if let Some(channel) = self.channels.get_mut(&player.channel_id) {
            channel.players.retain(|&p| p != public_id);
        }
        let registered = player.is_registered();
        for channel in self.channels.values_mut() {
            if channel.flags & chan_flags::UNREGISTERED != 0 || !registered {
                channel
                    .privileges
                    .retain(|r| r.owner != PrivilegeOwner::Player(public_id));
            }
        }
        for other in self.players.values_mut() {
            other.muted.remove(&public_id);
        }
        player.muted.clear();
        self.leaving.insert(public_id, player);
    }

    /// Move a player between channels; fails when the destination is full.
    pub fn move_player(&mut self, public_id: u32, to: u32) -> bool {
        let Some(destination) = self.channels.get(&to) else {
            return false;
        };
        if destination.is_full() {
            return false;
        }
        let Some(player) = self.players.get_mut(&public_id) else {
            return false;
        };
        let from = player.channel_id;
        if from == to {
            return true;
        }
        player.channel_id = to;
        if let Some(old) = self.channels.get_mut(&from) {
            old.players.retain(|&p| p != public_id);
        }
        self.channels.get_mut(&to).unwrap().players.push(public_id);
        true
    }

    // -- bans --------------------------------------------------------------

    pub fn add_ban(&mut self, mut ban: Ban) -> u32 {
        let id = first_free_id(|id| self.bans.iter().any(|b| b.id == id));
        ban.id = id;
        self.bans.push(ban);
        id
    }

    pub fn ban_by_ip(&self, ip: IpAddr) -> Option<&Ban> {
        let ip = ip.to_string();
        self.bans.iter().find(|b| b.ip == ip)
    }

    pub fn remove_ban_by_ip(&mut self, ip: &str) -> bool {
        let before = self.bans.len();
        self.bans.retain(|b| b.ip != ip);
        self.bans.len() != before
    }

    // -- registrations -----------------------------------------------------

    pub fn add_registration(&mut self, registration: Registration) {
        self.registrations
            .insert(registration.db_id, registration);
    }

    /// Credential check: name and password digest must both match.
    pub fn registration_by_credentials(&self, login: &str, password: &str) -> Option<&Registration> {
        self.registrations
            .values()
            .find(|r| r.name == login && r.password_matches(password))
    }

    /// Drop a registration and rescope its per-channel privilege records to
    /// the still-connected player they described.
    pub fn unlink_registration(&mut self, db_id: u32, player_public_id: u32) {
        for channel in self.channels.values_mut() {
            for record in channel.privileges.iter_mut() {
                if record.owner == PrivilegeOwner::Registration(db_id) {
                    record.owner = PrivilegeOwner::Player(player_public_id);
                }
            }
        }
        self.registrations.remove(&db_id);
    }

    // -- per-channel privileges --------------------------------------------

    /// Channel id whose privilege list covers `id`: the parent for
    /// subchannels, the channel itself otherwise.
    pub fn privilege_holder(&self, id: u32) -> u32 {
        self.channels
            .get(&id)
            .and_then(|c| c.parent)
            .unwrap_or(id)
    }

    /// The privilege flags of a player in a channel.
    pub fn channel_privileges_of(&self, player: &Player, channel_id: u32) -> u16 {
        let holder = self.privilege_holder(channel_id);
        let Some(channel) = self.channels.get(&holder) else {
            return 0;
        };
        let owner = match player.registration {
            Some(reg) if player.is_registered() => PrivilegeOwner::Registration(reg),
            _ => PrivilegeOwner::Player(player.public_id),
        };
        channel
            .privileges
            .iter()
            .find(|r| r.owner == owner)
            .map(|r| r.flags)
            .unwrap_or(0)
    }

    /// Set or clear one privilege bit, creating the record on demand.
    /// Returns the record's new flags.
    pub fn change_channel_privilege(
        &mut self,
        player_public_id: u32,
        channel_id: u32,
        bit: u16,
        grant: bool,
    ) -> u16 {
        let holder = self.privilege_holder(channel_id);
        let owner = match self.players.get(&player_public_id) {
            Some(p) => match p.registration {
                Some(reg) if p.is_registered() => PrivilegeOwner::Registration(reg),
                _ => PrivilegeOwner::Player(player_public_id),
            },
            None => return 0,
        };
        let Some(channel) = self.channels.get_mut(&holder) else {
            return 0;
        };
        if let Some(record) = channel.privileges.iter_mut().find(|r| r.owner == owner) {
            if grant {
                record.flags |= bit;
            } else {
                record.flags &= !bit;
            }
            record.flags
        } else if grant {
            channel.privileges.push(ChannelPrivilege { owner, flags: bit });
            bit
        } else {
            0
        }
    }

    // -- privilege checks --------------------------------------------------

    fn is_in_group(&self, player: &Player, group: UserGroup, context: Option<u32>) -> bool {
        match group {
            UserGroup::ServerAdmin => player.global_flags & global_flags::SERVERADMIN != 0,
            UserGroup::Registered => player.global_flags & global_flags::REGISTERED != 0,
            UserGroup::Anonymous => true,
            UserGroup::ChannelAdmin | UserGroup::Operator | UserGroup::Voice => {
                if context != Some(player.channel_id) {
                    return false;
                }
                let flags = self.channel_privileges_of(player, player.channel_id);
                let bit = match group {
                    UserGroup::ChannelAdmin => channel_privs::CHANADMIN,
                    UserGroup::Operator => channel_privs::OP,
                    _ => channel_privs::VOICE,
                };
                flags & bit != 0
            }
        }
    }

    /// True iff any group the player belongs to in `context` carries the
    /// privilege. Membership is derived fresh on every call.
    pub fn has_privilege(&self, player: &Player, privilege: Privilege, context: Option<u32>) -> bool {
        UserGroup::ALL.into_iter().any(|group| {
            self.is_in_group(player, group, context) && self.privileges.get(group, privilege)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::channel_flags;
    use parley_proto::connect::LoginRequest;
    use std::net::SocketAddr;

    fn test_state() -> ServerState {
        ServerState::new(
            1,
            "test".into(),
            "secret".into(),
            "hi".into(),
            8767,
            0x1FEF,
        )
    }

    fn test_player(state: &mut ServerState) -> u32 {
        let req = LoginRequest {
            client: "client".into(),
            machine: "machine".into(),
            version: [2, 0, 32, 60],
            login: String::new(),
            password: "secret".into(),
            nickname: "nick".into(),
        };
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        state.add_player(Player::from_login(&req, addr))
    }

    fn plain_channel(name: &str, flags: u16, max_users: u16) -> Channel {
        Channel::new(name.into(), String::new(), String::new(), flags, 9, 0, max_users)
    }

    #[test]
    fn first_channel_becomes_default() {
        let mut state = test_state();
        let id = state.add_channel(plain_channel("a", 0, 16));
        assert_ne!(state.channel(id).unwrap().flags & channel_flags::DEFAULT, 0);
    }

    #[test]
    fn default_flag_is_exclusive() {
        let mut state = test_state();
        let a = state.add_channel(plain_channel("a", 0, 16));
        let b = state.add_channel(plain_channel("b", channel_flags::DEFAULT, 16));
        assert_eq!(state.channel(a).unwrap().flags & channel_flags::DEFAULT, 0);
        assert_ne!(state.channel(b).unwrap().flags & channel_flags::DEFAULT, 0);
    }

    #[test]
    fn channel_ids_are_dense_and_reused() {
        let mut state = test_state();
        let a = state.add_channel(plain_channel("a", 0, 16));
        let b = state.add_channel(plain_channel("b", 0, 16));
        assert_eq!((a, b), (1, 2));
        state.destroy_channel(b);
        // But make channel 1 keep the default flag, so the new channel
        // reuses slot 2.
        assert_eq!(state.add_channel(plain_channel("c", 0, 16)), 2);
    }

    #[test]
    fn players_land_in_the_default_channel() {
        let mut state = test_state();
        let ch = state.add_channel(plain_channel("a", 0, 16));
        let pl = test_player(&mut state);
        assert_eq!(state.player(pl).unwrap().channel_id, ch);
        assert!(state.channel(ch).unwrap().players.contains(&pl));
        assert_eq!(state.stats.total_logins, 1);
    }

    #[test]
    fn player_lookup_requires_both_ids() {
        let mut state = test_state();
        state.add_channel(plain_channel("a", 0, 16));
        let pl = test_player(&mut state);
        let private = state.player(pl).unwrap().private_id;
        assert!(state.player_by_ids(pl, private).is_some());
        assert!(state.player_by_ids(pl, private.wrapping_add(1)).is_none());
    }

    #[test]
    fn move_respects_capacity() {
        let mut state = test_state();
        state.add_channel(plain_channel("default", 0, 16));
        let full = state.add_channel(plain_channel("full", 0, 0));
        let pl = test_player(&mut state);
        assert!(!state.move_player(pl, full));
        let roomy = state.add_channel(plain_channel("roomy", 0, 4));
        assert!(state.move_player(pl, roomy));
        assert_eq!(state.player(pl).unwrap().channel_id, roomy);
        assert!(state.channel(roomy).unwrap().players.contains(&pl));
    }

    #[test]
    fn remove_player_moves_to_leaving_and_scrubs_mutes() {
        let mut state = test_state();
        state.add_channel(plain_channel("a", 0, 16));
        let p1 = test_player(&mut state);
        let p2 = test_player(&mut state);
        state.player_mut(p2).unwrap().muted.insert(p1);

        state.remove_player(p1);
        assert!(state.players.get(&p1).is_none());
        assert!(state.leaving.contains_key(&p1));
        assert!(!state.player(p2).unwrap().muted.contains(&p1));
        let ch = state.player(p2).unwrap().channel_id;
        assert!(!state.channel(ch).unwrap().players.contains(&p1));
    }

    #[test]
    fn subchannel_inherits_flags_and_password() {
        let mut state = test_state();
        let mut parent = plain_channel(
            "parent",
            channel_flags::SUBCHANNELS | channel_flags::PASSWORD,
            16,
        );
        parent.password = "open sesame".into();
        let parent_id = state.add_channel(parent);
        let child_id = state.add_channel(plain_channel("child", 0, 16));
        assert!(state.add_subchannel(parent_id, child_id));

        let flags = state.effective_flags(child_id);
        assert_eq!(flags & channel_flags::SUBCHANNELS, 0);
        assert_eq!(flags & channel_flags::DEFAULT, 0);
        assert_ne!(flags & channel_flags::PASSWORD, 0);
        assert_eq!(state.effective_password(child_id), "open sesame");
    }

    #[test]
    fn subchannel_privileges_live_on_the_parent() {
        let mut state = test_state();
        let parent_id = state.add_channel(plain_channel(
            "parent",
            channel_flags::SUBCHANNELS,
            16,
        ));
        let child_id = state.add_channel(plain_channel("child", 0, 16));
        assert!(state.add_subchannel(parent_id, child_id));
        let pl = test_player(&mut state);

        state.change_channel_privilege(pl, child_id, channel_privs::OP, true);
        // The record landed on the parent and is visible through the child.
        assert_eq!(
            state.channel(parent_id).unwrap().privileges.len(),
            1
        );
        let player = state.player(pl).unwrap();
        assert_eq!(
            state.channel_privileges_of(player, child_id),
            channel_privs::OP
        );
    }

    #[test]
    fn privilege_check_combines_groups_and_matrix() {
        let mut state = test_state();
        let ch = state.add_channel(plain_channel("a", 0, 16));
        let pl = test_player(&mut state);
        state
            .privileges
            .set(UserGroup::Operator, Privilege::OtherChKick, true);

        let player = state.player(pl).unwrap();
        assert!(!state.has_privilege(player, Privilege::OtherChKick, Some(ch)));

        state.change_channel_privilege(pl, ch, channel_privs::OP, true);
        let player = state.player(pl).unwrap();
        assert!(state.has_privilege(player, Privilege::OtherChKick, Some(ch)));
        // Channel groups only apply in the player's own channel context.
        assert!(!state.has_privilege(player, Privilege::OtherChKick, None));
    }

    #[test]
    fn server_admin_group_ignores_context() {
        let mut state = test_state();
        state.add_channel(plain_channel("a", 0, 16));
        let pl = test_player(&mut state);
        state
            .privileges
            .set(UserGroup::ServerAdmin, Privilege::AdmBanIp, true);
        state.player_mut(pl).unwrap().global_flags |= global_flags::SERVERADMIN;
        let player = state.player(pl).unwrap();
        assert!(state.has_privilege(player, Privilege::AdmBanIp, None));
    }

    #[test]
    fn unlink_registration_rescopes_records() {
        let mut state = test_state();
        let ch = state.add_channel(plain_channel("a", 0, 16));
        let pl = test_player(&mut state);
        {
            let player = state.player_mut(pl).unwrap();
            player.global_flags |= global_flags::REGISTERED;
            player.registration = Some(42);
        }
        state.add_registration(Registration {
            db_id: 42,
            name: "nick".into(),
            password_hash: Registration::hash_password("pw"),
            global_flags: 0,
        });
        state.change_channel_privilege(pl, ch, channel_privs::VOICE, true);
        assert_eq!(
            state.channel(ch).unwrap().privileges[0].owner,
            PrivilegeOwner::Registration(42)
        );

        state.unlink_registration(42, pl);
        assert!(state.registrations.is_empty());
        assert_eq!(
            state.channel(ch).unwrap().privileges[0].owner,
            PrivilegeOwner::Player(pl)
        );
    }

    #[test]
    fn ban_lookup_by_ip() {
        let mut state = test_state();
        state.add_ban(Ban::new(0, "10.1.2.3".into(), "spam".into()));
        assert!(state.ban_by_ip("10.1.2.3".parse().unwrap()).is_some());
        assert!(state.ban_by_ip("10.1.2.4".parse().unwrap()).is_none());
        assert!(state.remove_ban_by_ip("10.1.2.3"));
        assert!(state.ban_by_ip("10.1.2.3".parse().unwrap()).is_none());
    }
}
