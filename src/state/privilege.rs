//! The privilege matrix and per-channel privilege records.
//!
//! Six user groups map onto a sparse set of bit offsets in the 0..88 range.
//! A check is `(any group the actor belongs to) AND (group has privilege)`;
//! membership is derived on every check, never cached.

/// Per-channel privilege flag bits.
pub mod channel_privs {
    pub const CHANADMIN: u16 = 1;
    pub const OP: u16 = 2;
    pub const VOICE: u16 = 4;
    pub const AUTOOP: u16 = 8;
    pub const AUTOVOICE: u16 = 16;
}

/// The six user groups, in bitfield order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum UserGroup {
    ServerAdmin = 0,
    ChannelAdmin = 1,
    Operator = 2,
    Voice = 3,
    Registered = 4,
    Anonymous = 5,
}

impl UserGroup {
    pub const ALL: [UserGroup; 6] = [
        UserGroup::ServerAdmin,
        UserGroup::ChannelAdmin,
        UserGroup::Operator,
        UserGroup::Voice,
        UserGroup::Registered,
        UserGroup::Anonymous,
    ];

    /// The `user_group` column value naming this group in the store.
    pub fn column_value(self) -> &'static str {
        match self {
            UserGroup::ServerAdmin => "server_admin",
            UserGroup::ChannelAdmin => "channel_admin",
            UserGroup::Operator => "operator",
            UserGroup::Voice => "voice",
            UserGroup::Registered => "registered",
            UserGroup::Anonymous => "anonymous",
        }
    }

    pub fn from_column_value(s: &str) -> Option<UserGroup> {
        UserGroup::ALL
            .into_iter()
            .find(|g| g.column_value() == s)
    }
}

/// Bit offsets of the defined privileges. The first two bytes of each
/// group's row are reserved, so offsets start at 16; holes in the range are
/// unassigned on the wire too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Privilege {
    AdmDelServer = 16,
    AdmAddServer = 17,
    AdmListServers = 18,
    AdmSetPermissions = 19,
    AdmChangeUserPass = 20,
    AdmChangeOwnPass = 21,
    AdmListRegistrations = 22,
    AdmRegisterPlayer = 23,
    AdmChangeServerCodecs = 24,
    AdmChangeServerType = 25,
    AdmChangeServerPass = 26,
    AdmChangeServerWelcome = 27,
    AdmChangeServerMaxUsers = 28,
    AdmChangeServerName = 29,
    AdmChangeWebpostUrl = 30,
    AdmChangeServerPort = 31,
    AdmStartServer = 36,
    AdmStopServer = 37,
    AdmMovePlayer = 38,
    AdmBanIp = 39,
    ChaDelete = 40,
    ChaCreateModerated = 41,
    ChaCreateSubchanneled = 42,
    ChaCreateDefault = 43,
    ChaCreateUnregistered = 44,
    ChaCreateRegistered = 45,
    ChaJoinRegistered = 46,
    ChaJoinWithoutPass = 48,
    ChaChangeCodec = 49,
    ChaChangeMaxUsers = 50,
    ChaChangeOrder = 51,
    ChaChangeDesc = 52,
    ChaChangeTopic = 53,
    ChaChangePass = 54,
    ChaChangeName = 55,
    PlGrantAllowReg = 56,
    PlGrantVoice = 57,
    PlGrantAutoVoice = 58,
    PlGrantOp = 59,
    PlGrantAutoOp = 60,
    PlGrantChanAdmin = 61,
    PlGrantServerAdmin = 62,
    PlRegisterPlayer = 64,
    PlRevokeAllowReg = 65,
    PlRevokeVoice = 66,
    PlRevokeAutoVoice = 67,
    PlRevokeOp = 68,
    PlRevokeAutoOp = 69,
    PlRevokeChanAdmin = 70,
    PlRevokeServerAdmin = 71,
    PlAllowSelfReg = 78,
    PlDelRegistration = 79,
    OtherChCommander = 80,
    OtherChKick = 81,
    OtherSvKick = 82,
    OtherTextPlayer = 83,
    OtherTextAllChannels = 84,
    OtherTextInChannel = 85,
    OtherTextAll = 86,
}

/// Privilege-to-column mapping for the `server_privileges` table, in
/// storage order.
pub const PRIVILEGE_COLUMNS: &[(Privilege, &str)] = &[
    (Privilege::AdmDelServer, "adm_del_server"),
    (Privilege::AdmAddServer, "adm_add_server"),
    (Privilege::AdmListServers, "adm_list_servers"),
    (Privilege::AdmSetPermissions, "adm_set_permissions"),
    (Privilege::AdmChangeUserPass, "adm_change_user_pass"),
    (Privilege::AdmChangeOwnPass, "adm_change_own_pass"),
    (Privilege::AdmListRegistrations, "adm_list_registrations"),
    (Privilege::AdmRegisterPlayer, "adm_register_player"),
    (Privilege::AdmChangeServerCodecs, "adm_change_server_codecs"),
    (Privilege::AdmChangeServerType, "adm_change_server_type"),
    (Privilege::AdmChangeServerPass, "adm_change_server_pass"),
    (Privilege::AdmChangeServerWelcome, "adm_change_server_welcome"),
    (Privilege::AdmChangeServerMaxUsers, "adm_change_server_maxusers"),
    (Privilege::AdmChangeServerName, "adm_change_server_name"),
    (Privilege::AdmChangeWebpostUrl, "adm_change_webpost_url"),
    (Privilege::AdmChangeServerPort, "adm_change_server_port"),
    (Privilege::AdmStartServer, "adm_start_server"),
    (Privilege::AdmStopServer, "adm_stop_server"),
    (Privilege::AdmMovePlayer, "adm_move_player"),
    (Privilege::AdmBanIp, "adm_ban_ip"),
    (Privilege::ChaDelete, "cha_delete"),
    (Privilege::ChaCreateModerated, "cha_create_moderated"),
    (Privilege::ChaCreateSubchanneled, "cha_create_subchanneled"),
    (Privilege::ChaCreateDefault, "cha_create_default"),
    (Privilege::ChaCreateUnregistered, "cha_create_unregistered"),
    (Privilege::ChaCreateRegistered, "cha_create_registered"),
    (Privilege::ChaJoinRegistered, "cha_join_registered"),
    (Privilege::ChaJoinWithoutPass, "cha_join_wo_pass"),
    (Privilege::ChaChangeCodec, "cha_change_codec"),
    (Privilege::ChaChangeMaxUsers, "cha_change_maxusers"),
    (Privilege::ChaChangeOrder, "cha_change_order"),
    (Privilege::ChaChangeDesc, "cha_change_desc"),
    (Privilege::ChaChangeTopic, "cha_change_topic"),
    (Privilege::ChaChangePass, "cha_change_pass"),
    (Privilege::ChaChangeName, "cha_change_name"),
    (Privilege::PlGrantAllowReg, "pl_grant_allowreg"),
    (Privilege::PlGrantVoice, "pl_grant_voice"),
    (Privilege::PlGrantAutoVoice, "pl_grant_autovoice"),
    (Privilege::PlGrantOp, "pl_grant_op"),
    (Privilege::PlGrantAutoOp, "pl_grant_autoop"),
    (Privilege::PlGrantChanAdmin, "pl_grant_ca"),
    (Privilege::PlGrantServerAdmin, "pl_grant_sa"),
    (Privilege::PlRegisterPlayer, "pl_register_player"),
    (Privilege::PlRevokeAllowReg, "pl_revoke_allowreg"),
    (Privilege::PlRevokeVoice, "pl_revoke_voice"),
    (Privilege::PlRevokeAutoVoice, "pl_revoke_autovoice"),
    (Privilege::PlRevokeOp, "pl_revoke_op"),
    (Privilege::PlRevokeAutoOp, "pl_revoke_autoop"),
    (Privilege::PlRevokeChanAdmin, "pl_revoke_ca"),
    (Privilege::PlRevokeServerAdmin, "pl_revoke_sa"),
    (Privilege::PlAllowSelfReg, "pl_allow_self_reg"),
    (Privilege::PlDelRegistration, "pl_del_registration"),
    (Privilege::OtherChCommander, "other_ch_commander"),
    (Privilege::OtherChKick, "other_ch_kick"),
    (Privilege::OtherSvKick, "other_sv_kick"),
    (Privilege::OtherTextPlayer, "other_text_pl"),
    (Privilege::OtherTextAllChannels, "other_text_all_ch"),
    (Privilege::OtherTextInChannel, "other_text_in_ch"),
    (Privilege::OtherTextAll, "other_text_all"),
];

/// Bytes of one group's row in the serialized bitfield. Nine bytes carry
/// only the offsets below 72; the matrix keeps the full 0..88 range, but
/// the wire form has no room for the rest.
const ROW_BYTES: usize = 9;

/// The 6-group privilege matrix.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeMatrix {
    rows: [u128; 6],
}

impl PrivilegeMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, group: UserGroup, privilege: Privilege, granted: bool) {
        let bit = 1u128 << (privilege as usize);
        if granted {
            self.rows[group as usize] |= bit;
        } else {
            self.rows[group as usize] &= !bit;
        }
    }

    pub fn get(&self, group: UserGroup, privilege: Privilege) -> bool {
        self.rows[group as usize] & (1u128 << (privilege as usize)) != 0
    }

    /// Serialize to the 6x9-byte bitfield carried by the accept reply.
    /// Within a byte, lower offsets occupy higher bits; offsets past the
    /// nine-byte row are never written.
    pub fn to_bitfield(&self) -> [u8; 6 * ROW_BYTES] {
        let mut out = [0u8; 6 * ROW_BYTES];
        for (g, row) in self.rows.iter().enumerate() {
            for offset in 0..ROW_BYTES * 8 {
                if row & (1u128 << offset) != 0 {
                    out[g * ROW_BYTES + offset / 8] |= 1 << (7 - offset % 8);
                }
            }
        }
        out
    }
}

/// Who a per-channel privilege record belongs to. A registered player's
/// record anchors to the registration and survives logout; an unregistered
/// player's record anchors to the player and dies with him.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeOwner {
    /// Public id of a connected, unregistered player.
    Player(u32),
    /// Database id of a registration.
    Registration(u32),
}

/// One `(channel, player-or-registration, flags)` record. Records live on
/// the top-level channel; subchannels consult the parent's list.
#[derive(Debug, Clone)]
pub struct ChannelPrivilege {
    pub owner: PrivilegeOwner,
    pub flags: u16,
}
