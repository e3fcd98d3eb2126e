//! Control request handlers.
//!
//! Every handler follows the same contract: the dispatcher has already
//! checked length and checksum, resolved the requester by his id pair and
//! acknowledged the request. The handler checks privilege, mutates the
//! model, persists registered entities and enqueues the notification
//! fan-out. Privilege denials are silent: the ack went out, nothing else
//! follows, and the client infers denial from the missing broadcast.

pub mod channel;
pub mod kickban;
pub mod lists;
pub mod message;
pub mod player;
pub mod registration;
pub mod session;
pub mod stats;

use crate::db::Database;
use crate::error::{HandlerError, HandlerResult};
use crate::state::ServerState;
use parley_proto::opcode::{self, DIR_CHANNEL, DIR_CLIENT};

/// Per-request context handed to every handler.
pub struct Ctx<'a> {
    pub state: &'a mut ServerState,
    pub db: &'a Database,
    /// The raw request datagram, checksum already verified.
    pub data: &'a [u8],
    /// Public id of the requesting player.
    pub player_id: u32,
}

/// One row of the operation table.
pub struct Operation {
    pub direction: u8,
    pub code: u8,
    /// Minimum datagram length including the 24-byte header.
    pub min_len: usize,
    pub name: &'static str,
}

/// The complete operation set, keyed by `(direction, code)`.
pub const OPERATIONS: &[Operation] = &[
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_LIST, min_len: 120, name: "list" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CREATE_CHANNEL, min_len: 43, name: "create_channel" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_PASSWORD, min_len: 58, name: "change_channel_password" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_FLAGS_CODEC, min_len: 32, name: "change_channel_flags_codec" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_NAME, min_len: 29, name: "change_channel_name" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_TOPIC, min_len: 29, name: "change_channel_topic" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_DESC, min_len: 29, name: "change_channel_desc" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_DELETE_CHANNEL, min_len: 28, name: "delete_channel" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_MAX_USERS, min_len: 30, name: "change_channel_max_users" },
    Operation { direction: DIR_CHANNEL, code: opcode::REQ_CHANGE_CHANNEL_ORDER, min_len: 30, name: "change_channel_order" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_LEAVE, min_len: 24, name: "leave" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_KICK_SERVER, min_len: 60, name: "kick_server" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_KICK_CHANNEL, min_len: 60, name: "kick_channel" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_SWITCH_CHANNEL, min_len: 58, name: "switch_channel" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_CHANGE_ATTRIBUTES, min_len: 26, name: "change_attributes" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_REQUEST_VOICE, min_len: 54, name: "request_voice" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_CHANGE_CHANNEL_PRIVILEGE, min_len: 30, name: "change_channel_privilege" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_CHANGE_GLOBAL_FLAG, min_len: 30, name: "change_global_flag" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_SELF_REGISTER, min_len: 84, name: "self_register" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_CREATE_REGISTRATION, min_len: 85, name: "create_registration" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_MUTE_PLAYER, min_len: 29, name: "mute_player" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_IP_BAN, min_len: 27, name: "ip_ban" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_BAN_PLAYER, min_len: 58, name: "ban_player" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_REMOVE_BAN, min_len: 25, name: "remove_ban" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_MOVE_PLAYER, min_len: 32, name: "move_player" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_PLAYER_STATS, min_len: 28, name: "player_stats" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_SERVER_STATS, min_len: 24, name: "server_stats" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_BAN_LIST, min_len: 24, name: "ban_list" },
    Operation { direction: DIR_CLIENT, code: opcode::REQ_SEND_MESSAGE, min_len: 34, name: "send_message" },
];

/// Look up an operation; `None` means an unknown code that is logged and
/// dropped by the caller.
pub fn lookup(direction: u8, code: u8) -> Option<&'static Operation> {
    OPERATIONS
        .iter()
        .find(|op| op.direction == direction && op.code == code)
}

/// Run the handler for a validated, acknowledged request.
pub async fn dispatch(ctx: &mut Ctx<'_>, direction: u8, code: u8) -> HandlerResult {
    match (direction, code) {
        (DIR_CHANNEL, opcode::REQ_LIST) => lists::channels_and_players(ctx),
        (DIR_CHANNEL, opcode::REQ_CREATE_CHANNEL) => channel::create(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_PASSWORD) => channel::change_password(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_FLAGS_CODEC) => {
            channel::change_flags_codec(ctx).await
        }
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_NAME) => channel::change_name(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_TOPIC) => channel::change_topic(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_DESC) => channel::change_description(ctx).await,
        (DIR_CHANNEL, opcode::REQ_DELETE_CHANNEL) => channel::delete(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_MAX_USERS) => channel::change_max_users(ctx).await,
        (DIR_CHANNEL, opcode::REQ_CHANGE_CHANNEL_ORDER) => channel::change_order(ctx).await,
        (DIR_CLIENT, opcode::REQ_LEAVE) => session::leave(ctx),
        (DIR_CLIENT, opcode::REQ_KICK_SERVER) => kickban::kick_server(ctx),
        (DIR_CLIENT, opcode::REQ_KICK_CHANNEL) => kickban::kick_channel(ctx),
        (DIR_CLIENT, opcode::REQ_SWITCH_CHANNEL) => player::switch_channel(ctx),
        (DIR_CLIENT, opcode::REQ_CHANGE_ATTRIBUTES) => player::change_attributes(ctx),
        (DIR_CLIENT, opcode::REQ_REQUEST_VOICE) => player::request_voice(ctx),
        (DIR_CLIENT, opcode::REQ_CHANGE_CHANNEL_PRIVILEGE) => {
            player::change_channel_privilege(ctx).await
        }
        (DIR_CLIENT, opcode::REQ_CHANGE_GLOBAL_FLAG) => player::change_global_flag(ctx).await,
        (DIR_CLIENT, opcode::REQ_SELF_REGISTER) => registration::self_register(ctx).await,
        (DIR_CLIENT, opcode::REQ_CREATE_REGISTRATION) => registration::create(ctx).await,
        (DIR_CLIENT, opcode::REQ_MUTE_PLAYER) => player::mute(ctx),
        (DIR_CLIENT, opcode::REQ_IP_BAN) => kickban::ip_ban(ctx),
        (DIR_CLIENT, opcode::REQ_BAN_PLAYER) => kickban::ban_player(ctx),
        (DIR_CLIENT, opcode::REQ_REMOVE_BAN) => kickban::remove_ban(ctx),
        (DIR_CLIENT, opcode::REQ_MOVE_PLAYER) => player::move_player(ctx),
        (DIR_CLIENT, opcode::REQ_PLAYER_STATS) => stats::player_stats(ctx),
        (DIR_CLIENT, opcode::REQ_SERVER_STATS) => stats::server_stats(ctx),
        (DIR_CLIENT, opcode::REQ_BAN_LIST) => kickban::list_bans(ctx),
        (DIR_CLIENT, opcode::REQ_SEND_MESSAGE) => message::send(ctx),
        _ => Err(HandlerError::UnknownOpcode { direction, code }),
    }
}
