//! Operation codes of the control family.
//!
//! A request is addressed by datagram byte 2 (the code) and byte 3 (the
//! direction: 0 for the channel-management class, 1 for the client class).
//! Notifications sent by the server use 16-bit little-endian opcodes; for
//! most operations the notification code is unrelated to the request code,
//! so both sets are kept explicit here.

/// Channel-management request class (direction byte 0).
pub const DIR_CHANNEL: u8 = 0;
/// Client request class (direction byte 1).
pub const DIR_CLIENT: u8 = 1;

// -- requests, direction 0 ------------------------------------------------

pub const REQ_LIST: u8 = 0x05;
pub const REQ_CREATE_CHANNEL: u8 = 0xc9;
pub const REQ_CHANGE_CHANNEL_PASSWORD: u8 = 0xcb;
pub const REQ_CHANGE_CHANNEL_FLAGS_CODEC: u8 = 0xcd;
pub const REQ_CHANGE_CHANNEL_NAME: u8 = 0xce;
pub const REQ_CHANGE_CHANNEL_TOPIC: u8 = 0xcf;
pub const REQ_CHANGE_CHANNEL_DESC: u8 = 0xd0;
pub const REQ_DELETE_CHANNEL: u8 = 0xd1;
pub const REQ_CHANGE_CHANNEL_MAX_USERS: u8 = 0xd2;
pub const REQ_CHANGE_CHANNEL_ORDER: u8 = 0xd4;

// -- requests, direction 1 ------------------------------------------------

pub const REQ_LEAVE: u8 = 0x2c;
pub const REQ_KICK_SERVER: u8 = 0x2d;
pub const REQ_KICK_CHANNEL: u8 = 0x2e;
pub const REQ_SWITCH_CHANNEL: u8 = 0x2f;
pub const REQ_CHANGE_ATTRIBUTES: u8 = 0x30;
pub const REQ_REQUEST_VOICE: u8 = 0x31;
pub const REQ_CHANGE_CHANNEL_PRIVILEGE: u8 = 0x32;
pub const REQ_CHANGE_GLOBAL_FLAG: u8 = 0x33;
pub const REQ_SELF_REGISTER: u8 = 0x34;
pub const REQ_CREATE_REGISTRATION: u8 = 0x36;
pub const REQ_MUTE_PLAYER: u8 = 0x40;
pub const REQ_IP_BAN: u8 = 0x44;
pub const REQ_BAN_PLAYER: u8 = 0x45;
pub const REQ_REMOVE_BAN: u8 = 0x46;
pub const REQ_MOVE_PLAYER: u8 = 0x4a;
pub const REQ_PLAYER_STATS: u8 = 0x90;
pub const REQ_SERVER_STATS: u8 = 0x95;
pub const REQ_BAN_LIST: u8 = 0x9a;
pub const REQ_SEND_MESSAGE: u8 = 0xae;

// -- notifications --------------------------------------------------------

pub const NOTIFY_CHANNEL_LIST: u16 = 0x0006;
pub const NOTIFY_PLAYER_LIST: u16 = 0x0007;
pub const NOTIFY_NEW_PLAYER: u16 = 0x0064;
pub const NOTIFY_PLAYER_LEFT: u16 = 0x0065;
pub const NOTIFY_CHANNEL_KICK: u16 = 0x0066;
pub const NOTIFY_SWITCH_CHANNEL: u16 = 0x0067;
pub const NOTIFY_ATTRIBUTES_CHANGED: u16 = 0x0068;
pub const NOTIFY_CHANNEL_PRIVILEGE_CHANGED: u16 = 0x006a;
pub const NOTIFY_GLOBAL_FLAG_CHANGED: u16 = 0x006b;
pub const NOTIFY_PLAYER_MOVED: u16 = 0x006d;
pub const NOTIFY_CHANNEL_CREATED: u16 = 0x006e;
pub const NOTIFY_CHANNEL_NAME: u16 = 0x006f;
pub const NOTIFY_CHANNEL_TOPIC: u16 = 0x0070;
pub const NOTIFY_CHANNEL_FLAGS_CODEC: u16 = 0x0071;
pub const NOTIFY_CHANNEL_DESC: u16 = 0x0072;
pub const NOTIFY_CHANNEL_DELETED: u16 = 0x0073;
pub const NOTIFY_CHANNEL_MAX_USERS: u16 = 0x0074;
pub const NOTIFY_CHANNEL_ORDER: u16 = 0x0075;
pub const NOTIFY_MESSAGE: u16 = 0x0082;
/// Echo of a mute / unmute request, requester only.
pub const NOTIFY_PLAYER_MUTED: u16 = 0x0040;
/// A player asked for voice in a moderated channel.
pub const NOTIFY_VOICE_REQUESTED: u16 = 0x0031;
pub const NOTIFY_DELETE_CHANNEL_ERROR: u16 = 0xff93;
pub const NOTIFY_PLAYER_STATS: u16 = 0x0194;
pub const NOTIFY_SERVER_STATS: u16 = 0x0196;
pub const NOTIFY_BAN_LIST: u16 = 0x019b;

// -- connection subtypes --------------------------------------------------

pub const CONN_KEEPALIVE: u16 = 0x0001;
pub const CONN_KEEPALIVE_REPLY: u16 = 0x0002;
pub const CONN_LOGIN: u16 = 0x0003;
pub const CONN_ACCEPT: u16 = 0x0004;

// -- player-left reason codes ---------------------------------------------

pub const LEFT_REASON_QUIT: u32 = 1;
pub const LEFT_REASON_KICKED: u32 = 2;
pub const LEFT_REASON_SERVER_STOPPING: u32 = 4;
