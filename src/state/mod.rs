//! In-memory domain model: one arena per server.
//!
//! All intra-arena links are plain ids (channel ids, public player ids,
//! registration database ids); nothing owns a back-reference. The receiver
//! task is the only mutator of the domain collections, the retransmitter
//! only walks the player tables.

mod ban;
mod channel;
mod player;
mod privilege;
mod registration;
mod server;
mod stats;

pub use ban::Ban;
pub use channel::{flags as channel_flags, Channel};
pub use player::{attributes, global_flags, Player};
pub use privilege::{
    channel_privs, ChannelPrivilege, Privilege, PrivilegeMatrix, PrivilegeOwner, UserGroup,
    PRIVILEGE_COLUMNS,
};
pub use registration::Registration;
pub use server::ServerState;
pub use stats::{Direction, PlayerStats, ServerStats};
