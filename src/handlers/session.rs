//! Arrival and departure notifications, and the voluntary leave request.

use super::Ctx;
use crate::error::{HandlerError, HandlerResult};
use crate::network::sender;
use crate::state::ServerState;
use bytes::BufMut;
use parley_proto::wire::{put_fixed_string, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::{debug, warn};

/// Tell everyone except the newcomer that a player arrived. The body is
/// the newcomer's 44-byte wire record.
pub fn notify_new_player(state: &mut ServerState, public_id: u32) {
    let Some(player) = state.player(public_id) else {
        return;
    };
    let privileges = state.channel_privileges_of(player, player.channel_id);
    let mut template = header::begin_notify(opcode::NOTIFY_NEW_PLAYER);
    player.to_entry(privileges).encode_into(&mut template);
    sender::broadcast(state, &template, Some(public_id));
}

/// Tell everyone a player left on his own (or timed out). Reason 1 renders
/// as a plain departure.
pub fn notify_player_left(state: &mut ServerState, public_id: u32) {
    let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_LEFT);
    template.put_u32_le(public_id);
    template.put_u32_le(opcode::LEFT_REASON_QUIT);
    template.put_bytes(0, 32);
    sender::broadcast(state, &template, None);
}

/// Tell everyone a player was kicked or banned off the server: reason 2,
/// the kicker's id and the reason text.
pub fn notify_player_kicked(state: &mut ServerState, target: u32, kicker: u32, reason: &str) {
    let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_LEFT);
    template.put_u32_le(target);
    template.put_u16_le(opcode::LEFT_REASON_KICKED as u16);
    template.put_u32_le(kicker);
    put_fixed_string(&mut template, reason, NAME_SLOT);
    sender::broadcast(state, &template, None);
}

/// Shutdown notice: every player is told his own session ends, reason 4.
pub fn notify_server_stopping(state: &mut ServerState) {
    let ids: Vec<u32> = state.players.keys().copied().collect();
    for public_id in ids {
        let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_LEFT);
        template.put_u32_le(public_id);
        template.put_u32_le(opcode::LEFT_REASON_SERVER_STOPPING);
        template.put_bytes(0, 32);
        sender::unicast(state, public_id, &template);
    }
}

/// A client announced it is leaving. The departure broadcast still reaches
/// the leaving player's queue, so his client sees its own goodbye before
/// the queue drains.
pub fn leave(ctx: &mut Ctx<'_>) -> HandlerResult {
    if ctx.data.len() != 24 {
        warn!(len = ctx.data.len(), "leave request has invalid size");
        return Err(HandlerError::RequestTooShort {
            len: ctx.data.len(),
            min: 24,
        });
    }
    debug!(player = ctx.player_id, "player leaving");
    notify_player_left(ctx.state, ctx.player_id);
    ctx.state.remove_player(ctx.player_id);
    Ok(())
}
