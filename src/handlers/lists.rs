//! The channel + player listing a client requests right after login.

use super::Ctx;
use crate::error::{HandlerError, HandlerResult};
use crate::network::sender;
use bytes::BufMut;
use parley_proto::records::PLAYER_ENTRY_LEN;
use parley_proto::{header, opcode};
use tracing::warn;

/// Players per listing chunk.
const PLAYERS_PER_PACKET: usize = 10;

/// Reply with the channel list, the player list in chunks of ten, and the
/// fixed trailer packet legacy clients expect before they finish their
/// handshake.
pub fn channels_and_players(ctx: &mut Ctx<'_>) -> HandlerResult {
    if ctx.data.len() != 120 {
        warn!(len = ctx.data.len(), "list request has invalid size");
        return Err(HandlerError::RequestTooShort {
            len: ctx.data.len(),
            min: 120,
        });
    }

    // Channel list, one packet.
    let mut channels = header::begin_notify(opcode::NOTIFY_CHANNEL_LIST);
    let mut ids: Vec<u32> = ctx.state.channels.keys().copied().collect();
    ids.sort_unstable();
    channels.put_u32_le(ids.len() as u32);
    for id in &ids {
        ctx.state.channels[id].to_entry().encode_into(&mut channels);
    }
    sender::unicast(ctx.state, ctx.player_id, &channels);

    // Player list, chunks of ten.
    let mut player_ids: Vec<u32> = ctx.state.players.keys().copied().collect();
    player_ids.sort_unstable();
    for chunk in player_ids.chunks(PLAYERS_PER_PACKET) {
        let mut packet = header::begin_notify(opcode::NOTIFY_PLAYER_LIST);
        packet.put_u32_le(chunk.len() as u32);
        for id in chunk {
            let player = &ctx.state.players[id];
            let privileges = ctx.state.channel_privileges_of(player, player.channel_id);
            player.to_entry(privileges).encode_into(&mut packet);
        }
        // Short chunks pad out to the full ten slots.
        packet.put_bytes(
            0,
            (PLAYERS_PER_PACKET - chunk.len()) * PLAYER_ENTRY_LEN,
        );
        sender::unicast(ctx.state, ctx.player_id, &packet);
    }

    // The undocumented 283-byte trailer: 256 zero bytes, then "na".
    let mut trailer = header::begin_notify(0x0008);
    trailer.put_bytes(0, 256);
    trailer.put_u8(0x6e);
    trailer.put_u8(0x61);
    trailer.put_u8(0);
    sender::unicast(ctx.state, ctx.player_id, &trailer);

    Ok(())
}
