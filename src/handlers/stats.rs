//! Statistics queries, answered to the requester only.

use super::Ctx;
use crate::error::HandlerResult;
use crate::network::sender;
use bytes::BufMut;
use parley_proto::wire::{put_fixed_string, Reader, NAME_SLOT};
use parley_proto::{header, opcode};

/// Connection statistics of one player: 164 bytes, fixed layout.
pub fn player_stats(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };

    let privileges = ctx.state.channel_privileges_of(target, target.channel_id);
    let ip = target.addr.ip().to_string();

    let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_STATS);
    template.put_u32_le(target.public_id);
    template.put_u32_le(target.stats.connected_seconds());
    template.put_u32_le(0); // ping
    template.put_u16_le(target.stats.idle_seconds());
    template.put_u16_le(0); // packet loss, no event source
    for v in target.version {
        template.put_u16_le(v);
    }
    template.put_u32_le(target.stats.packets_sent);
    template.put_u32_le(target.stats.packets_received);
    template.put_u32_le(target.stats.bytes_sent);
    template.put_u32_le(target.stats.bytes_received);
    put_fixed_string(&mut template, &ip, NAME_SLOT);
    put_fixed_string(&mut template, &target.login, NAME_SLOT);
    template.put_u32_le(target.channel_id);
    template.put_u16_le(privileges);
    template.put_u16_le(target.global_flags);
    put_fixed_string(&mut template, &target.machine, NAME_SLOT);
    template.put_u16_le(0);
    debug_assert_eq!(template.len(), 164);

    sender::unicast(ctx.state, ctx.player_id, &template);
    Ok(())
}

/// Server-wide statistics: 100 bytes, fixed layout.
pub fn server_stats(ctx: &mut Ctx<'_>) -> HandlerResult {
    let stats = &ctx.state.stats;
    let rates = stats.timed_rates();

    let mut template = header::begin_notify(opcode::NOTIFY_SERVER_STATS);
    template.put_u64_le(stats.uptime_seconds());
    template.put_u16_le(501);
    template.put_u16_le(0);
    template.put_u16_le(2);
    template.put_u16_le(0);
    template.put_u32_le(ctx.state.players.len() as u32);
    template.put_u64_le(stats.packets_sent);
    template.put_u64_le(stats.bytes_sent);
    template.put_u64_le(stats.packets_received);
    template.put_u64_le(stats.bytes_received);
    template.put_u32_le(rates[0]);
    template.put_u32_le(rates[1]);
    template.put_u32_le(rates[2] / 60);
    template.put_u32_le(rates[3] / 60);
    template.put_u64_le(stats.total_logins);
    debug_assert_eq!(template.len(), 100);

    sender::unicast(ctx.state, ctx.player_id, &template);
    Ok(())
}
