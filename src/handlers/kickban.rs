//! Kicks, bans and the ban list.

use super::session::notify_player_kicked;
use super::Ctx;
use crate::error::{HandlerError, HandlerResult};
use crate::network::sender;
use crate::state::{Ban, Privilege};
use bytes::BufMut;
use parley_proto::wire::{put_fixed_string, Reader, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::{info, warn};

fn allowed(ctx: &Ctx<'_>, privilege: Privilege, channel: Option<u32>) -> bool {
    match ctx.state.player(ctx.player_id) {
        Some(player) => ctx.state.has_privilege(player, privilege, channel),
        None => false,
    }
}

/// Throw another player off the server.
pub fn kick_server(ctx: &mut Ctx<'_>) -> HandlerResult {
    if ctx.data.len() != 60 {
        warn!(len = ctx.data.len(), "server kick request has invalid size");
        return Err(HandlerError::RequestTooShort {
            len: ctx.data.len(),
            min: 60,
        });
    }
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let reason = r.fixed_string(NAME_SLOT)?;

    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };
    let target_channel = target.channel_id;
    if !allowed(ctx, Privilege::OtherSvKick, Some(target_channel)) {
        return Ok(());
    }

    info!(target = target_id, kicker = ctx.player_id, reason = %reason, "player kicked from server");
    notify_player_kicked(ctx.state, target_id, ctx.player_id, &reason);
    ctx.state.remove_player(target_id);
    Ok(())
}

/// Throw another player back into the default channel.
pub fn kick_channel(ctx: &mut Ctx<'_>) -> HandlerResult {
    if ctx.data.len() != 60 {
        warn!(len = ctx.data.len(), "channel kick request has invalid size");
        return Err(HandlerError::RequestTooShort {
            len: ctx.data.len(),
            min: 60,
        });
    }
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let reason = r.fixed_string(NAME_SLOT)?;

    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };
    let from = target.channel_id;
    if !allowed(ctx, Privilege::OtherChKick, Some(from)) {
        return Ok(());
    }
    let default_id = ctx.state.default_channel_id();

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_KICK);
    template.put_u32_le(target_id);
    template.put_u32_le(from);
    template.put_u32_le(ctx.player_id);
    template.put_u16_le(0);
    put_fixed_string(&mut template, &reason, NAME_SLOT);
    sender::broadcast(ctx.state, &template, None);

    ctx.state.move_player(target_id, default_id);
    Ok(())
}

/// Ban another player's address and throw him off.
pub fn ban_player(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    // The duration field overlaps the reason slot in the historical
    // layout; the stored ban is permanent regardless.
    let reason = r.fixed_string(NAME_SLOT)?;

    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };
    let target_channel = target.channel_id;
    let target_ip = target.addr.ip().to_string();
    if !allowed(ctx, Privilege::AdmBanIp, Some(target_channel)) {
        return Ok(());
    }

    ctx.state.add_ban(Ban::new(0, target_ip, reason.clone()));
    info!(target = target_id, banner = ctx.player_id, reason = %reason, "player banned");
    notify_player_kicked(ctx.state, target_id, ctx.player_id, &reason);
    ctx.state.remove_player(target_id);
    Ok(())
}

/// Ban a raw address without a connected player.
pub fn ip_ban(ctx: &mut Ctx<'_>) -> HandlerResult {
    if !allowed(ctx, Privilege::AdmBanIp, None) {
        return Ok(());
    }
    let mut r = Reader::at(ctx.data, 24);
    let duration = r.u16()?;
    let ip = r.zt_string()?;
    info!(ip = %ip, duration, "address banned");
    ctx.state.add_ban(Ban::new(duration, ip, "IP BAN".into()));
    Ok(())
}

/// Lift the ban on an address.
pub fn remove_ban(ctx: &mut Ctx<'_>) -> HandlerResult {
    if !allowed(ctx, Privilege::AdmBanIp, None) {
        return Ok(());
    }
    let mut r = Reader::at(ctx.data, 24);
    let ip = r.zt_string()?;
    if ctx.state.remove_ban_by_ip(&ip) {
        info!(ip = %ip, "ban removed");
    }
    Ok(())
}

/// Send the requester the full ban list.
pub fn list_bans(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut template = header::begin_notify(opcode::NOTIFY_BAN_LIST);
    template.put_u32_le(ctx.state.bans.len() as u32);
    for ban in &ctx.state.bans {
        ban.to_entry().encode_into(&mut template);
    }
    sender::unicast(ctx.state, ctx.player_id, &template);
    Ok(())
}
