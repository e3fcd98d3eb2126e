//! Player-directed operations: channel switching, attributes, privileges,
//! global flags, muting and admin moves.

use super::Ctx;
use crate::error::HandlerResult;
use crate::network::sender;
use crate::state::{attributes, channel_flags, channel_privs, global_flags, Privilege};
use bytes::BufMut;
use parley_proto::wire::{put_fixed_string, Reader, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::{debug, warn};

fn allowed(ctx: &Ctx<'_>, privilege: Privilege, channel: Option<u32>) -> bool {
    match ctx.state.player(ctx.player_id) {
        Some(player) => ctx.state.has_privilege(player, privilege, channel),
        None => false,
    }
}

fn notify_attributes(ctx: &mut Ctx<'_>, public_id: u32, attributes: u16) {
    let mut template = header::begin_notify(opcode::NOTIFY_ATTRIBUTES_CHANGED);
    template.put_u32_le(public_id);
    template.put_u16_le(attributes);
    sender::broadcast(ctx.state, &template, None);
}

/// A player wants into another channel. Admission: no password on the
/// channel, the join-without-password privilege, or the right password.
pub fn switch_channel(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let to = r.u32()?;
    let password = r.fixed_string(NAME_SLOT)?;

    if ctx.state.channel(to).is_none() {
        return Ok(());
    }
    let admitted = ctx.state.effective_flags(to) & channel_flags::PASSWORD == 0
        || allowed(ctx, Privilege::ChaJoinWithoutPass, Some(to))
        || password == ctx.state.effective_password(to);
    if !admitted {
        return Ok(());
    }

    let from = match ctx.state.player(ctx.player_id) {
        Some(p) => p.channel_id,
        None => return Ok(()),
    };
    if !ctx.state.move_player(ctx.player_id, to) {
        return Ok(());
    }
    debug!(player = ctx.player_id, from, to, "player switched channel");

    let privileges = ctx
        .state
        .player(ctx.player_id)
        .map(|p| ctx.state.channel_privileges_of(p, to))
        .unwrap_or(0);
    let mut template = header::begin_notify(opcode::NOTIFY_SWITCH_CHANNEL);
    template.put_u32_le(ctx.player_id);
    template.put_u32_le(from);
    template.put_u32_le(to);
    template.put_u16_le(privileges);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// A player updates his own attribute bits. No gate: the attributes only
/// describe him.
pub fn change_attributes(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let new_attributes = r.u16()?;
    if let Some(player) = ctx.state.player_mut(ctx.player_id) {
        player.attributes = new_attributes;
    }
    notify_attributes(ctx, ctx.player_id, new_attributes);
    Ok(())
}

/// Ask for voice in a moderated channel. Pointless when the player already
/// has voice or the channel is not moderated; both are dropped.
pub fn request_voice(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let reason = r.fixed_string(NAME_SLOT)?;

    let Some(player) = ctx.state.player(ctx.player_id) else {
        return Ok(());
    };
    let channel_id = player.channel_id;
    let has_voice =
        ctx.state.channel_privileges_of(player, channel_id) & channel_privs::VOICE != 0;
    let moderated = ctx.state.effective_flags(channel_id) & channel_flags::MODERATED != 0;
    if has_voice || !moderated {
        debug!(player = ctx.player_id, "voice request ignored");
        return Ok(());
    }

    if let Some(player) = ctx.state.player_mut(ctx.player_id) {
        player.voice_request = reason.clone();
        player.attributes |= attributes::REQUEST_VOICE;
    }
    let mut template = header::begin_notify(opcode::NOTIFY_VOICE_REQUESTED);
    template.put_u32_le(ctx.player_id);
    put_fixed_string(&mut template, &reason, NAME_SLOT);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// Grant (0) or revoke (2) one per-channel privilege bit of another player.
/// Granting voice also clears a pending voice request, with its own
/// attribute broadcast.
pub async fn change_channel_privilege(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let on_off = r.u8()?;
    let right = r.u8()?;

    let bit = 1u16 << right;
    let required = match (bit, on_off) {
        (channel_privs::CHANADMIN, 0) => Privilege::PlGrantChanAdmin,
        (channel_privs::CHANADMIN, _) => Privilege::PlRevokeChanAdmin,
        (channel_privs::OP, 0) => Privilege::PlGrantOp,
        (channel_privs::OP, _) => Privilege::PlRevokeOp,
        (channel_privs::VOICE, 0) => Privilege::PlGrantVoice,
        (channel_privs::VOICE, _) => Privilege::PlRevokeVoice,
        (channel_privs::AUTOOP, 0) => Privilege::PlGrantAutoOp,
        (channel_privs::AUTOOP, _) => Privilege::PlRevokeAutoOp,
        (channel_privs::AUTOVOICE, 0) => Privilege::PlGrantAutoVoice,
        (channel_privs::AUTOVOICE, _) => Privilege::PlRevokeAutoVoice,
        _ => return Ok(()),
    };
    if on_off != 0 && on_off != 2 {
        return Ok(());
    }

    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };
    let target_channel = target.channel_id;
    if !allowed(ctx, required, Some(target_channel)) {
        return Ok(());
    }

    let flags = ctx
        .state
        .change_channel_privilege(target_id, target_channel, bit, on_off == 0);

    // Registration-scoped records on registered channels are persisted.
    let holder = ctx.state.privilege_holder(target_channel);
    let registration = ctx
        .state
        .player(target_id)
        .filter(|p| p.is_registered())
        .and_then(|p| p.registration);
    let channel_db_id = ctx.state.channel(holder).map(|c| c.db_id).unwrap_or(0);
    if let Some(reg_id) = registration {
        if channel_db_id != 0 {
            ctx.db
                .privileges()
                .upsert_record(reg_id, channel_db_id, flags)
                .await?;
        }
    }

    // Granting voice satisfies a pending request.
    if bit == channel_privs::VOICE && on_off == 0 {
        let pending = ctx
            .state
            .player(target_id)
            .is_some_and(|p| p.attributes & attributes::REQUEST_VOICE != 0);
        if pending {
            let new_attributes = {
                let target = ctx.state.player_mut(target_id).expect("checked above");
                target.attributes &= !attributes::REQUEST_VOICE;
                target.voice_request.clear();
                target.attributes
            };
            notify_attributes(ctx, target_id, new_attributes);
        }
    }

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_PRIVILEGE_CHANGED);
    template.put_u32_le(target_id);
    template.put_u8(on_off);
    template.put_u8(right);
    template.put_u32_le(ctx.player_id);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// Grant (0) or revoke (2) one global flag of another player. Revoking the
/// REGISTERED flag deletes the registration: its rows disappear and its
/// per-channel privilege records reattach to the still-connected player.
pub async fn change_global_flag(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let on_off = r.u8()?;
    let right = r.u8()?;

    let bit = 1u16 << right;
    let required = match (bit, on_off) {
        (global_flags::SERVERADMIN, 0) => Privilege::PlGrantServerAdmin,
        (global_flags::SERVERADMIN, _) => Privilege::PlRevokeServerAdmin,
        (global_flags::ALLOWREG, 0) => Privilege::PlGrantAllowReg,
        (global_flags::ALLOWREG, _) => Privilege::PlRevokeAllowReg,
        (global_flags::REGISTERED, 0) => Privilege::PlAllowSelfReg,
        (global_flags::REGISTERED, _) => Privilege::PlDelRegistration,
        _ => {
            warn!(right, "global flag change not implemented for this bit");
            return Ok(());
        }
    };
    if on_off != 0 && on_off != 2 {
        return Ok(());
    }

    let Some(target) = ctx.state.player(target_id) else {
        return Ok(());
    };
    let target_channel = target.channel_id;
    if !allowed(ctx, required, Some(target_channel)) {
        return Ok(());
    }

    if on_off == 2 {
        if let Some(player) = ctx.state.player_mut(target_id) {
            player.global_flags &= !bit;
        }
        if bit == global_flags::REGISTERED {
            let registration = ctx.state.player(target_id).and_then(|p| p.registration);
            if let Some(reg_id) = registration {
                ctx.db.registrations().delete(reg_id).await?;
                ctx.state.unlink_registration(reg_id, target_id);
                if let Some(player) = ctx.state.player_mut(target_id) {
                    player.registration = None;
                }
            }
        }
    } else if let Some(player) = ctx.state.player_mut(target_id) {
        player.global_flags |= bit;
    }

    let mut template = header::begin_notify(opcode::NOTIFY_GLOBAL_FLAG_CHANGED);
    template.put_u32_le(target_id);
    template.put_u8(on_off);
    template.put_u8(right);
    template.put_u32_le(ctx.player_id);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// Mute (1) or unmute (0) another player locally. Only the requester is
/// told; muting shapes his audio fan-out and nothing else.
pub fn mute(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let on_off = r.u8()?;

    if target_id == ctx.player_id {
        warn!(player = ctx.player_id, "player tried to mute himself");
        return Ok(());
    }
    if ctx.state.player(target_id).is_none() {
        warn!(target = target_id, "mute target does not exist");
        return Ok(());
    }

    let changed = match on_off {
        1 => ctx
            .state
            .player_mut(ctx.player_id)
            .is_some_and(|p| p.muted.insert(target_id)),
        0 => ctx
            .state
            .player_mut(ctx.player_id)
            .is_some_and(|p| p.muted.remove(&target_id)),
        _ => {
            warn!(on_off, "mute request with unknown mode");
            return Ok(());
        }
    };
    if !changed {
        warn!(
            player = ctx.player_id,
            target = target_id,
            "mute request changed nothing"
        );
        return Ok(());
    }

    let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_MUTED);
    template.put_u32_le(target_id);
    template.put_u8(on_off);
    sender::unicast(ctx.state, ctx.player_id, &template);
    Ok(())
}

/// An administrator moves another player into a channel.
pub fn move_player(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let target_id = r.u32()?;
    let to = r.u32()?;

    if ctx.state.channel(to).is_none() || ctx.state.player(target_id).is_none() {
        return Ok(());
    }
    if !allowed(ctx, Privilege::AdmMovePlayer, Some(to)) {
        return Ok(());
    }

    let from = ctx
        .state
        .player(target_id)
        .map(|p| p.channel_id)
        .expect("checked above");
    if !ctx.state.move_player(target_id, to) {
        return Ok(());
    }

    let privileges = ctx
        .state
        .player(target_id)
        .map(|p| ctx.state.channel_privileges_of(p, to))
        .unwrap_or(0);
    let mut template = header::begin_notify(opcode::NOTIFY_PLAYER_MOVED);
    template.put_u32_le(target_id);
    template.put_u32_le(from);
    template.put_u32_le(to);
    template.put_u32_le(ctx.player_id);
    template.put_u16_le(privileges);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}
