//! Registration management.

use super::Ctx;
use crate::error::HandlerResult;
use crate::network::sender;
use crate::state::{global_flags, Privilege, PrivilegeOwner, Registration};
use bytes::BufMut;
use parley_proto::wire::{Reader, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::info;

fn allowed(ctx: &Ctx<'_>, privilege: Privilege, channel: Option<u32>) -> bool {
    match ctx.state.player(ctx.player_id) {
        Some(player) => ctx.state.has_privilege(player, privilege, channel),
        None => false,
    }
}

/// A player registers himself. His player-scoped privilege records on
/// registered channels are reanchored to the new registration, and the
/// REGISTERED flag is broadcast like any other global flag change.
pub async fn self_register(ctx: &mut Ctx<'_>) -> HandlerResult {
    let may_register = allowed(ctx, Privilege::PlAllowSelfReg, None)
        || ctx
            .state
            .player(ctx.player_id)
            .is_some_and(|p| p.global_flags & global_flags::ALLOWREG != 0);
    if !may_register {
        return Ok(());
    }

    let mut r = Reader::at(ctx.data, 24);
    let name = r.fixed_string(NAME_SLOT)?;
    let password = r.fixed_string(NAME_SLOT)?;

    let password_hash = Registration::hash_password(&password);
    let db_id = ctx
        .db
        .registrations()
        .insert(ctx.state.id, &name, &password_hash, false)
        .await?;
    ctx.state.add_registration(Registration {
        db_id,
        name: name.clone(),
        password_hash,
        global_flags: 0,
    });

    if let Some(player) = ctx.state.player_mut(ctx.player_id) {
        player.registration = Some(db_id);
        player.global_flags |= global_flags::REGISTERED;
    }
    // Rescope this player's records on registered channels, then persist
    // them under the new registration.
    let mut rescoped = Vec::new();
    for channel in ctx.state.channels.values_mut() {
        if !channel.is_registered() {
            continue;
        }
        for record in channel.privileges.iter_mut() {
            if record.owner == PrivilegeOwner::Player(ctx.player_id) {
                record.owner = PrivilegeOwner::Registration(db_id);
                rescoped.push((channel.db_id, record.flags));
            }
        }
    }
    for (channel_db_id, flags) in rescoped {
        if channel_db_id != 0 {
            ctx.db
                .privileges()
                .upsert_record(db_id, channel_db_id, flags)
                .await?;
        }
    }
    info!(player = ctx.player_id, name = %name, "player registered himself");

    // Broadcast the REGISTERED flag; changer id 0 marks the server itself.
    let mut template = header::begin_notify(opcode::NOTIFY_GLOBAL_FLAG_CHANGED);
    template.put_u32_le(ctx.player_id);
    template.put_u8(0);
    template.put_u8(2); // 1 << 2 == REGISTERED
    template.put_u32_le(0);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// An administrator creates a registration that is not tied to any
/// connected player.
pub async fn create(ctx: &mut Ctx<'_>) -> HandlerResult {
    if !allowed(ctx, Privilege::PlRegisterPlayer, None) {
        return Ok(());
    }

    let mut r = Reader::at(ctx.data, 24);
    let name = r.fixed_string(NAME_SLOT)?;
    let password = r.fixed_string(NAME_SLOT)?;
    let server_admin = r.u8()? != 0;

    let password_hash = Registration::hash_password(&password);
    let db_id = ctx
        .db
        .registrations()
        .insert(ctx.state.id, &name, &password_hash, server_admin)
        .await?;
    ctx.state.add_registration(Registration {
        db_id,
        name: name.clone(),
        password_hash,
        global_flags: if server_admin {
            global_flags::SERVERADMIN
        } else {
            0
        },
    });
    info!(name = %name, server_admin, "registration created");
    Ok(())
}
