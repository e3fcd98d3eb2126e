//! Channel management: create, delete and the per-field mutations.

use super::Ctx;
use crate::error::HandlerResult;
use crate::network::sender;
use crate::state::{channel_flags, Channel, Privilege};
use bytes::BufMut;
use parley_proto::records::{ChannelEntry, NO_PARENT};
use parley_proto::wire::{self, put_zt_string, Reader, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::{debug, info};

fn allowed(ctx: &Ctx<'_>, privilege: Privilege, channel: Option<u32>) -> bool {
    match ctx.state.player(ctx.player_id) {
        Some(player) => ctx.state.has_privilege(player, privilege, channel),
        None => false,
    }
}

fn is_effectively_registered(ctx: &Ctx<'_>, channel_id: u32) -> bool {
    ctx.state.effective_flags(channel_id) & channel_flags::UNREGISTERED == 0
}

/// Write the channel back to the store when it is registered.
async fn persist(ctx: &mut Ctx<'_>, channel_id: u32) -> HandlerResult {
    if !is_effectively_registered(ctx, channel_id) {
        return Ok(());
    }
    if let Some(snapshot) = ctx.state.channel(channel_id).cloned() {
        if snapshot.db_id != 0 {
            ctx.db.channels().update(&snapshot).await?;
        }
    }
    Ok(())
}

/// Create a channel from the request body. Each flag the new channel
/// carries needs its own creation privilege; one refusal kills the whole
/// request silently.
pub async fn create(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let entry = ChannelEntry::decode(&mut r)?;
    let password = if r.remaining() >= 1 + NAME_SLOT {
        r.fixed_string(NAME_SLOT)?
    } else {
        String::new()
    };

    let flags = entry.flags;
    let mut denied = false;
    if flags & channel_flags::UNREGISTERED != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateUnregistered, None);
    } else {
        denied |= !allowed(ctx, Privilege::ChaCreateRegistered, None);
    }
    if flags & channel_flags::DEFAULT != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateDefault, None);
    }
    if flags & channel_flags::MODERATED != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateModerated, None);
    }
    if flags & channel_flags::SUBCHANNELS != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateSubchanneled, None);
    }
    if denied {
        return Ok(());
    }

    let mut channel = Channel::new(
        entry.name,
        entry.topic,
        entry.description,
        entry.flags,
        entry.codec,
        entry.sort_order,
        entry.max_users,
    );
    if !password.is_empty() {
        channel.password = password;
        channel.flags |= channel_flags::PASSWORD;
    }
    let channel_id = ctx.state.add_channel(channel);

    // Attach below the requested parent when one was named.
    let mut parent_db_id: i64 = -1;
    if entry.parent_id != NO_PARENT && entry.parent_id != 0 {
        if ctx.state.add_subchannel(entry.parent_id, channel_id) {
            parent_db_id = ctx
                .state
                .channel(entry.parent_id)
                .map(|p| p.db_id as i64)
                .filter(|&id| id != 0)
                .unwrap_or(-1);
        }
    }

    if is_effectively_registered(ctx, channel_id) {
        let snapshot = ctx.state.channel(channel_id).cloned();
        if let Some(snapshot) = snapshot {
            let db_id = ctx
                .db
                .channels()
                .insert(ctx.state.id, &snapshot, parent_db_id)
                .await?;
            if let Some(ch) = ctx.state.channel_mut(channel_id) {
                ch.db_id = db_id;
            }
        }
    }

    info!(channel = channel_id, player = ctx.player_id, "channel created");
    let entry = ctx.state.channel(channel_id).map(|c| c.to_entry());
    if let Some(entry) = entry {
        let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_CREATED);
        template.put_u32_le(ctx.player_id);
        entry.encode_into(&mut template);
        sender::broadcast(ctx.state, &template, None);
    }
    Ok(())
}

/// Delete an empty channel. A populated (or unknown) channel answers with
/// the explicit deletion-failure datagram instead; that and the ack are the
/// only replies this request ever gets.
pub async fn delete(ctx: &mut Ctx<'_>) -> HandlerResult {
    let request_counter = wire::get_u32(ctx.data, header::COUNTER_OFFSET);
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;

    if !allowed(ctx, Privilege::ChaDelete, Some(channel_id)) {
        return Ok(());
    }

    let occupied = match ctx.state.channel(channel_id) {
        Some(ch) => !ch.players.is_empty(),
        None => true,
    };
    if occupied {
        let mut template = header::begin_notify(opcode::NOTIFY_DELETE_CHANNEL_ERROR);
        template.put_u16_le(0x00d1);
        template.put_u32_le(request_counter);
        sender::unicast(ctx.state, ctx.player_id, &template);
        return Ok(());
    }

    let db_id = ctx.state.channel(channel_id).map(|c| c.db_id).unwrap_or(0);
    if is_effectively_registered(ctx, channel_id) && db_id != 0 {
        ctx.db.channels().delete(db_id).await?;
    }

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_DELETED);
    template.put_u32_le(channel_id);
    template.put_u16_le(1);
    sender::broadcast(ctx.state, &template, None);

    ctx.state.destroy_channel(channel_id);
    info!(channel = channel_id, "channel deleted");
    Ok(())
}

pub async fn change_name(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let name = r.zt_string()?;
    if ctx.state.channel(channel_id).is_none()
        || !allowed(ctx, Privilege::ChaChangeName, Some(channel_id))
    {
        return Ok(());
    }
    if let Some(ch) = ctx.state.channel_mut(channel_id) {
        ch.name = name.clone();
    }
    persist(ctx, channel_id).await?;

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_NAME);
    template.put_u32_le(channel_id);
    template.put_u32_le(ctx.player_id);
    put_zt_string(&mut template, &name);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

pub async fn change_topic(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let topic = r.zt_string()?;
    if ctx.state.channel(channel_id).is_none()
        || !allowed(ctx, Privilege::ChaChangeTopic, Some(channel_id))
    {
        return Ok(());
    }
    if let Some(ch) = ctx.state.channel_mut(channel_id) {
        ch.topic = topic.clone();
    }
    persist(ctx, channel_id).await?;

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_TOPIC);
    template.put_u32_le(channel_id);
    template.put_u32_le(ctx.player_id);
    put_zt_string(&mut template, &topic);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

pub async fn change_description(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let description = r.zt_string()?;
    if ctx.state.channel(channel_id).is_none()
        || !allowed(ctx, Privilege::ChaChangeDesc, Some(channel_id))
    {
        return Ok(());
    }
    if let Some(ch) = ctx.state.channel_mut(channel_id) {
        ch.description = description.clone();
    }
    persist(ctx, channel_id).await?;

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_DESC);
    template.put_u32_le(channel_id);
    template.put_u32_le(ctx.player_id);
    put_zt_string(&mut template, &description);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// Flag and codec changes share one request. Every changed flag is gated by
/// its own privilege; a subchannel only ever takes the codec part, and
/// clearing the password flag here is rejected (the dedicated password
/// request owns removal).
pub async fn change_flags_codec(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let new_flags = r.u16()?;
    let new_codec = r.u16()?;

    let Some(channel) = ctx.state.channel(channel_id) else {
        return Ok(());
    };
    let old_codec = channel.codec;
    let old_flags = ctx.state.effective_flags(channel_id);

    if old_flags & channel_flags::PASSWORD != 0 && new_flags & channel_flags::PASSWORD == 0 {
        debug!(channel = channel_id, "password removal via flags rejected");
        return Ok(());
    }

    let mut denied = false;
    if (old_flags ^ new_flags) & channel_flags::UNREGISTERED != 0 {
        if new_flags & channel_flags::UNREGISTERED != 0 {
            denied |= !allowed(ctx, Privilege::ChaCreateUnregistered, None);
        } else {
            denied |= !allowed(ctx, Privilege::ChaCreateRegistered, Some(channel_id));
        }
    }
    if (old_flags ^ new_flags) & channel_flags::DEFAULT != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateDefault, Some(channel_id));
    }
    if (old_flags ^ new_flags) & channel_flags::MODERATED != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateModerated, Some(channel_id));
    }
    if (old_flags ^ new_flags) & channel_flags::SUBCHANNELS != 0 {
        denied |= !allowed(ctx, Privilege::ChaCreateSubchanneled, Some(channel_id));
    }
    if (old_flags ^ new_flags) & channel_flags::PASSWORD != 0 {
        denied |= !allowed(ctx, Privilege::ChaChangePass, Some(channel_id));
    }
    if old_codec != new_codec {
        denied |= !allowed(ctx, Privilege::ChaChangeCodec, Some(channel_id));
    }
    if denied {
        return Ok(());
    }

    let is_root = ctx.state.channel(channel_id).and_then(|c| c.parent).is_none();
    {
        let ch = ctx.state.channel_mut(channel_id).expect("checked above");
        if is_root {
            ch.flags = new_flags;
            // A successful change wipes the stored password text whenever
            // the password flag survives it; only the dedicated password
            // request can set a new one.
            if ch.flags & channel_flags::PASSWORD != 0 {
                ch.password.clear();
            }
        }
        ch.codec = new_codec;
    }

    // Registration transitions drive the store; a steady registered
    // channel just gets its row refreshed.
    if is_root && (old_flags ^ new_flags) & channel_flags::UNREGISTERED != 0 {
        if new_flags & channel_flags::UNREGISTERED != 0 {
            let db_id = ctx.state.channel(channel_id).map(|c| c.db_id).unwrap_or(0);
            if db_id != 0 {
                ctx.db.channels().delete(db_id).await?;
                if let Some(ch) = ctx.state.channel_mut(channel_id) {
                    ch.db_id = 0;
                }
            }
        } else {
            let snapshot = ctx.state.channel(channel_id).cloned();
            if let Some(snapshot) = snapshot {
                let db_id = ctx.db.channels().insert(ctx.state.id, &snapshot, -1).await?;
                if let Some(ch) = ctx.state.channel_mut(channel_id) {
                    ch.db_id = db_id;
                }
            }
        }
    } else {
        persist(ctx, channel_id).await?;
    }

    let (flags, codec) = {
        let ch = ctx.state.channel(channel_id).expect("checked above");
        (ch.flags, ch.codec)
    };
    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_FLAGS_CODEC);
    template.put_u32_le(channel_id);
    template.put_u16_le(flags);
    template.put_u16_le(codec);
    template.put_u32_le(ctx.player_id);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

/// Set or change a channel password. Only root channels carry passwords;
/// an empty password removes it. The flags/codec notification goes out
/// only when the visible flags actually changed.
pub async fn change_password(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let password = r.fixed_string(NAME_SLOT)?;

    let Some(channel) = ctx.state.channel(channel_id) else {
        return Ok(());
    };
    if channel.parent.is_some() || !allowed(ctx, Privilege::ChaChangePass, Some(channel_id)) {
        return Ok(());
    }

    let old_flags = ctx.state.effective_flags(channel_id);
    {
        let ch = ctx.state.channel_mut(channel_id).expect("checked above");
        if password.is_empty() {
            ch.password.clear();
            ch.flags &= !channel_flags::PASSWORD;
        } else {
            ch.password = password;
            ch.flags |= channel_flags::PASSWORD;
        }
    }
    let new_flags = ctx.state.effective_flags(channel_id);
    persist(ctx, channel_id).await?;

    if old_flags != new_flags {
        let codec = ctx.state.channel(channel_id).map(|c| c.codec).unwrap_or(0);
        let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_FLAGS_CODEC);
        template.put_u32_le(channel_id);
        template.put_u16_le(new_flags);
        template.put_u16_le(codec);
        template.put_u32_le(ctx.player_id);
        sender::broadcast(ctx.state, &template, None);
    }
    Ok(())
}

pub async fn change_max_users(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let max_users = r.u16()?;
    if ctx.state.channel(channel_id).is_none()
        || !allowed(ctx, Privilege::ChaChangeMaxUsers, Some(channel_id))
    {
        return Ok(());
    }
    if let Some(ch) = ctx.state.channel_mut(channel_id) {
        ch.max_users = max_users;
    }
    persist(ctx, channel_id).await?;

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_MAX_USERS);
    template.put_u32_le(channel_id);
    template.put_u16_le(max_users);
    template.put_u32_le(ctx.player_id);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}

pub async fn change_order(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let channel_id = r.u32()?;
    let sort_order = r.u16()?;
    if ctx.state.channel(channel_id).is_none()
        || !allowed(ctx, Privilege::ChaChangeOrder, Some(channel_id))
    {
        return Ok(());
    }
    if let Some(ch) = ctx.state.channel_mut(channel_id) {
        ch.sort_order = sort_order;
    }
    persist(ctx, channel_id).await?;

    let mut template = header::begin_notify(opcode::NOTIFY_CHANNEL_ORDER);
    template.put_u32_le(channel_id);
    template.put_u16_le(sort_order);
    template.put_u32_le(ctx.player_id);
    sender::broadcast(ctx.state, &template, None);
    Ok(())
}
