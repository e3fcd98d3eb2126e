//! Text messages: server-wide, per-channel and private.

use super::Ctx;
use crate::error::HandlerResult;
use crate::network::sender;
use crate::state::Privilege;
use bytes::BufMut;
use parley_proto::wire::{put_fixed_string, put_zt_string, Reader, NAME_SLOT};
use parley_proto::{header, opcode};
use tracing::warn;

const TYPE_ALL: u8 = 0;
const TYPE_CHANNEL: u8 = 1;
const TYPE_PLAYER: u8 = 2;

fn allowed(ctx: &Ctx<'_>, privilege: Privilege, channel: Option<u32>) -> bool {
    match ctx.state.player(ctx.player_id) {
        Some(player) => ctx.state.has_privilege(player, privilege, channel),
        None => false,
    }
}

fn message_template(kind: u8, color: u32, sender_name: &str, text: &str) -> Vec<u8> {
    let mut template = header::begin_notify(opcode::NOTIFY_MESSAGE);
    template.put_u32_le(color);
    template.put_u8(kind);
    put_fixed_string(&mut template, sender_name, NAME_SLOT);
    put_zt_string(&mut template, text);
    template
}

/// Route a text message by its type field. The privilege differs per
/// scope; a channel message additionally distinguishes "my channel" from
/// "any channel".
pub fn send(ctx: &mut Ctx<'_>) -> HandlerResult {
    let mut r = Reader::at(ctx.data, 24);
    let color = r.u32()?;
    let kind = r.u8()?;
    let destination = r.u32()?;
    let text = r.zt_string()?;

    let sender_name = match ctx.state.player(ctx.player_id) {
        Some(p) => p.nickname.clone(),
        None => return Ok(()),
    };

    match kind {
        TYPE_ALL => {
            if allowed(ctx, Privilege::OtherTextAll, None) {
                let template = message_template(TYPE_ALL, color, &sender_name, &text);
                sender::broadcast(ctx.state, &template, None);
            }
        }
        TYPE_CHANNEL => {
            if ctx.state.channel(destination).is_none() {
                return Ok(());
            }
            let own_channel = ctx
                .state
                .player(ctx.player_id)
                .is_some_and(|p| p.channel_id == destination);
            let permitted = (own_channel
                && allowed(ctx, Privilege::OtherTextInChannel, Some(destination)))
                || allowed(ctx, Privilege::OtherTextAllChannels, Some(destination));
            if permitted {
                let template = message_template(TYPE_CHANNEL, color, &sender_name, &text);
                sender::broadcast_channel(ctx.state, destination, &template);
            }
        }
        TYPE_PLAYER => {
            let Some(target) = ctx.state.player(destination) else {
                return Ok(());
            };
            let target_channel = target.channel_id;
            if allowed(ctx, Privilege::OtherTextPlayer, Some(target_channel)) {
                let template = message_template(TYPE_PLAYER, color, &sender_name, &text);
                sender::unicast(ctx.state, destination, &template);
            }
        }
        other => {
            warn!(kind = other, "message with unknown type");
        }
    }
    Ok(())
}
