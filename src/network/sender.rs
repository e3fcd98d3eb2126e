//! Notification enqueueing and fan-out.
//!
//! A notification is built once as a template with the per-recipient header
//! fields left zero, then addressed per recipient: private id, public id,
//! the recipient's control counter, a fresh checksum. Delivery happens via
//! the recipient's reliable queue, so the template never hits the socket
//! directly.

use crate::state::{Player, ServerState};
use parley_proto::header;

/// Address a template to one player and enqueue it, consuming one of his
/// control counters.
pub fn enqueue(player: &mut Player, template: &[u8]) {
    let mut data = template.to_vec();
    header::address_notify(
        &mut data,
        player.private_id,
        player.public_id,
        player.counters.f0_s,
    );
    player.counters.f0_s += 1;
    player.queue.push(data);
}

/// Enqueue to every connected player, optionally skipping one (the arriving
/// player does not hear his own arrival).
pub fn broadcast(state: &mut ServerState, template: &[u8], skip: Option<u32>) {
    for player in state.players.values_mut() {
        if Some(player.public_id) == skip {
            continue;
        }
        enqueue(player, template);
    }
}

/// Enqueue to every player inside one channel.
pub fn broadcast_channel(state: &mut ServerState, channel_id: u32, template: &[u8]) {
    let members = match state.channel(channel_id) {
        Some(c) => c.players.clone(),
        None => return,
    };
    for public_id in members {
        if let Some(player) = state.players.get_mut(&public_id) {
            enqueue(player, template);
        }
    }
}

/// Enqueue to a single player by public id.
pub fn unicast(state: &mut ServerState, public_id: u32, template: &[u8]) {
    if let Some(player) = state.players.get_mut(&public_id) {
        enqueue(player, template);
    }
}
