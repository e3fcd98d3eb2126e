//! The retransmit task.
//!
//! Wakes every 50 ms and walks the live and leaving player tables. Head
//! entries quiet for half a second go out again with a bumped version
//! counter; a head past the give-up threshold evicts its player. Leaving
//! players drain their queue the same way and are destroyed once empty.

use crate::handlers::session;
use crate::runtime::Server;
use crate::state::Direction;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the queues are scanned.
const TICK: Duration = Duration::from_millis(50);

/// Retransmit loop; runs until shutdown.
pub async fn run(server: Arc<Server>) {
    let mut shutdown = server.shutdown_rx();
    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => pass(&server).await,
            _ = shutdown.recv() => break,
        }
    }
    debug!("retransmit loop stopped");
}

/// One scan over all queues. Socket writes happen after the state lock is
/// released.
async fn pass(server: &Server) {
    let mut outgoing: Vec<(Vec<u8>, SocketAddr)> = Vec::new();
    {
        let mut state = server.state.lock().await;
        let now = Instant::now();

        // Live players whose head ran out of retries have timed out:
        // broadcast the departure and move them to the leaving set.
        let timed_out: Vec<u32> = state
            .players
            .values()
            .filter(|p| p.queue.head_timed_out())
            .map(|p| p.public_id)
            .collect();
        for public_id in timed_out {
            info!(player = public_id, "player timed out, evicting");
            session::notify_player_left(&mut state, public_id);
            state.remove_player(public_id);
        }

        for player in state.players.values_mut() {
            if let Some(bytes) = player.queue.take_due(now) {
                outgoing.push((bytes, player.addr));
            }
        }

        // Leaving players: a timed-out head discards the whole queue, an
        // empty queue releases the player for good.
        let mut drained = Vec::new();
        for player in state.leaving.values_mut() {
            if player.queue.head_timed_out() {
                debug!(player = player.public_id, "discarding a leaving player's queue");
                player.queue.clear();
            } else if let Some(bytes) = player.queue.take_due(now) {
                outgoing.push((bytes, player.addr));
            }
            if player.queue.is_empty() {
                drained.push(player.public_id);
            }
        }
        for public_id in drained {
            debug!(player = public_id, "leaving player destroyed");
            state.leaving.remove(&public_id);
        }

        for (bytes, _) in &outgoing {
            state.stats.add_packet(bytes.len(), Direction::Out);
        }
    }

    for (bytes, addr) in outgoing {
        if let Err(e) = server.socket.send_to(&bytes, addr).await {
            // The entry stays queued; the next pass retries.
            warn!(error = %e, peer = %addr, "retransmit send failed");
        }
    }
}
