//! The receive loop and the per-family dispatch.
//!
//! One datagram at a time: classify the family, validate, resolve the
//! player, run the matching handler synchronously. Malformed datagrams of
//! any kind are logged and dropped without a reply; misbehaving peers must
//! not be able to elicit responses.

use crate::handlers::{self, Ctx};
use crate::network::{audio, connection};
use crate::runtime::Server;
use crate::state::Direction;
use parley_proto::header::{Ack, ControlHeader, Family};
use parley_proto::wire;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Largest datagram the protocol ever carries (the accept reply is 436
/// bytes; audio tops out around 330).
const RECV_BUFFER: usize = 1024;

/// Receive loop; runs until shutdown.
pub async fn run(server: Arc<Server>) {
    let mut shutdown = server.shutdown_rx();
    let mut buf = [0u8; RECV_BUFFER];
    loop {
        tokio::select! {
            result = server.socket.recv_from(&mut buf) => match result {
                Ok((len, addr)) => {
                    trace!(len, peer = %addr, "datagram received");
                    handle_datagram(&server, &buf[..len], addr).await;
                }
                Err(e) => {
                    error!(error = %e, "recv failed");
                    // Avoid a busy loop on a persistent socket error.
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            },
            _ = shutdown.recv() => break,
        }
    }
    debug!("receive loop stopped");
}

async fn handle_datagram(server: &Server, data: &[u8], addr: SocketAddr) {
    let family = match Family::of(data) {
        Ok(family) => family,
        Err(e) => {
            debug!(error = %e, peer = %addr, "dropping datagram");
            return;
        }
    };

    // Traffic accounting, server-wide and per sender when he is known.
    {
        let mut state = server.state.lock().await;
        state.stats.add_packet(data.len(), Direction::In);
        if data.len() >= 12 {
            let private_id = wire::get_u32(data, 4);
            let public_id = wire::get_u32(data, 8);
            if let Some(player) = state
                .players
                .get_mut(&public_id)
                .filter(|p| p.private_id == private_id)
            {
                player.stats.packets_sent += 1;
                player.stats.bytes_sent += data.len() as u32;
                player.stats.touch();
            }
        }
    }

    match family {
        Family::Control => handle_control(server, data).await,
        Family::Ack => handle_ack(server, data).await,
        Family::Audio => audio::handle(server, data).await,
        Family::Connection => connection::handle(server, data, addr).await,
    }
}

async fn handle_control(server: &Server, data: &[u8]) {
    let header = match ControlHeader::decode(data) {
        Ok(header) => header,
        Err(e) => {
            debug!(error = %e.error_code(), "control datagram rejected");
            return;
        }
    };
    let Some(operation) = handlers::lookup(header.direction, header.code) else {
        warn!(
            direction = header.direction,
            code = format_args!("{:#04x}", header.code),
            "unknown operation code"
        );
        return;
    };
    if data.len() < operation.min_len {
        warn!(
            operation = operation.name,
            len = data.len(),
            min = operation.min_len,
            "control datagram below operation minimum"
        );
        return;
    }

    let mut state = server.state.lock().await;
    // An unmatched id pair is dropped silently.
    let Some(player) = state.player_by_ids(header.public_id, header.private_id) else {
        debug!(operation = operation.name, "no player matches the id pair");
        return;
    };
    let player_id = player.public_id;

    // Acknowledge before anything else; a denied request still acks.
    let (ack, peer) = {
        let player = state.player_mut(player_id).expect("looked up above");
        let ack = Ack::encode(player.private_id, player.public_id, player.counters.f1_s);
        player.counters.f1_s += 1;
        (ack, player.addr)
    };
    state.stats.add_packet(ack.len(), Direction::Out);
    if let Err(e) = server.socket.send_to(&ack, peer).await {
        warn!(error = %e, "sending ack failed");
    }

    let mut ctx = Ctx {
        state: &mut state,
        db: &server.db,
        data,
        player_id,
    };
    if let Err(e) = handlers::dispatch(&mut ctx, header.direction, header.code).await {
        debug!(
            operation = operation.name,
            error = e.error_code(),
            "handler rejected request"
        );
    }
}

/// Acknowledgements pop the head of the retransmit queue. Leaving players
/// still count: their final datagrams are acked like any other.
async fn handle_ack(server: &Server, data: &[u8]) {
    let ack = match Ack::decode(data) {
        Ok(ack) => ack,
        Err(e) => {
            debug!(error = %e.error_code(), "ack rejected");
            return;
        }
    };
    let mut state = server.state.lock().await;
    let popped = if let Some(player) = state
        .players
        .get_mut(&ack.public_id)
        .filter(|p| p.private_id == ack.private_id)
    {
        player.queue.acknowledge(ack.counter, ack.version)
    } else if let Some(player) = state.leaving_player_by_ids_mut(ack.public_id, ack.private_id) {
        player.queue.acknowledge(ack.counter, ack.version)
    } else {
        return;
    };
    trace!(
        player = ack.public_id,
        counter = ack.counter,
        version = ack.version,
        popped,
        "ack processed"
    );
}
