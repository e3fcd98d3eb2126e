//! Login and keepalive handling (the connection family).

use crate::handlers::session;
use crate::runtime::Server;
use crate::state::{global_flags, Direction, Player};
use parley_proto::connect::{
    encode_keepalive_reply, encode_refusal, AcceptReply, LoginRequest,
};
use parley_proto::crc::{self, CRC_OFFSET_CONNECTION};
use parley_proto::{opcode, wire};
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Dispatch a connection-family datagram by its subtype.
pub async fn handle(server: &Server, data: &[u8], addr: SocketAddr) {
    if data.len() < 4 || !crc::check(data, CRC_OFFSET_CONNECTION) {
        debug!(peer = %addr, "connection datagram with bad checksum");
        return;
    }
    match wire::get_u16(data, 2) {
        opcode::CONN_LOGIN => login(server, data, addr).await,
        opcode::CONN_KEEPALIVE => keepalive(server, data, addr).await,
        other => {
            warn!(subtype = format_args!("{other:#06x}"), "unknown connection subtype");
        }
    }
}

/// A connection attempt: ban check, credential check, player creation,
/// accept reply, arrival broadcast. Refused credentials answer nothing
/// (the peer sees a timeout); a banned address gets the explicit refusal.
async fn login(server: &Server, data: &[u8], addr: SocketAddr) {
    let mut state = server.state.lock().await;

    if state.ban_by_ip(addr.ip()).is_some() {
        info!(peer = %addr, "banned peer tried to connect");
        let refusal = encode_refusal();
        state.stats.add_packet(refusal.len(), Direction::Out);
        if let Err(e) = server.socket.send_to(&refusal, addr).await {
            warn!(error = %e, "sending refusal failed");
        }
        return;
    }

    let request = match LoginRequest::decode(data) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e.error_code(), peer = %addr, "login rejected");
            return;
        }
    };

    let mut player = Player::from_login(&request, addr);
    if request.is_anonymous() {
        if request.password != state.password {
            debug!(peer = %addr, "wrong server password");
            return;
        }
    } else {
        let Some(registration) =
            state.registration_by_credentials(&request.login, &request.password)
        else {
            info!(peer = %addr, login = %request.login, "invalid credentials");
            return;
        };
        player.registration = Some(registration.db_id);
        player.global_flags |= registration.global_flags | global_flags::REGISTERED;
    }

    let public_id = state.add_player(player);
    info!(
        player = public_id,
        peer = %addr,
        nickname = %state.player(public_id).map(|p| p.nickname.as_str()).unwrap_or(""),
        "player connected"
    );

    // The accept reply goes out directly: its layout has no version slot
    // for the retransmit machinery to count in.
    let accept = {
        let player = state.player_mut(public_id).expect("just inserted");
        let counter = player.counters.f4_s;
        player.counters.f4_s += 1;
        (player.private_id, player.public_id, counter)
    };
    let reply = AcceptReply {
        server_name: &state.name,
        machine: &state.machine,
        codec_mask: state.codec_mask,
        privileges: state.privileges.to_bitfield(),
        private_id: accept.0,
        public_id: accept.1,
        counter: accept.2,
        welcome: &state.welcome,
    }
    .encode();
    state.stats.add_packet(reply.len(), Direction::Out);
    if let Err(e) = server.socket.send_to(&reply, addr).await {
        warn!(error = %e, "sending accept failed");
    }

    session::notify_new_player(&mut state, public_id);
}

/// Echo a keepalive back, consuming one connection counter.
async fn keepalive(server: &Server, data: &[u8], addr: SocketAddr) {
    if data.len() < 16 {
        return;
    }
    let private_id = wire::get_u32(data, 4);
    let public_id = wire::get_u32(data, 8);
    let echoed = wire::get_u32(data, 12);

    let mut state = server.state.lock().await;
    let Some(player) = state
        .players
        .get_mut(&public_id)
        .filter(|p| p.private_id == private_id)
    else {
        debug!(peer = %addr, "keepalive from unknown player");
        return;
    };
    let counter = player.counters.f4_s;
    player.counters.f4_s += 1;
    let reply = encode_keepalive_reply(private_id, public_id, counter, echoed);
    let peer = player.addr;
    state.stats.add_packet(reply.len(), Direction::Out);
    if let Err(e) = server.socket.send_to(&reply, peer).await {
        warn!(error = %e, "sending keepalive reply failed");
    }
}
