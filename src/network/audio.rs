//! The audio fast path.
//!
//! Audio datagrams bypass the reliable queue entirely: validate, rewrite
//! the header once, patch the recipient ids per listener and send. Loss is
//! acceptable by design.

use crate::runtime::Server;
use parley_proto::audio::{self, AudioHeader};
use tracing::{debug, warn};

/// Route one inbound audio datagram to the sender's co-channel listeners.
pub async fn handle(server: &Server, data: &[u8]) {
    let header = match AudioHeader::decode(data) {
        Ok(header) => header,
        Err(e) => {
            debug!(error = %e.error_code(), "audio datagram rejected");
            return;
        }
    };

    let mut state = server.state.lock().await;
    let Some(sender) = state.player_by_ids(header.public_id, header.private_id) else {
        warn!(
            public = header.public_id,
            "audio from unmatched id pair"
        );
        return;
    };
    let sender_id = sender.public_id;
    let channel_id = sender.channel_id;

    let channel_codec = state.channel(channel_id).map(|c| c.codec).unwrap_or(0);
    if channel_codec != header.codec as u16 {
        warn!(
            sent = header.codec as u16,
            expected = channel_codec,
            "audio codec does not match the channel"
        );
        return;
    }
    if let Err(e) = header.check_len(data.len()) {
        warn!(error = %e, "audio datagram has the wrong size");
        return;
    }

    let mut forward = audio::build_forward(data, &header, sender_id);
    let recipients: Vec<(u32, u32, std::net::SocketAddr)> = state
        .channel(channel_id)
        .map(|c| c.players.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter(|&&id| id != sender_id)
        .filter_map(|&id| state.player(id))
        .filter(|p| !p.muted.contains(&sender_id))
        .map(|p| (p.private_id, p.public_id, p.addr))
        .collect();
    drop(state);

    for (private_id, public_id, addr) in recipients {
        audio::address_forward(&mut forward, private_id, public_id);
        if let Err(e) = server.socket.send_to(&forward, addr).await {
            warn!(error = %e, "audio send failed");
        }
    }
}
