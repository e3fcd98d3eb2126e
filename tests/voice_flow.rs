//! Audio fan-out: co-channel delivery, identifier rewriting, muting.

mod common;

use common::server::SERVER_PASSWORD;
use common::{TestClient, TestServer};
use parley_proto::wire;
use std::time::Duration;

const DIR_CLIENT: u8 = 1;

/// SPEEX 12.3: codec id 9, 1 byte offset, 138-byte block.
const CODEC: u8 = 9;
const BLOCK_LEN: usize = 1 + 138;

fn sample_block() -> Vec<u8> {
    (0..BLOCK_LEN).map(|i| (i * 7) as u8).collect()
}

#[tokio::test]
async fn audio_reaches_the_other_listener_verbatim() {
    let server = TestServer::spawn(18781).await.expect("spawn server");
    let alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");
    // Drain the arrival broadcast so the next datagram is the audio.
    alice
        .expect_notify(0x0064, Duration::from_secs(3))
        .await
        .expect("bob arrival");

    let block = sample_block();
    alice
        .send_audio(CODEC, 0x0301, 0x0042, &block)
        .await
        .expect("send audio");

    let packet = bob
        .recv_raw(Duration::from_secs(2))
        .await
        .expect("bob receives audio");
    assert_eq!(packet.len(), 16 + BLOCK_LEN + 6);
    assert_eq!(wire::get_u16(&packet, 0), 0xbef3);
    assert_eq!(packet[3], CODEC);
    // Addressed to bob, attributed to alice.
    assert_eq!(wire::get_u32(&packet, 4), bob.private_id);
    assert_eq!(wire::get_u32(&packet, 8), bob.public_id);
    assert_eq!(wire::get_u32(&packet, 16), alice.public_id);
    // Counters carried over, audio block byte-identical.
    assert_eq!(wire::get_u16(&packet, 14), 0x0042);
    assert_eq!(wire::get_u16(&packet, 20), 0x0301);
    assert_eq!(&packet[22..], &block[..]);
}

#[tokio::test]
async fn sender_does_not_hear_himself() {
    let server = TestServer::spawn(18782).await.expect("spawn server");
    let alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");

    alice
        .send_audio(CODEC, 0, 1, &sample_block())
        .await
        .expect("send audio");
    assert!(
        alice.recv_raw(Duration::from_millis(500)).await.is_none(),
        "the sender must not be a recipient"
    );
}

#[tokio::test]
async fn wrong_codec_is_dropped() {
    let server = TestServer::spawn(18783).await.expect("spawn server");
    let alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");
    alice
        .expect_notify(0x0064, Duration::from_secs(3))
        .await
        .expect("bob arrival");

    // Codec 11 does not match the channel's codec 9; with codec 11's block
    // size so only the codec check can reject it.
    let block: Vec<u8> = vec![0xAB; 1 + 228];
    alice
        .send_audio(11, 0, 1, &block)
        .await
        .expect("send audio");
    assert!(
        bob.recv_raw(Duration::from_millis(500)).await.is_none(),
        "codec mismatch must be dropped"
    );
}

#[tokio::test]
async fn muting_suppresses_the_fan_out() {
    let server = TestServer::spawn(18784).await.expect("spawn server");
    let alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let mut bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");
    alice
        .expect_notify(0x0064, Duration::from_secs(3))
        .await
        .expect("bob arrival");

    // Bob mutes alice and waits for the echo.
    let mut body = Vec::new();
    body.extend_from_slice(&alice.public_id.to_le_bytes());
    body.push(1);
    bob.send_control(DIR_CLIENT, 0x40, &body)
        .await
        .expect("send mute");
    let echo = bob
        .expect_notify(0x0040, Duration::from_secs(3))
        .await
        .expect("mute echo");
    assert_eq!(wire::get_u32(&echo, 24), alice.public_id);
    assert_eq!(echo[28], 1);

    alice
        .send_audio(CODEC, 0, 2, &sample_block())
        .await
        .expect("send audio");
    assert!(
        bob.recv_raw(Duration::from_millis(500)).await.is_none(),
        "muted senders must not reach the listener"
    );
}
