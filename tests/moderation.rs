//! Kicks, bans, the ban refusal and the retransmit machinery as seen from
//! the wire.

mod common;

use common::server::SERVER_PASSWORD;
use common::{TestClient, TestServer};
use parley_proto::connect::{ACCEPT_BANNED, ACCEPT_LEN};
use parley_proto::wire::{self, put_fixed_string};
use parley_proto::header;
use std::time::Duration;

const DIR_CLIENT: u8 = 1;

#[tokio::test]
async fn kicked_player_is_announced_with_reason() {
    let server = TestServer::spawn(18791).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");

    let mut body = Vec::new();
    body.extend_from_slice(&bob.public_id.to_le_bytes());
    put_fixed_string(&mut body, "enough", 29);
    body.resize(60 - 24, 0);
    alice
        .send_control(DIR_CLIENT, 0x2d, &body)
        .await
        .expect("send kick");

    let packet = bob
        .expect_notify(0x0065, Duration::from_secs(3))
        .await
        .expect("departure broadcast");
    // The target left (reason 2 = kicked), kicked by alice.
    assert_eq!(wire::get_u32(&packet, 24), bob.public_id);
    assert_eq!(wire::get_u16(&packet, 28), 2);
    assert_eq!(wire::get_u32(&packet, 30), alice.public_id);
    let reason_len = packet[34] as usize;
    assert_eq!(&packet[35..35 + reason_len], b"enough");
}

#[tokio::test]
async fn banned_address_is_refused_on_rejoin() {
    let server = TestServer::spawn(18792).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");

    // Alice bans bob; bob hears his own departure first.
    let mut body = Vec::new();
    body.extend_from_slice(&bob.public_id.to_le_bytes());
    put_fixed_string(&mut body, "persona non grata", 29);
    alice
        .send_control(DIR_CLIENT, 0x45, &body)
        .await
        .expect("send ban");
    bob.expect_notify(0x0065, Duration::from_secs(3))
        .await
        .expect("ban departure");

    // Everything on this rig shares 127.0.0.1, so any rejoin is refused.
    let reply = TestClient::login_attempt(
        server.port,
        "bob",
        SERVER_PASSWORD,
        Duration::from_secs(2),
    )
    .await
    .expect("attempt")
    .expect("refusal sent");
    assert_eq!(reply.len(), ACCEPT_LEN);
    assert_eq!(wire::get_u32(&reply, 88), ACCEPT_BANNED);
}

#[tokio::test]
async fn ban_list_reports_the_stored_ban() {
    let server = TestServer::spawn(18793).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");

    // A raw address ban, then the list.
    let mut body = Vec::new();
    body.extend_from_slice(&30u16.to_le_bytes());
    body.extend_from_slice(b"10.9.8.7\0");
    alice
        .send_control(DIR_CLIENT, 0x44, &body)
        .await
        .expect("send ip ban");

    alice
        .send_control(DIR_CLIENT, 0x9a, &[])
        .await
        .expect("request ban list");
    let packet = alice
        .expect_notify(0x019b, Duration::from_secs(3))
        .await
        .expect("ban list");
    assert_eq!(wire::get_u32(&packet, 24), 1);
    assert_eq!(&packet[28..37], b"10.9.8.7\0");
    assert_eq!(wire::get_u16(&packet, 37), 30);
}

#[tokio::test]
async fn unacked_notifications_are_retransmitted_with_higher_versions() {
    let server = TestServer::spawn(18794).await.expect("spawn server");
    let alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let _bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");

    // Alice refuses to ack bob's arrival; the same datagram must come
    // again with a strictly higher version counter.
    let first = alice
        .recv_raw(Duration::from_secs(2))
        .await
        .expect("first transmission");
    assert_eq!(wire::get_u16(&first, 2), 0x0064);
    let first_version = wire::get_u16(&first, header::VERSION_OFFSET);
    let first_counter = wire::get_u32(&first, header::COUNTER_OFFSET);

    let second = alice
        .recv_raw(Duration::from_secs(2))
        .await
        .expect("retransmission");
    assert_eq!(wire::get_u32(&second, header::COUNTER_OFFSET), first_counter);
    assert!(wire::get_u16(&second, header::VERSION_OFFSET) > first_version);

    // Acking stops the flow.
    alice.ack(&second).await.expect("ack");
    tokio::time::sleep(Duration::from_millis(600)).await;
    let mut quiet = true;
    while let Some(packet) = alice.recv_raw(Duration::from_millis(600)).await {
        // Drain anything sent before the ack landed; a fresh counter
        // would mean the queue kept going.
        if wire::get_u32(&packet, header::COUNTER_OFFSET) != first_counter {
            quiet = false;
            break;
        }
    }
    assert!(quiet, "acked datagram must leave the queue");
}
