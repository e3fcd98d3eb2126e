//! Channel listing, creation and the delete-non-empty error path.

mod common;

use common::server::SERVER_PASSWORD;
use common::{TestClient, TestServer};
use parley_proto::records::{ChannelEntry, NO_PARENT};
use parley_proto::wire::{self, Reader};
use std::time::Duration;

const DIR_CHANNEL: u8 = 0;

#[tokio::test]
async fn list_reply_contains_the_seeded_channel() {
    let server = TestServer::spawn(18771).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");

    // The listing request is a fixed 120-byte datagram.
    alice
        .send_control_padded(DIR_CHANNEL, 0x05, &[], 120)
        .await
        .expect("send list request");

    let packet = alice
        .expect_notify(0x0006, Duration::from_secs(3))
        .await
        .expect("channel list");
    assert_eq!(wire::get_u32(&packet, 24), 1, "one seeded channel");
    let mut r = Reader::at(&packet, 28);
    let entry = ChannelEntry::decode(&mut r).expect("decode entry");
    assert_eq!(entry.name, "Lobby");
    assert_eq!(entry.codec, 9);
    assert_eq!(entry.parent_id, NO_PARENT);
    // The default flag is bit 16.
    assert_ne!(entry.flags & 16, 0);

    // The player list follows, carrying at least alice herself.
    let players = alice
        .expect_notify(0x0007, Duration::from_secs(3))
        .await
        .expect("player list");
    assert_eq!(wire::get_u32(&players, 24), 1);
    assert_eq!(wire::get_u32(&players, 28), alice.public_id);
}

#[tokio::test]
async fn created_channel_is_broadcast_to_everyone() {
    let server = TestServer::spawn(18772).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");

    let mut body = Vec::new();
    ChannelEntry {
        id: 0,
        flags: 1, // unregistered
        codec: 9,
        parent_id: NO_PARENT,
        sort_order: 5,
        max_users: 8,
        name: "Quiet Corner".into(),
        topic: "hush".into(),
        description: String::new(),
    }
    .encode_into(&mut body);
    // Empty password slot.
    body.push(0);
    body.extend_from_slice(&[0u8; 29]);
    alice
        .send_control(DIR_CHANNEL, 0xc9, &body)
        .await
        .expect("send create");

    // Both clients hear about the new channel; the creator is named.
    let packet = bob
        .expect_notify(0x006e, Duration::from_secs(3))
        .await
        .expect("creation broadcast");
    assert_eq!(wire::get_u32(&packet, 24), alice.public_id);
    let mut r = Reader::at(&packet, 28);
    let entry = ChannelEntry::decode(&mut r).expect("decode entry");
    assert_eq!(entry.name, "Quiet Corner");
    assert_eq!(entry.max_users, 8);
    assert_ne!(entry.id, 0, "server assigned an id");
}

#[tokio::test]
async fn deleting_a_populated_channel_fails_explicitly() {
    let server = TestServer::spawn(18773).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");

    // Channel 1 is the default channel and alice is inside it.
    let body = 1u32.to_le_bytes();
    alice
        .send_control(DIR_CHANNEL, 0xd1, &body)
        .await
        .expect("send delete");

    let packet = alice
        .expect_notify(0xff93, Duration::from_secs(3))
        .await
        .expect("deletion failure");
    assert_eq!(wire::get_u16(&packet, 24), 0x00d1);

    // No deletion broadcast follows and the channel still lists.
    alice
        .send_control_padded(DIR_CHANNEL, 0x05, &[], 120)
        .await
        .expect("send list request");
    let list = alice
        .expect_notify(0x0006, Duration::from_secs(3))
        .await
        .expect("channel list");
    assert_eq!(wire::get_u32(&list, 24), 1);
}

#[tokio::test]
async fn topic_change_is_broadcast_and_carries_the_text() {
    let server = TestServer::spawn(18774).await.expect("spawn server");
    let mut alice = TestClient::connect(server.port, "alice", SERVER_PASSWORD)
        .await
        .expect("alice login");
    let bob = TestClient::connect(server.port, "bob", SERVER_PASSWORD)
        .await
        .expect("bob login");

    let mut body = Vec::new();
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(b"movie night\0");
    alice
        .send_control(DIR_CHANNEL, 0xcf, &body)
        .await
        .expect("send topic change");

    let packet = bob
        .expect_notify(0x0070, Duration::from_secs(3))
        .await
        .expect("topic broadcast");
    assert_eq!(wire::get_u32(&packet, 24), 1);
    assert_eq!(wire::get_u32(&packet, 28), alice.public_id);
    let mut r = Reader::at(&packet, 32);
    assert_eq!(r.zt_string().unwrap(), "movie night");
}
