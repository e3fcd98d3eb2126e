//! A minimal protocol client for integration tests.

use parley_proto::connect::{encode_login, LoginRequest, ACCEPT_LEN, ACCEPT_OK};
use parley_proto::{crc, header, wire};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// A logged-in test client.
pub struct TestClient {
    socket: UdpSocket,
    server: SocketAddr,
    pub private_id: u32,
    pub public_id: u32,
    counter: u32,
}

fn login_bytes(nickname: &str, login: &str, password: &str) -> Vec<u8> {
    encode_login(&LoginRequest {
        client: "parley-test".into(),
        machine: "test rig".into(),
        version: [2, 0, 32, 60],
        login: login.into(),
        password: password.into(),
        nickname: nickname.into(),
    })
}

impl TestClient {
    /// Log in anonymously, retrying until the freshly spawned server
    /// answers. Fails when the server refuses or stays silent.
    pub async fn connect(port: u16, nickname: &str, password: &str) -> anyhow::Result<TestClient> {
        Self::connect_with_login(port, nickname, "", password).await
    }

    pub async fn connect_with_login(
        port: u16,
        nickname: &str,
        login: &str,
        password: &str,
    ) -> anyhow::Result<TestClient> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let server: SocketAddr = format!("127.0.0.1:{port}").parse()?;
        let request = login_bytes(nickname, login, password);

        let mut buf = [0u8; 2048];
        for _ in 0..10 {
            socket.send_to(&request, server).await?;
            let Ok(Ok((len, _))) =
                timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await
            else {
                continue;
            };
            if len != ACCEPT_LEN {
                continue;
            }
            let reply = &buf[..len];
            anyhow::ensure!(
                wire::get_u32(reply, 88) == ACCEPT_OK,
                "login refused with code {:#010x}",
                wire::get_u32(reply, 88)
            );
            return Ok(TestClient {
                socket,
                server,
                private_id: wire::get_u32(reply, 4),
                public_id: wire::get_u32(reply, 8),
                counter: 1,
            });
        }
        anyhow::bail!("server did not answer the login")
    }

    /// Send one login and return the raw reply, if any. Used for refusal
    /// and wrong-password scenarios where no session comes up.
    pub async fn login_attempt(
        port: u16,
        nickname: &str,
        password: &str,
        wait: Duration,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let server: SocketAddr = format!("127.0.0.1:{port}").parse()?;
        socket
            .send_to(&login_bytes(nickname, "", password), server)
            .await?;
        let mut buf = [0u8; 2048];
        match timeout(wait, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Ok(Some(buf[..len].to_vec())),
            _ => Ok(None),
        }
    }

    /// Build a control request: 24-byte header, the body, checksum.
    fn control_request(&mut self, direction: u8, code: u8, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(24 + body.len());
        data.extend_from_slice(&header::FAMILY_CONTROL.to_le_bytes());
        data.push(code);
        data.push(direction);
        data.extend_from_slice(&self.private_id.to_le_bytes());
        data.extend_from_slice(&self.public_id.to_le_bytes());
        data.extend_from_slice(&self.counter.to_le_bytes());
        self.counter += 1;
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(body);
        crc::patch(&mut data, crc::CRC_OFFSET_CONTROL);
        data
    }

    pub async fn send_control(
        &mut self,
        direction: u8,
        code: u8,
        body: &[u8],
    ) -> anyhow::Result<()> {
        let data = self.control_request(direction, code, body);
        self.socket.send_to(&data, self.server).await?;
        Ok(())
    }

    /// Pad a control request body out to an exact datagram length.
    pub async fn send_control_padded(
        &mut self,
        direction: u8,
        code: u8,
        body: &[u8],
        total_len: usize,
    ) -> anyhow::Result<()> {
        let mut padded = body.to_vec();
        padded.resize(total_len - 24, 0);
        self.send_control(direction, code, &padded).await
    }

    pub async fn send_raw(&self, data: &[u8]) -> anyhow::Result<()> {
        self.socket.send_to(data, self.server).await?;
        Ok(())
    }

    pub async fn recv_raw(&self, wait: Duration) -> Option<Vec<u8>> {
        let mut buf = [0u8; 2048];
        match timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
            _ => None,
        }
    }

    /// Acknowledge a received control datagram so the server pops it from
    /// the retransmit queue.
    pub async fn ack(&self, packet: &[u8]) -> anyhow::Result<()> {
        let mut ack = Vec::with_capacity(16);
        ack.extend_from_slice(&header::FAMILY_ACK.to_le_bytes());
        ack.extend_from_slice(&wire::get_u16(packet, header::VERSION_OFFSET).to_le_bytes());
        ack.extend_from_slice(&self.private_id.to_le_bytes());
        ack.extend_from_slice(&self.public_id.to_le_bytes());
        ack.extend_from_slice(&wire::get_u32(packet, header::COUNTER_OFFSET).to_le_bytes());
        self.socket.send_to(&ack, self.server).await?;
        Ok(())
    }

    /// Receive until a control notification with the wanted opcode shows
    /// up, acking every control datagram on the way. Acks and unrelated
    /// traffic are skipped.
    pub async fn expect_notify(&self, opcode: u16, wait: Duration) -> Option<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())?
                .max(Duration::from_millis(1));
            let packet = self.recv_raw(remaining).await?;
            if packet.len() < 4 || wire::get_u16(&packet, 0) != header::FAMILY_CONTROL {
                continue;
            }
            let _ = self.ack(&packet).await;
            if wire::get_u16(&packet, 2) == opcode {
                return Some(packet);
            }
        }
    }

    /// Send a keepalive and return the raw reply.
    pub async fn keepalive(&self, ka_id: u32, wait: Duration) -> Option<Vec<u8>> {
        let mut data = Vec::with_capacity(24);
        data.extend_from_slice(&header::FAMILY_CONNECTION.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&self.private_id.to_le_bytes());
        data.extend_from_slice(&self.public_id.to_le_bytes());
        data.extend_from_slice(&ka_id.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        crc::patch(&mut data, crc::CRC_OFFSET_CONNECTION);
        self.socket.send_to(&data, self.server).await.ok()?;
        let mut buf = [0u8; 2048];
        match timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
            _ => None,
        }
    }

    /// Send an audio datagram with the given codec and opaque block.
    pub async fn send_audio(
        &self,
        codec: u8,
        conversation: u16,
        counter: u16,
        block: &[u8],
    ) -> anyhow::Result<()> {
        let mut data = Vec::with_capacity(16 + block.len());
        data.extend_from_slice(&header::FAMILY_AUDIO.to_le_bytes());
        data.push(0);
        data.push(codec);
        data.extend_from_slice(&self.private_id.to_le_bytes());
        data.extend_from_slice(&self.public_id.to_le_bytes());
        data.extend_from_slice(&conversation.to_le_bytes());
        data.extend_from_slice(&counter.to_le_bytes());
        data.extend_from_slice(block);
        self.socket.send_to(&data, self.server).await?;
        Ok(())
    }
}
