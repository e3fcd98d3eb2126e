//! Login, keepalive and accept datagram layouts.
//!
//! These are the fixed-size connection-family datagrams: the 180-byte login
//! request, the 436-byte accept / refusal reply and the 24-byte keepalive
//! echo. All three carry their checksum at byte offset 16.

use crate::crc::{self, CRC_OFFSET_CONNECTION};
use crate::error::{ProtocolError, Result};
use crate::opcode;
use crate::wire::{self, Reader, NAME_SLOT, WELCOME_SLOT};
use bytes::BufMut;

/// Exact size of a login request.
pub const LOGIN_LEN: usize = 180;
/// Exact size of the accept (and refusal) reply.
pub const ACCEPT_LEN: usize = 436;
/// Exact size of a keepalive reply.
pub const KEEPALIVE_REPLY_LEN: usize = 24;

/// Accept error code: connection accepted.
pub const ACCEPT_OK: u32 = 0x0000_0001;
/// Accept error code: the peer address is banned.
pub const ACCEPT_BANNED: u32 = 0xFFFF_FFFA;

/// Version quadruple the accept reply always advertises.
pub const SERVER_VERSION: [u16; 4] = [2, 0, 20, 1];

/// A decoded 180-byte login request.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub client: String,
    pub machine: String,
    pub version: [u16; 4],
    pub login: String,
    pub password: String,
    pub nickname: String,
}

impl LoginRequest {
    /// Decode a login request. The caller is expected to have verified the
    /// checksum already (the dispatcher does it for the whole family).
    pub fn decode(data: &[u8]) -> Result<LoginRequest> {
        if data.len() != LOGIN_LEN {
            return Err(ProtocolError::BadLength {
                len: data.len(),
                expected: LOGIN_LEN,
            });
        }
        let mut r = Reader::at(data, 20);
        let client = r.fixed_string(NAME_SLOT)?;
        let machine = r.fixed_string(NAME_SLOT)?;
        let version = [r.u16()?, r.u16()?, r.u16()?, r.u16()?];
        r.skip(2)?;
        let login = r.fixed_string(NAME_SLOT)?;
        let password = r.fixed_string(NAME_SLOT)?;
        let nickname = r.fixed_string(NAME_SLOT)?;
        Ok(LoginRequest {
            client,
            machine,
            version,
            login,
            password,
            nickname,
        })
    }

    /// True when the request carries no login name (anonymous mode).
    pub fn is_anonymous(&self) -> bool {
        self.login.is_empty()
    }
}

/// Everything the accept reply serializes about the server.
#[derive(Debug, Clone)]
pub struct AcceptReply<'a> {
    pub server_name: &'a str,
    pub machine: &'a str,
    pub codec_mask: u16,
    /// The 6x9-byte privilege bitfield.
    pub privileges: [u8; 54],
    pub private_id: u32,
    pub public_id: u32,
    pub counter: u32,
    pub welcome: &'a str,
}

impl AcceptReply<'_> {
    /// Encode the 436-byte accept reply with error code [`ACCEPT_OK`].
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ACCEPT_LEN);
        buf.put_u16_le(crate::header::FAMILY_CONNECTION);
        buf.put_u16_le(opcode::CONN_ACCEPT);
        buf.put_u32_le(self.private_id);
        buf.put_u32_le(self.public_id);
        buf.put_u32_le(self.counter);
        buf.put_u32_le(0); // checksum slot
        wire::put_fixed_string(&mut buf, self.server_name, NAME_SLOT);
        wire::put_fixed_string(&mut buf, self.machine, NAME_SLOT);
        for v in SERVER_VERSION {
            buf.put_u16_le(v);
        }
        buf.put_u32_le(ACCEPT_OK);
        buf.put_u16_le(self.codec_mask);
        buf.put_bytes(0, 7);
        // The privilege slot spans 71 bytes; the bitfield fills the first 54.
        buf.put_slice(&self.privileges);
        buf.put_bytes(0, 71 - self.privileges.len());
        buf.put_u32_le(self.private_id);
        buf.put_u32_le(self.public_id);
        wire::put_fixed_string(&mut buf, self.welcome, WELCOME_SLOT);
        debug_assert_eq!(buf.len(), ACCEPT_LEN);
        crc::patch(&mut buf, CRC_OFFSET_CONNECTION);
        buf
    }
}

/// Encode the 436-byte refusal sent to a banned peer. Only the error code
/// and a handful of filler fields are populated.
pub fn encode_refusal() -> Vec<u8> {
    let mut buf = vec![0u8; ACCEPT_LEN];
    wire::patch_u16(&mut buf, 0, crate::header::FAMILY_CONNECTION);
    wire::patch_u16(&mut buf, 2, opcode::CONN_ACCEPT);
    wire::patch_u32(&mut buf, 8, 5);
    wire::patch_u32(&mut buf, 12, 2);
    wire::patch_u32(&mut buf, 88, ACCEPT_BANNED);
    wire::patch_u32(&mut buf, 172, 0x0058_4430);
    wire::patch_u32(&mut buf, 176, 5);
    crc::patch(&mut buf, CRC_OFFSET_CONNECTION);
    buf
}

/// Encode a 24-byte keepalive reply echoing the client's counter.
pub fn encode_keepalive_reply(
    private_id: u32,
    public_id: u32,
    counter: u32,
    echoed: u32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(KEEPALIVE_REPLY_LEN);
    buf.put_u16_le(crate::header::FAMILY_CONNECTION);
    buf.put_u16_le(opcode::CONN_KEEPALIVE_REPLY);
    buf.put_u32_le(private_id);
    buf.put_u32_le(public_id);
    buf.put_u32_le(counter);
    buf.put_u32_le(0); // checksum slot
    buf.put_u32_le(echoed);
    crc::patch(&mut buf, CRC_OFFSET_CONNECTION);
    buf
}

/// Encode a 180-byte login request. The server itself never sends one; this
/// exists for tests and diagnostic tooling.
pub fn encode_login(req: &LoginRequest) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LOGIN_LEN);
    buf.put_u16_le(crate::header::FAMILY_CONNECTION);
    buf.put_u16_le(opcode::CONN_LOGIN);
    buf.put_bytes(0, 12);
    buf.put_u32_le(0); // checksum slot
    wire::put_fixed_string(&mut buf, &req.client, NAME_SLOT);
    wire::put_fixed_string(&mut buf, &req.machine, NAME_SLOT);
    for v in req.version {
        buf.put_u16_le(v);
    }
    buf.put_u16_le(0);
    wire::put_fixed_string(&mut buf, &req.login, NAME_SLOT);
    wire::put_fixed_string(&mut buf, &req.password, NAME_SLOT);
    wire::put_fixed_string(&mut buf, &req.nickname, NAME_SLOT);
    debug_assert_eq!(buf.len(), LOGIN_LEN);
    crc::patch(&mut buf, CRC_OFFSET_CONNECTION);
    buf
}
