//! Persistent player registrations.

use sha2::{Digest, Sha256};

/// A stored login. The password is kept as the lowercase hex digest of
/// SHA-256 over the plaintext.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Row id in the store; always non-zero for loaded registrations.
    pub db_id: u32,
    pub name: String,
    pub password_hash: String,
    /// Global flags granted on login (serveradmin only in practice).
    pub global_flags: u16,
}

impl Registration {
    /// Hash a plaintext password the way the store expects it.
    pub fn hash_password(plaintext: &str) -> String {
        let digest = Sha256::digest(plaintext.as_bytes());
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }

    pub fn password_matches(&self, plaintext: &str) -> bool {
        self.password_hash == Self::hash_password(plaintext)
    }
}
