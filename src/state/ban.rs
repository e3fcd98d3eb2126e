//! Address bans.

use parley_proto::records::BanEntry;

/// A ban on a peer address. `duration_minutes == 0` means permanent; the
/// field is stored and serialized but never consulted for expiry, so every
/// ban lives until it is removed or the server stops. Bans are not
/// persisted across restarts.
#[derive(Debug, Clone)]
pub struct Ban {
    pub id: u32,
    pub duration_minutes: u16,
    pub ip: String,
    pub reason: String,
}

impl Ban {
    pub fn new(duration_minutes: u16, ip: String, reason: String) -> Self {
        Ban {
            id: 0,
            duration_minutes,
            ip,
            reason,
        }
    }

    pub fn to_entry(&self) -> BanEntry {
        BanEntry {
            ip: self.ip.clone(),
            duration_minutes: self.duration_minutes,
            reason: self.reason.clone(),
        }
    }
}
