//! Plain row types read from the store.

/// One `servers` row; only `active = 1` rows are booted.
#[derive(Debug, Clone)]
pub struct ServerRow {
    pub id: u32,
    pub name: String,
    pub password: String,
    pub welcome: String,
    pub port: u16,
    /// Capability mask assembled from the thirteen codec columns.
    pub codec_mask: u16,
}

/// One `channels` row.
#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub id: u32,
    pub name: String,
    pub topic: String,
    pub description: String,
    pub codec: u16,
    pub max_users: u16,
    pub sort_order: u16,
    /// Runtime flag bits (loaded rows are registered by definition, so the
    /// UNREGISTERED bit is always clear here).
    pub flags: u16,
    /// `-1` marks a root channel.
    pub parent_db_id: i64,
}

/// One `registrations` row.
#[derive(Debug, Clone)]
pub struct RegistrationRow {
    pub id: u32,
    pub name: String,
    pub password_hash: String,
    pub serveradmin: bool,
}
