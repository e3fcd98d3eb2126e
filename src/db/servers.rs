//! Server table queries.

use super::models::ServerRow;
use super::DbError;
use sqlx::AnyPool;
use sqlx::Row;

/// Codec capability columns, in bit order.
const CODEC_COLUMNS: [&str; 13] = [
    "codec_celp51",
    "codec_celp63",
    "codec_gsm148",
    "codec_gsm164",
    "codec_celp52",
    "codec_speex2150",
    "codec_speex3950",
    "codec_speex5950",
    "codec_speex8000",
    "codec_speex11000",
    "codec_speex15000",
    "codec_speex18200",
    "codec_speex24600",
];

/// Repository for the `servers` table.
pub struct ServerRepository<'a> {
    pool: &'a AnyPool,
}

impl<'a> ServerRepository<'a> {
    pub fn new(pool: &'a AnyPool) -> Self {
        Self { pool }
    }

    /// Load every server marked active.
    pub async fn load_active(&self) -> Result<Vec<ServerRow>, DbError> {
        let rows = sqlx::query("SELECT * FROM servers WHERE active = 1")
            .fetch_all(self.pool)
            .await?;

        let mut servers = Vec::with_capacity(rows.len());
        for row in rows {
            let mut codec_mask = 0u16;
            for (bit, column) in CODEC_COLUMNS.iter().enumerate() {
                if row.try_get::<i64, _>(*column).unwrap_or(0) != 0 {
                    codec_mask |= 1 << bit;
                }
            }
            servers.push(ServerRow {
                id: row.try_get::<i64, _>("id")? as u32,
                name: row.try_get("name")?,
                password: row.try_get("password")?,
                welcome: row.try_get("welcome_msg")?,
                port: row.try_get::<i64, _>("port")? as u16,
                codec_mask,
            });
        }
        Ok(servers)
    }
}
