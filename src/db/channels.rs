//! Channel table queries.
//!
//! The `parent_id` column stores the parent's row id, with `-1` marking a
//! root channel (stored in the signed representation).

use super::models::ChannelRow;
use super::DbError;
use crate::state::{channel_flags, Channel};
use sqlx::AnyPool;
use sqlx::Row;

/// Repository for the `channels` table.
pub struct ChannelRepository<'a> {
    pool: &'a AnyPool,
}

impl<'a> ChannelRepository<'a> {
    pub fn new(pool: &'a AnyPool) -> Self {
        Self { pool }
    }

    fn row_to_channel(row: &sqlx::any::AnyRow) -> Result<ChannelRow, DbError> {
        let mut flags = 0u16;
        if row.try_get::<i64, _>("flag_moderated")? != 0 {
            flags |= channel_flags::MODERATED;
        }
        if row.try_get::<i64, _>("flag_hierarchical")? != 0 {
            flags |= channel_flags::SUBCHANNELS;
        }
        if row.try_get::<i64, _>("flag_default")? != 0 {
            flags |= channel_flags::DEFAULT;
        }
        let password: String = row.try_get("password")?;
        if !password.is_empty() {
            flags |= channel_flags::PASSWORD;
        }
        Ok(ChannelRow {
            id: row.try_get::<i64, _>("id")? as u32,
            name: row.try_get("name")?,
            topic: row.try_get("topic")?,
            description: row.try_get("description")?,
            codec: row.try_get::<i64, _>("codec")? as u16,
            max_users: row.try_get::<i64, _>("maxusers")? as u16,
            sort_order: row.try_get::<i64, _>("ordr")? as u16,
            flags,
            parent_db_id: row.try_get("parent_id")?,
        })
    }

    /// Root channels of one server.
    pub async fn load_roots(&self, server_id: u32) -> Result<Vec<ChannelRow>, DbError> {
        let rows = sqlx::query("SELECT * FROM channels WHERE server_id = ? AND parent_id = -1")
            .bind(server_id as i64)
            .fetch_all(self.pool)
            .await?;
        rows.iter().map(Self::row_to_channel).collect()
    }

    /// Subchannels of one server, resolved against roots by the caller.
    pub async fn load_subchannels(&self, server_id: u32) -> Result<Vec<ChannelRow>, DbError> {
        let rows = sqlx::query("SELECT * FROM channels WHERE server_id = ? AND parent_id != -1")
            .bind(server_id as i64)
            .fetch_all(self.pool)
            .await?;
        rows.iter().map(Self::row_to_channel).collect()
    }

    /// Insert a channel and return its new row id.
    pub async fn insert(
        &self,
        server_id: u32,
        channel: &Channel,
        parent_db_id: i64,
    ) -> Result<u32, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO channels
                (server_id, name, topic, description,
                 codec, maxusers, ordr,
                 flag_default, flag_hierarchical, flag_moderated,
                 parent_id, password)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(server_id as i64)
        .bind(&channel.name)
        .bind(&channel.topic)
        .bind(&channel.description)
        .bind(channel.codec as i64)
        .bind(channel.max_users as i64)
        .bind(channel.sort_order as i64)
        .bind((channel.flags & channel_flags::DEFAULT != 0) as i64)
        .bind((channel.flags & channel_flags::SUBCHANNELS != 0) as i64)
        .bind((channel.flags & channel_flags::MODERATED != 0) as i64)
        .bind(parent_db_id)
        .bind(&channel.password)
        .execute(self.pool)
        .await?;
        result
            .last_insert_id()
            .map(|id| id as u32)
            .ok_or(DbError::MissingInsertId)
    }

    /// Update every mutable column of a registered channel.
    pub async fn update(&self, channel: &Channel) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE channels
            SET name = ?, topic = ?, description = ?,
                codec = ?, maxusers = ?, ordr = ?,
                flag_default = ?, flag_hierarchical = ?, flag_moderated = ?,
                password = ?
            WHERE id = ?
            "#,
        )
        .bind(&channel.name)
        .bind(&channel.topic)
        .bind(&channel.description)
        .bind(channel.codec as i64)
        .bind(channel.max_users as i64)
        .bind(channel.sort_order as i64)
        .bind((channel.flags & channel_flags::DEFAULT != 0) as i64)
        .bind((channel.flags & channel_flags::SUBCHANNELS != 0) as i64)
        .bind((channel.flags & channel_flags::MODERATED != 0) as i64)
        .bind(&channel.password)
        .bind(channel.db_id as i64)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete a channel row together with its privilege rows.
    pub async fn delete(&self, db_id: u32) -> Result<(), DbError> {
        sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(db_id as i64)
            .execute(self.pool)
            .await?;
        sqlx::query("DELETE FROM player_channel_privileges WHERE channel_id = ?")
            .bind(db_id as i64)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
