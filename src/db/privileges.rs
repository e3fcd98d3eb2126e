//! Privilege tables.
//!
//! `server_privileges` maps a `user_group` name onto one boolean column per
//! privilege; `player_channel_privileges` ties a registration to a channel
//! with five flag columns. The `player_id` column holds the registration's
//! row id, a name kept from the historical schema.

use super::DbError;
use crate::state::{channel_privs, PrivilegeMatrix, UserGroup, PRIVILEGE_COLUMNS};
use sqlx::AnyPool;
use sqlx::Row;
use tracing::warn;

/// Repository for both privilege tables.
pub struct PrivilegeRepository<'a> {
    pool: &'a AnyPool,
}

impl<'a> PrivilegeRepository<'a> {
    pub fn new(pool: &'a AnyPool) -> Self {
        Self { pool }
    }

    /// Load the 6-group privilege matrix of one server. Unknown group names
    /// are logged and skipped.
    pub async fn load_matrix(&self, server_id: u32) -> Result<PrivilegeMatrix, DbError> {
        let rows = sqlx::query("SELECT * FROM server_privileges WHERE server_id = ?")
            .bind(server_id as i64)
            .fetch_all(self.pool)
            .await?;

        let mut matrix = PrivilegeMatrix::new();
        for row in rows {
            let group_name: String = row.try_get("user_group")?;
            let Some(group) = UserGroup::from_column_value(&group_name) else {
                warn!(group = %group_name, "unknown user_group in server_privileges");
                continue;
            };
            for (privilege, column) in PRIVILEGE_COLUMNS {
                if row.try_get::<i64, _>(*column).unwrap_or(0) != 0 {
                    matrix.set(group, *privilege, true);
                }
            }
        }
        Ok(matrix)
    }

    /// Load the privilege records of one registered channel as
    /// `(registration row id, flag bits)` pairs.
    pub async fn load_channel_records(
        &self,
        channel_db_id: u32,
    ) -> Result<Vec<(u32, u16)>, DbError> {
        let rows = sqlx::query("SELECT * FROM player_channel_privileges WHERE channel_id = ?")
            .bind(channel_db_id as i64)
            .fetch_all(self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let mut flags = 0u16;
                if row.try_get::<i64, _>("channel_admin")? != 0 {
                    flags |= channel_privs::CHANADMIN;
                }
                if row.try_get::<i64, _>("operator")? != 0 {
                    flags |= channel_privs::OP;
                }
                if row.try_get::<i64, _>("voice")? != 0 {
                    flags |= channel_privs::VOICE;
                }
                if row.try_get::<i64, _>("auto_operator")? != 0 {
                    flags |= channel_privs::AUTOOP;
                }
                if row.try_get::<i64, _>("auto_voice")? != 0 {
                    flags |= channel_privs::AUTOVOICE;
                }
                Ok((row.try_get::<i64, _>("player_id")? as u32, flags))
            })
            .collect()
    }

    /// Write a registration's flags for one channel, inserting the row when
    /// the update matches nothing.
    pub async fn upsert_record(
        &self,
        registration_db_id: u32,
        channel_db_id: u32,
        flags: u16,
    ) -> Result<(), DbError> {
        let updated = sqlx::query(
            r#"
            UPDATE player_channel_privileges
            SET channel_admin = ?, operator = ?, voice = ?, auto_operator = ?, auto_voice = ?
            WHERE player_id = ? AND channel_id = ?
            "#,
        )
        .bind((flags & channel_privs::CHANADMIN != 0) as i64)
        .bind((flags & channel_privs::OP != 0) as i64)
        .bind((flags & channel_privs::VOICE != 0) as i64)
        .bind((flags & channel_privs::AUTOOP != 0) as i64)
        .bind((flags & channel_privs::AUTOVOICE != 0) as i64)
        .bind(registration_db_id as i64)
        .bind(channel_db_id as i64)
        .execute(self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                r#"
                INSERT INTO player_channel_privileges
                    (player_id, channel_id, channel_admin, operator, voice, auto_operator, auto_voice)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(registration_db_id as i64)
            .bind(channel_db_id as i64)
            .bind((flags & channel_privs::CHANADMIN != 0) as i64)
            .bind((flags & channel_privs::OP != 0) as i64)
            .bind((flags & channel_privs::VOICE != 0) as i64)
            .bind((flags & channel_privs::AUTOOP != 0) as i64)
            .bind((flags & channel_privs::AUTOVOICE != 0) as i64)
            .execute(self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn delete_record(
        &self,
        registration_db_id: u32,
        channel_db_id: u32,
    ) -> Result<(), DbError> {
        sqlx::query("DELETE FROM player_channel_privileges WHERE player_id = ? AND channel_id = ?")
            .bind(registration_db_id as i64)
            .bind(channel_db_id as i64)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
