//! Registration table queries.

use super::models::RegistrationRow;
use super::DbError;
use sqlx::AnyPool;
use sqlx::Row;

/// Repository for the `registrations` table.
pub struct RegistrationRepository<'a> {
    pool: &'a AnyPool,
}

impl<'a> RegistrationRepository<'a> {
    pub fn new(pool: &'a AnyPool) -> Self {
        Self { pool }
    }

    /// Load every registration of one server.
    pub async fn load(&self, server_id: u32) -> Result<Vec<RegistrationRow>, DbError> {
        let rows = sqlx::query("SELECT * FROM registrations WHERE server_id = ?")
            .bind(server_id as i64)
            .fetch_all(self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(RegistrationRow {
                    id: row.try_get::<i64, _>("id")? as u32,
                    name: row.try_get("name")?,
                    password_hash: row.try_get("password")?,
                    serveradmin: row.try_get::<i64, _>("serveradmin")? != 0,
                })
            })
            .collect()
    }

    /// Insert a registration and return its new row id. The password must
    /// already be hashed.
    pub async fn insert(
        &self,
        server_id: u32,
        name: &str,
        password_hash: &str,
        serveradmin: bool,
    ) -> Result<u32, DbError> {
        let result = sqlx::query(
            "INSERT INTO registrations (server_id, serveradmin, name, password) VALUES (?, ?, ?, ?)",
        )
        .bind(server_id as i64)
        .bind(serveradmin as i64)
        .bind(name)
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        result
            .last_insert_id()
            .map(|id| id as u32)
            .ok_or(DbError::MissingInsertId)
    }

    /// Delete a registration together with its privilege rows.
    pub async fn delete(&self, db_id: u32) -> Result<(), DbError> {
        sqlx::query("DELETE FROM registrations WHERE id = ?")
            .bind(db_id as i64)
            .execute(self.pool)
            .await?;
        sqlx::query("DELETE FROM player_channel_privileges WHERE player_id = ?")
            .bind(db_id as i64)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
