//! Persistent storage for the registered subset of the model.
//!
//! The store is reached through `sqlx`'s Any driver so the same queries run
//! against a SQLite file or a MySQL server, whichever the configuration
//! names. Only registered entities ever touch the store: unregistered
//! channels and player-scoped privilege records live purely in memory.

mod channels;
mod models;
mod privileges;
mod registrations;
mod servers;

pub use channels::ChannelRepository;
pub use models::{ChannelRow, RegistrationRow, ServerRow};
pub use privileges::PrivilegeRepository;
pub use registrations::RegistrationRepository;
pub use servers::ServerRepository;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("row id missing after insert")]
    MissingInsertId,
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Connect to the configured backend.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect(url)
            .await?;
        info!(url = %redacted(url), "database connected");
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn servers(&self) -> ServerRepository<'_> {
        ServerRepository::new(&self.pool)
    }

    pub fn channels(&self) -> ChannelRepository<'_> {
        ChannelRepository::new(&self.pool)
    }

    pub fn registrations(&self) -> RegistrationRepository<'_> {
        RegistrationRepository::new(&self.pool)
    }

    pub fn privileges(&self) -> PrivilegeRepository<'_> {
        PrivilegeRepository::new(&self.pool)
    }
}

/// Strip the password from a connection URL before logging it.
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &url[scheme + 3..at];
            match creds.find(':') {
                Some(colon) => format!(
                    "{}{}:***{}",
                    &url[..scheme + 3],
                    &creds[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_hides_the_password() {
        assert_eq!(
            redacted("mysql://root:hunter2@db:3306/voice"),
            "mysql://root:***@db:3306/voice"
        );
        assert_eq!(redacted("sqlite:///tmp/x.db"), "sqlite:///tmp/x.db");
    }
}
