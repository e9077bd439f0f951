//! Database connection management.
//!
//! Provides a `StorePool` wrapper around `SQLx` that opens (or creates) the
//! `SQLite` cache file.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

const MEMORY: &str = ":memory:";

/// Connection pool for the place cache.
#[derive(Debug, Clone)]
pub struct StorePool {
    pool: Pool<Sqlite>,
}

impl StorePool {
    /// Open a connection pool.
    ///
    /// # Arguments
    /// * `path` - Path to the `SQLite` database file (or `:memory:` for in-memory)
    ///
    /// An in-memory database lives in a single connection that is never
    /// recycled, since every new connection would see an empty database.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
        })?;
        let in_memory = path_str == MEMORY;

        let mut connect_options = SqliteConnectOptions::from_str(path_str)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
            .create_if_missing(true);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

        tracing::info!("Database pool created at {}", path_str);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Check that the database answers queries.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = StorePool::new(":memory:").await.expect("create pool");
        pool.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("places.db");

        let pool = StorePool::new(&path).await.expect("create pool");
        pool.ping().await.expect("ping");
        pool.close().await;

        assert!(path.exists());
    }
}
