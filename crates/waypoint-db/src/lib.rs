//! Waypoint Database Layer
//!
//! Provides the `SQLite` place cache the scrape pipeline consults before
//! fetching a place and writes to after cleaning.
//! Uses `SQLx` with embedded migrations.
//!
//! # Architecture
//!
//! - **Documents**: each place is stored whole as JSON next to its indexed
//!   scalar columns (`url`, `place_id`, `name`)
//! - **Validation**: documents are checked against the place/review schema
//!   before they are written
//! - **Best-effort writes**: a bulk write commits every record it can;
//!   duplicates are counted, other failures are reported by key
//! - **Forgiving reads**: a failed lookup is a cache miss, never an error
//!
//! # Example
//!
//! ```ignore
//! use waypoint_db::Store;
//!
//! let store = Store::open("places.db").await?;
//! store.run_migrations().await?;
//! let report = store.upsert(&places).await?;
//! let cached = store.lookup("https://www.example.com/Attraction_Review-1").await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod places;
pub mod schema;

// Re-export commonly used types
pub use connection::StorePool;
pub use error::{DatabaseError, Result};
pub use places::{LookupField, UpsertReport};

use std::path::Path;
use waypoint_core::Place;

/// High-level place cache with migrations.
#[derive(Debug, Clone)]
pub struct Store {
    pool: StorePool,
}

impl Store {
    /// Open (or create) the cache at `path`, `:memory:` for an in-memory cache.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open the cache and bring its schema up to date.
    pub async fn open_and_migrate(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::open(path).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Store places not cached yet. See [`places::upsert`].
    pub async fn upsert(&self, places: &[Place]) -> Result<UpsertReport> {
        places::upsert(self.pool.pool(), places).await
    }

    /// Cached place for a listing URL, `None` on miss or error.
    pub async fn lookup(&self, url: &str) -> Option<Place> {
        places::lookup(self.pool.pool(), url).await
    }

    /// First place whose `field` equals `value`, `None` on miss or error.
    pub async fn find_one(&self, field: LookupField, value: &str) -> Option<Place> {
        places::find_one(self.pool.pool(), field, value).await
    }

    /// Number of cached places.
    pub async fn count(&self) -> Result<i64> {
        places::count(self.pool.pool()).await
    }

    /// Every cached place in insertion order.
    pub async fn all(&self) -> Result<Vec<Place>> {
        places::all(self.pool.pool()).await
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
