//! Database error types.
//!
//! Provides error handling for the place cache using `thiserror`.

use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Document rejected at the storage boundary.
    #[error("schema violation for '{key}': {reason}")]
    SchemaViolation {
        /// Unique key of the rejected document
        key: String,
        /// Which constraint failed
        reason: String,
    },

    /// Some records of a bulk write failed for reasons other than duplicates.
    ///
    /// Records that succeeded stay committed.
    #[error("{} of bulk write failed ({inserted} inserted, {duplicates} duplicates)", failed_keys.len())]
    PartialBulkFailure {
        /// Records committed
        inserted: usize,
        /// Records skipped because the key already existed
        duplicates: usize,
        /// Keys of records that failed
        failed_keys: Vec<String>,
    },

    /// Failed to decode database value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether this error is a unique-key conflict.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_display() {
        let err = DatabaseError::PartialBulkFailure {
            inserted: 3,
            duplicates: 1,
            failed_keys: vec!["https://a".into(), "https://b".into()],
        };
        assert_eq!(
            err.to_string(),
            "2 of bulk write failed (3 inserted, 1 duplicates)"
        );
        assert!(!err.is_duplicate());
    }
}
