use thiserror::Error;
use waypoint_browser::BrowserError;

/// Failures that end a scrape run or one of its stages.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A stop was requested
    #[error("run cancelled")]
    Cancelled,

    /// The search produced no listing to crawl
    #[error("listing unavailable: {0}")]
    ListingUnavailable(String),

    /// Browser command failure
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Place cache failure
    #[error("Database error: {0}")]
    Database(#[from] waypoint_db::DatabaseError),

    /// Export serialization failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Export file failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// The browser session is gone; the run cannot continue.
    #[must_use]
    pub fn is_fatal_transport(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_fatal())
    }
}

/// Demote a recoverable browser failure to `None`.
///
/// Missing elements, timeouts and stale handles are part of normal scraping;
/// only a dead session is propagated.
pub(crate) fn soft<T>(result: waypoint_browser::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(ScanError::Browser(e)),
        Err(e) => {
            tracing::trace!("ignoring browser failure: {}", e);
            Ok(None)
        }
    }
}

/// Result alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScanError::from(BrowserError::SessionClosed("gone".into())).is_fatal_transport());
        assert!(!ScanError::from(BrowserError::Timeout("cards".into())).is_fatal_transport());
        assert!(!ScanError::Cancelled.is_fatal_transport());
    }

    #[test]
    fn test_soft_keeps_only_fatal_errors() {
        let missing: waypoint_browser::Result<u32> =
            Err(BrowserError::SelectorNotFound(".title".into()));
        assert!(matches!(soft(missing), Ok(None)));

        let gone: waypoint_browser::Result<u32> = Err(BrowserError::SessionClosed("ws".into()));
        assert!(soft(gone).is_err());

        assert!(matches!(soft(Ok(7)), Ok(Some(7))));
    }
}
