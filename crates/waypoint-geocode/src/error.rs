//! Error types for the geocoding subsystem.

use thiserror::Error;

/// Errors that can occur while geocoding or persisting usage.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// No API key configured
    #[error("no geocoding API key configured")]
    MissingApiKey,

    /// Endpoint answered with a non-success HTTP status
    #[error("API error: status {status}, {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response body was not the expected shape
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local state file could not be read or written
    #[error("state file error: {0}")]
    StateFile(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for geocoding operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeocodeError::ApiError {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "API error: status 403, Forbidden");
        assert_eq!(
            GeocodeError::MissingApiKey.to_string(),
            "no geocoding API key configured"
        );
    }
}
