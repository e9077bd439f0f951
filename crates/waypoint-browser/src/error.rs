use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("browser session closed: {0}")]
    SessionClosed(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("browser command failed: {0}")]
    Command(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("stale element handle: {0}")]
    StaleHandle(u64),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl BrowserError {
    /// A bounded wait expired. Callers treat this as absence of data.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The browser process or its connection is gone; nothing else will work.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChromiumError(_) | Self::SessionClosed(_))
    }
}
