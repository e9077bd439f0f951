//! Cooperative cancellation for a scrape run.
//!
//! The worker never gets interrupted mid-command. It polls the run's token at
//! named checkpoints between site interactions and unwinds with
//! [`ScanError::Cancelled`] once a stop was requested.

use crate::error::{Result, ScanError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Stop signal shared between a run and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    token: CancellationToken,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. a child of an application-wide one.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request the run to halt at its next checkpoint.
    pub fn stop(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fail with [`ScanError::Cancelled`] if a stop was requested.
    pub fn checkpoint(&self, name: &str) -> Result<()> {
        if self.token.is_cancelled() {
            tracing::debug!(checkpoint = name, "stop observed");
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }
}

/// Latch that lets teardown run exactly once across every exit path.
#[derive(Debug, Default)]
pub struct TeardownGuard {
    done: AtomicBool,
}

impl TeardownGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` for the first caller only.
    pub fn claim(&self) -> bool {
        !self.done.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}
