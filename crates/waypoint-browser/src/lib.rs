//! Page driver abstraction for the review scraper.
//!
//! The pipeline talks to a [`PageDriver`]: navigation, element lookup,
//! clicks, text and attribute reads, scrolling and bounded waits. The
//! production implementation is [`BrowserEngine`], a headless Chromium
//! session; tests substitute scripted fakes.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{ElementHandle, PageDriver, Scope, WaitCondition};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::Fingerprint;
