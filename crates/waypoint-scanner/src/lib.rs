//! Waypoint Scanner - crawl-and-extract pipeline for travel review listings.
//!
//! This crate drives a [`PageDriver`](waypoint_browser::PageDriver) through the
//! review site: search, listing pagination, per place a cache check or a
//! review scrape with geocoding, then cleaning, persistence and CSV export.
//!
//! # Features
//!
//! - Two page layouts handled by one pagination loop and a pluggable
//!   [`ReviewExtractor`]
//! - Cooperative cancellation at named checkpoints, with teardown that runs
//!   exactly once on every exit path
//! - Bounded waits everywhere; secondary timeouts end pagination instead of
//!   failing the run
//! - Progress, usage and error notifications through an injected event sink
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waypoint_scanner::ScrapeOrchestrator;
//!
//! let orchestrator = Arc::new(
//!     ScrapeOrchestrator::new(driver, store, geocoder, events, config.scraping)
//!         .with_csv_path("reviews.csv")
//!         .with_state_path(state_path),
//! );
//!
//! let handle = orchestrator.spawn(query);
//! let outcome = handle.wait().await;
//! println!("{} places", outcome.places.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod cancel;
pub mod error;
#[allow(missing_docs)]
pub mod export;
pub mod extractor;
#[allow(missing_docs)]
pub mod filter;
#[allow(missing_docs)]
pub mod listing;
pub mod orchestrator;
pub mod parser;
#[allow(missing_docs)]
pub mod selectors;

// Re-export commonly used types
pub use cancel::{RunControl, TeardownGuard};
pub use error::{Result, ScanError};
pub use export::{write_csv, write_rows, ExportRow};
pub use extractor::{detect_layout, PlaceExtractor, ReviewCrawl, ReviewExtractor, TodoExtractor};
pub use filter::{clean_places, PlaceSource, ScrapedPlace};
pub use listing::ListingCrawl;
pub use orchestrator::{ScrapeHandle, ScrapeOrchestrator, ScrapeOutcome};
pub use selectors::Selectors;
