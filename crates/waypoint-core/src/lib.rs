//! Waypoint Core - Foundation crate for the waypoint review scraper.
//!
//! This crate provides the shared place/review model, geodesic helpers,
//! the pipeline event stream and configuration management that all other
//! waypoint crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Place, Review and query types
//! - [`geo`] - Great-circle distance and the radius filter
//! - [`events`] - Event sink abstraction between the worker and its caller
//!
//! # Example
//!
//! ```rust
//! use waypoint_core::{geo, Coordinates};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let center = Coordinates::new(27.0410, 88.2663)?;
//! let mall = Coordinates::new(27.0430, 88.2660)?;
//! assert!(geo::within_radius(center, mall, 1_000.0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
#[allow(missing_docs)]
pub mod events;
#[allow(missing_docs)]
pub mod geo;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, ExportConfig, GeocodeConfig, ScrapingConfig, StateConfig,
    StorageConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use events::{ChannelSink, EventSink, FanoutSink, PipelineEvent, TracingSink};
pub use types::{
    Coordinates, ListingEntry, Mode, Month, Place, Review, ReviewMetadata, SearchQuery,
};
