//! Waypoint Geocode - place name to coordinates, with a monthly budget.
//!
//! Scraped places carry a name but no location. This crate resolves the name
//! through a find-place-from-text endpoint, biased toward the search circle,
//! and keeps a persistent count of billed calls.
//!
//! # Features
//!
//! - **Never fails the caller**: no match, non-OK statuses and transport
//!   errors all come back as an outcome without coordinates
//! - **Usage accounting**: every attempted call is counted; the counter resets
//!   lazily on the first call in a new calendar month
//! - **Cost estimate**: spend is `rate × count / 1000`; exceeding the monthly
//!   allowance is flagged, never blocked
//! - **Local state**: the counter survives between runs in a `KEY=value` file
//!
//! # Example
//!
//! ```rust,no_run
//! use waypoint_core::{Coordinates, GeocodeConfig};
//! use waypoint_geocode::{Geocoder, PlacesGeocoder, UsageState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeocodeConfig {
//!     api_key: Some("api-key".to_string()),
//!     ..Default::default()
//! };
//! let geocoder = PlacesGeocoder::new(&config, UsageState::new(4))?;
//!
//! let center = Coordinates::new(27.041, 88.266)?;
//! let outcome = geocoder.resolve("Tiger Hill", center, 5_000.0).await;
//! println!("{:?} after {} calls", outcome.coordinates, outcome.usage.count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod state_file;
pub mod usage;

pub use client::{GeocodeOutcome, Geocoder, PlacesGeocoder};
pub use error::{GeocodeError, Result};
pub use state_file::{persist_usage, LocalState};
pub use usage::{BillingPolicy, UsageSnapshot, UsageState};
