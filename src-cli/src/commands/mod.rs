//! Subcommand implementations.

pub mod scrape;
pub mod usage;
