//! Command line surface.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use waypoint_core::{AppConfig, Coordinates, SearchQuery};

/// Waypoint - travel review scraper
#[derive(Parser, Debug)]
#[command(name = "waypoint", version, about = "Scrape geocoded travel reviews")]
pub struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search an area and scrape reviews of the places found
    Scrape(ScrapeArgs),

    /// Show this month's geocoding usage and estimated cost
    Usage,
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Search term typed into the site search box
    #[arg(short, long)]
    pub query: String,

    /// Latitude of the search center
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the search center
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Search radius in meters
    #[arg(short, long)]
    pub radius: f64,

    /// CSV output file (default: export.csv_path from config)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Stop paginating the listing after this many places
    #[arg(long)]
    pub max_places: Option<usize>,

    /// Stop paginating a place's reviews after this many reviews
    #[arg(long)]
    pub max_reviews: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

impl ScrapeArgs {
    /// Validated query from the positional flags.
    pub fn search_query(&self) -> anyhow::Result<SearchQuery> {
        let center = Coordinates::new(self.lat, self.lng).context("invalid search center")?;
        SearchQuery::new(self.query.clone(), center, self.radius).context("invalid search query")
    }

    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.csv {
            config.export.csv_path.clone_from(path);
        }
        if let Some(max) = self.max_places {
            config.scraping.max_places = max;
        }
        if let Some(max) = self.max_reviews {
            config.scraping.max_reviews = max;
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}
