//! Waypoint command line shell
//!
//! Thin shell that parses arguments, resolves configuration and dispatches to
//! the pipeline. Scraping, storage and geocoding live in the `crates/`
//! directory.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod commands;
pub mod state;

pub use cli::{Cli, Command, ScrapeArgs};
pub use state::AppState;

use tracing::info;

/// Initialize tracing subscriber for logging.
///
/// Logs go to stderr so progress lines on stdout stay readable.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "debug"
    } else {
        "info,waypoint=debug"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting Waypoint v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Scrape(args) => commands::scrape::run(&state, args).await,
        Command::Usage => commands::usage::run(&state),
    }
}
