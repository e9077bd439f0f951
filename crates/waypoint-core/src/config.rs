//! Configuration management for waypoint.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/waypoint/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Crawl limits and wait budgets
    pub scraping: ScrapingConfig,
    /// Geocoding endpoint and billing
    pub geocode: GeocodeConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Place cache location
    pub storage: StorageConfig,
    /// CSV export location
    pub export: ExportConfig,
    /// Local state file location
    pub state: StateConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, defaults if it is absent.
    pub fn load_from(config_path: &std::path::Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `WAYPOINT_MAPS_API_KEY`: Geocoding API key (never written to disk)
    /// - `WAYPOINT_HEADLESS`: Override browser headless mode (true/false)
    /// - `WAYPOINT_MAX_PLACES`: Override listing limit
    /// - `WAYPOINT_MAX_REVIEWS`: Override per-place review limit
    /// - `WAYPOINT_DATABASE`: Override the cache database path
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("WAYPOINT_MAPS_API_KEY") {
            if !key.trim().is_empty() {
                self.geocode.api_key = Some(key);
                tracing::debug!("Override geocode.api_key from env");
            }
        }

        if let Some(val) = lookup("WAYPOINT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("WAYPOINT_MAX_PLACES") {
            if let Ok(max) = val.parse() {
                self.scraping.max_places = max;
                tracing::debug!("Override scraping.max_places from env: {}", max);
            }
        }

        if let Some(val) = lookup("WAYPOINT_MAX_REVIEWS") {
            if let Ok(max) = val.parse() {
                self.scraping.max_reviews = max;
                tracing::debug!("Override scraping.max_reviews from env: {}", max);
            }
        }

        if let Some(val) = lookup("WAYPOINT_DATABASE") {
            tracing::debug!("Override storage.database_path from env: {}", val);
            self.storage.database_path = Some(PathBuf::from(val));
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/waypoint/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/waypoint`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    /// Resolved cache database path (configured or under the data dir).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("places.db")),
        }
    }

    /// Resolved local state file path (configured or under the data dir).
    pub fn state_path(&self) -> ConfigResult<PathBuf> {
        match &self.state.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(".scraper.dat")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "waypoint", "waypoint").ok_or(ConfigError::NoConfigDir)
}

/// Crawl limits and wait budgets.
///
/// Every site interaction is bounded by one of these timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Site root the search starts from
    pub base_url: String,
    /// Label of the result category tab to select
    pub category_label: String,
    /// Stop paginating the listing once more places than this were seen
    pub max_places: usize,
    /// Stop paginating a place's reviews once more reviews than this were seen
    pub max_reviews: usize,
    /// Wait for the search box, seconds
    pub search_box_wait_secs: u64,
    /// Wait for the category filter, seconds
    pub search_filter_wait_secs: u64,
    /// Wait for listing result cards, seconds
    pub results_wait_secs: u64,
    /// Wait for a review tab marker, seconds
    pub review_tab_wait_secs: u64,
    /// Wait for a pagination control to become clickable, seconds
    pub clickable_wait_secs: u64,
    /// Wait for review images, seconds
    pub image_load_wait_secs: u64,
    /// Pause between scroll rounds while lazy content loads, milliseconds
    pub scroll_pause_ms: u64,
    /// Upper bound on scroll rounds per page
    pub max_scroll_rounds: u32,
    /// Width requested when upgrading review image URLs
    pub image_max_width: u32,
}

impl ScrapingConfig {
    /// Search box wait as a `Duration`.
    #[must_use]
    pub fn search_box_wait(&self) -> Duration {
        Duration::from_secs(self.search_box_wait_secs)
    }

    /// Category filter wait as a `Duration`.
    #[must_use]
    pub fn search_filter_wait(&self) -> Duration {
        Duration::from_secs(self.search_filter_wait_secs)
    }

    /// Listing wait as a `Duration`.
    #[must_use]
    pub fn results_wait(&self) -> Duration {
        Duration::from_secs(self.results_wait_secs)
    }

    /// Review tab wait as a `Duration`.
    #[must_use]
    pub fn review_tab_wait(&self) -> Duration {
        Duration::from_secs(self.review_tab_wait_secs)
    }

    /// Clickable wait as a `Duration`.
    #[must_use]
    pub fn clickable_wait(&self) -> Duration {
        Duration::from_secs(self.clickable_wait_secs)
    }

    /// Image wait as a `Duration`.
    #[must_use]
    pub fn image_load_wait(&self) -> Duration {
        Duration::from_secs(self.image_load_wait_secs)
    }

    /// Scroll pause as a `Duration`.
    #[must_use]
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.tripadvisor.in".to_string(),
            category_label: "Things to do".to_string(),
            max_places: 5,
            max_reviews: 50,
            search_box_wait_secs: 10,
            search_filter_wait_secs: 10,
            results_wait_secs: 20,
            review_tab_wait_secs: 10,
            clickable_wait_secs: 5,
            image_load_wait_secs: 5,
            scroll_pause_ms: 5000,
            max_scroll_rounds: 20,
            image_max_width: 2400,
        }
    }
}

/// Geocoding endpoint and billing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Find-place-from-text endpoint
    pub endpoint: String,
    /// Price per thousand calls
    pub billing_rate_per_thousand: f64,
    /// Monthly spend after which every call is flagged
    pub monthly_allowance: f64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key (supplied via environment, never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/place/findplacefromtext/json"
                .to_string(),
            billing_rate_per_thousand: 17.0,
            monthly_allowance: 200.0,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Per-command timeout in seconds
    pub request_timeout_secs: u64,
    /// Explicit Chrome executable, autodetected if unset
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            request_timeout_secs: 30,
            executable: None,
        }
    }
}

/// Place cache location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database file, defaults to `<data_dir>/places.db`
    pub database_path: Option<PathBuf>,
}

/// CSV export location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output file for the flattened review rows
    pub csv_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("reviews.csv"),
        }
    }
}

/// Local persisted state location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// key=value state file, defaults to `<data_dir>/.scraper.dat`
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.max_places, 5);
        assert_eq!(config.scraping.max_reviews, 50);
        assert_eq!(config.scraping.image_max_width, 2400);
        assert!((config.geocode.billing_rate_per_thousand - 17.0).abs() < f64::EPSILON);
        assert!(config.browser.headless);
        assert!(config.geocode.api_key.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.geocode.api_key = Some("secret".to_string());
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[geocode]"));
        assert!(!toml_str.contains("secret"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.scraping.base_url, config.scraping.base_url);
    }

    #[test]
    fn test_config_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.scraping.max_places = 12;
        fs::write(
            &config_path,
            toml::to_string_pretty(&config).expect("serialize config"),
        )
        .expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.scraping.max_places, 12);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load config");
        assert_eq!(loaded.scraping.max_reviews, 50);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WAYPOINT_MAPS_API_KEY", "k-123"),
            ("WAYPOINT_HEADLESS", "false"),
            ("WAYPOINT_MAX_PLACES", "30"),
            ("WAYPOINT_MAX_REVIEWS", "not-a-number"),
            ("WAYPOINT_DATABASE", "/tmp/cache.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.geocode.api_key.as_deref(), Some("k-123"));
        assert!(!config.browser.headless);
        assert_eq!(config.scraping.max_places, 30);
        assert_eq!(config.scraping.max_reviews, 50);
        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/tmp/cache.db")
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[scraping]
max_places = 8

[browser]
headless = false
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scraping.max_places, 8);
        assert!(!config.browser.headless);
        // These should be defaults
        assert_eq!(config.scraping.results_wait_secs, 20);
        assert_eq!(config.export.csv_path, PathBuf::from("reviews.csv"));
    }
}
