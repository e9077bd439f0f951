//! Application state management.

use anyhow::Context;
use std::path::{Path, PathBuf};
use waypoint_core::AppConfig;

/// Resolved configuration and file locations shared by all commands.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Effective configuration (file, then environment overrides)
    pub config: AppConfig,

    /// Place cache database
    pub database_path: PathBuf,

    /// `KEY=value` file carrying the geocode usage counter
    pub state_path: PathBuf,
}

impl AppState {
    /// Load configuration from `config_path`, or the platform location.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AppConfig::load().context("failed to load config")?,
        };
        Self::from_config(config, |key| std::env::var(key).ok())
    }

    /// Build state from an already loaded configuration.
    pub fn from_config(
        mut config: AppConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        config.apply_env(env);

        let database_path = config
            .database_path()
            .context("failed to resolve database path")?;
        let state_path = config.state_path().context("failed to resolve state path")?;

        tracing::debug!("Database: {}", database_path.display());
        tracing::debug!("State file: {}", state_path.display());

        Ok(Self {
            config,
            database_path,
            state_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_kept() {
        let mut config = AppConfig::default();
        config.storage.database_path = Some(PathBuf::from("/tmp/w/places.db"));
        config.state.path = Some(PathBuf::from("/tmp/w/.env"));

        let state = AppState::from_config(config, |_| None).expect("state");
        assert_eq!(state.database_path, PathBuf::from("/tmp/w/places.db"));
        assert_eq!(state.state_path, PathBuf::from("/tmp/w/.env"));
    }

    #[test]
    fn test_environment_applied() {
        let mut config = AppConfig::default();
        config.storage.database_path = Some(PathBuf::from("places.db"));
        config.state.path = Some(PathBuf::from(".env"));

        let state = AppState::from_config(config, |key| {
            (key == "WAYPOINT_MAX_PLACES").then(|| "9".to_string())
        })
        .expect("state");
        assert_eq!(state.config.scraping.max_places, 9);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "[storage]\ndatabase_path = \"{}\"\n\n[state]\npath = \"{}\"\n",
                dir.path().join("cache.db").display(),
                dir.path().join("state.env").display()
            ),
        )
        .expect("write config");

        let state = AppState::load(Some(&path)).expect("state");
        assert_eq!(state.database_path, dir.path().join("cache.db"));
        assert_eq!(state.state_path, dir.path().join("state.env"));
    }
}
