//! Local `KEY=value` state carried between runs.
//!
//! Holds the geocode usage counter (`MAPS_API_USAGE`) and the date of the
//! last run (`TIMESTAMP`, `dd-mm-YYYY`). Keys this crate does not know are
//! kept as-is when the file is rewritten.

use crate::error::Result;
use crate::usage::UsageState;
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Key of the monthly call counter.
pub const USAGE_KEY: &str = "MAPS_API_USAGE";
/// Key of the last-active date.
pub const TIMESTAMP_KEY: &str = "TIMESTAMP";
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y";

/// In-memory copy of the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalState {
    path: PathBuf,
    vars: Vec<(String, String)>,
}

impl LocalState {
    /// Read the state file; a missing file yields an empty state.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let vars = match std::fs::read_to_string(&path) {
            Ok(contents) => parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, vars })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.vars.push((key.to_string(), value)),
        }
    }

    /// Usage counter as stored.
    ///
    /// The month comes from `TIMESTAMP`; without one the counter is assumed to
    /// belong to `today`'s month. Unparseable values count as zero usage.
    #[must_use]
    pub fn usage_state(&self, today: NaiveDate) -> UsageState {
        let count = self
            .get(USAGE_KEY)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let month = self
            .get(TIMESTAMP_KEY)
            .and_then(|ts| NaiveDate::parse_from_str(ts.trim(), TIMESTAMP_FORMAT).ok())
            .map_or_else(|| today.month(), |date| date.month());

        UsageState {
            monthly_usage_count: count,
            last_reset_month: month,
        }
    }

    /// Record `usage` as of `today`.
    ///
    /// The counter is rolled over first, so a stale count from an earlier
    /// month is never stamped with the current date.
    pub fn set_usage(&mut self, usage: UsageState, today: NaiveDate) {
        let mut usage = usage;
        usage.roll_over(today.month());
        self.set(USAGE_KEY, usage.monthly_usage_count.to_string());
        self.set(TIMESTAMP_KEY, today.format(TIMESTAMP_FORMAT).to_string());
    }

    /// Write the state back, hiding the file where the platform supports it.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = self
            .vars
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n");

        // a hidden file cannot be truncated on Windows
        set_hidden(&self.path, false);
        std::fs::write(&self.path, contents)?;
        set_hidden(&self.path, true);

        tracing::debug!("Local state written to {}", self.path.display());
        Ok(())
    }
}

/// Load the state at `path`, record `usage` and write it back.
pub fn persist_usage(path: &Path, usage: UsageState, today: NaiveDate) -> Result<()> {
    let mut state = LocalState::load(path)?;
    state.set_usage(usage, today);
    state.save()
}

fn parse(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim_end_matches('\r').to_string()))
        })
        .collect()
}

#[cfg(windows)]
fn set_hidden(path: &Path, hidden: bool) {
    if !path.exists() {
        return;
    }
    let flag = if hidden { "+h" } else { "-h" };
    if let Err(e) = std::process::Command::new("attrib")
        .arg(flag)
        .arg(path)
        .status()
    {
        tracing::debug!("Could not change hidden attribute: {}", e);
    }
}

#[cfg(not(windows))]
fn set_hidden(_path: &Path, _hidden: bool) {
    // dot-file names are the convention here
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = LocalState::load(dir.path().join(".scraper.dat")).expect("load");
        assert_eq!(state.get(USAGE_KEY), None);

        let usage = state.usage_state(date(2024, 6, 1));
        assert_eq!(usage, UsageState::new(6));
    }

    #[test]
    fn test_reads_usage_and_month() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".scraper.dat");
        std::fs::write(&path, "MAPS_API_USAGE=50\nTIMESTAMP=14-03-2024").expect("write");

        let state = LocalState::load(&path).expect("load");
        assert_eq!(
            state.usage_state(date(2024, 4, 2)),
            UsageState {
                monthly_usage_count: 50,
                last_reset_month: 3,
            }
        );
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(".scraper.dat");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "THEME=dark\nMAPS_API_USAGE=7\nTIMESTAMP=01-05-2024").expect("write");

        let usage = UsageState {
            monthly_usage_count: 9,
            last_reset_month: 5,
        };
        persist_usage(&path, usage, date(2024, 5, 20)).expect("persist");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "THEME=dark\nMAPS_API_USAGE=9\nTIMESTAMP=20-05-2024");
    }

    #[test]
    fn test_stale_count_rolls_over_on_save() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".scraper.dat");

        let stale = UsageState {
            monthly_usage_count: 120,
            last_reset_month: 2,
        };
        persist_usage(&path, stale, date(2024, 3, 1)).expect("persist");

        let state = LocalState::load(&path).expect("load");
        assert_eq!(state.get(USAGE_KEY), Some("0"));
        assert_eq!(state.get(TIMESTAMP_KEY), Some("01-03-2024"));
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let vars = parse("no separator\n=orphan\nKEY=a=b\r\n");
        assert_eq!(vars, vec![("KEY".to_string(), "a=b".to_string())]);
    }
}
