//! `waypoint usage`: this month's geocoding spend.

use crate::state::AppState;
use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use waypoint_geocode::{BillingPolicy, LocalState};

/// Geocode usage as of a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    /// Billed calls this month
    pub count: u64,
    /// Estimated spend this month
    pub estimated_cost: f64,
    /// Configured monthly allowance
    pub monthly_allowance: f64,
    /// Whether the spend exceeds the allowance
    pub over_allowance: bool,
}

impl UsageReport {
    /// Read the state file and price its counter.
    ///
    /// A counter left over from an earlier month reads as zero, the same way
    /// the next scrape run will see it.
    pub fn build(state: &AppState, today: NaiveDate) -> anyhow::Result<Self> {
        let local = LocalState::load(&state.state_path)
            .with_context(|| format!("failed to read {}", state.state_path.display()))?;
        let mut usage = local.usage_state(today);
        usage.roll_over(today.month());

        let policy = BillingPolicy::from_config(&state.config.geocode);
        let snapshot = policy.snapshot(usage.monthly_usage_count);
        Ok(Self {
            count: snapshot.count,
            estimated_cost: snapshot.estimated_cost,
            monthly_allowance: policy.monthly_allowance,
            over_allowance: snapshot.over_allowance,
        })
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Places API usage this month: {} calls, estimated cost ${:.2} of ${:.2}",
            self.count, self.estimated_cost, self.monthly_allowance
        )?;
        if self.over_allowance {
            write!(f, " (allowance exceeded)")?;
        }
        Ok(())
    }
}

/// Print the report for today.
pub fn run(state: &AppState) -> anyhow::Result<()> {
    let report = UsageReport::build(state, chrono::Local::now().date_naive())?;
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::AppConfig;

    fn state_in(dir: &std::path::Path, contents: Option<&str>) -> AppState {
        let state_path = dir.join(".scraper.dat");
        if let Some(contents) = contents {
            std::fs::write(&state_path, contents).expect("write state");
        }
        let mut config = AppConfig::default();
        config.geocode.billing_rate_per_thousand = 17.0;
        config.geocode.monthly_allowance = 1.0;
        AppState {
            config,
            database_path: dir.join("places.db"),
            state_path,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_current_month_usage() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = state_in(
            dir.path(),
            Some("MAPS_API_USAGE=100\nTIMESTAMP=02-05-2024\n"),
        );

        let report = UsageReport::build(&state, date(2024, 5, 20)).expect("report");
        assert_eq!(report.count, 100);
        assert!((report.estimated_cost - 1.7).abs() < 1e-9);
        assert!(report.over_allowance);
        assert!(report.to_string().contains("allowance exceeded"));
    }

    #[test]
    fn test_previous_month_reads_as_zero() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = state_in(
            dir.path(),
            Some("MAPS_API_USAGE=100\nTIMESTAMP=28-04-2024\n"),
        );

        let report = UsageReport::build(&state, date(2024, 5, 1)).expect("report");
        assert_eq!(report.count, 0);
        assert!(!report.over_allowance);
    }

    #[test]
    fn test_missing_state_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = state_in(dir.path(), None);

        let report = UsageReport::build(&state, date(2024, 5, 1)).expect("report");
        assert_eq!(report.count, 0);
        assert_eq!(
            report.to_string(),
            "Places API usage this month: 0 calls, estimated cost $0.00 of $1.00"
        );
    }
}
