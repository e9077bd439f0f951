//! Monthly geocoding usage and cost estimation.
//!
//! The counter is a rolling monthly budget: it resets the first time it is
//! touched in a calendar month different from the one it was last active in.

use serde::{Deserialize, Serialize};
use waypoint_core::GeocodeConfig;

/// Persisted call counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    /// Billed calls in the active month
    pub monthly_usage_count: u64,
    /// Calendar month (1-12) the counter belongs to
    pub last_reset_month: u32,
}

impl UsageState {
    /// A fresh counter for `month`.
    #[must_use]
    pub fn new(month: u32) -> Self {
        Self {
            monthly_usage_count: 0,
            last_reset_month: month,
        }
    }

    /// Reset the counter if `current_month` differs from the stored month.
    ///
    /// Returns whether a reset happened.
    pub fn roll_over(&mut self, current_month: u32) -> bool {
        if self.last_reset_month == current_month {
            return false;
        }
        tracing::info!(
            previous_month = self.last_reset_month,
            current_month,
            previous_count = self.monthly_usage_count,
            "Resetting monthly geocode usage"
        );
        self.monthly_usage_count = 0;
        self.last_reset_month = current_month;
        true
    }

    /// Count one billed call made in `current_month`.
    pub fn record_call(&mut self, current_month: u32) -> u64 {
        self.roll_over(current_month);
        self.monthly_usage_count += 1;
        self.monthly_usage_count
    }
}

/// Usage at a point in time, with its estimated cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Billed calls this month
    pub count: u64,
    /// Estimated spend this month
    pub estimated_cost: f64,
    /// Whether the spend exceeds the monthly allowance
    pub over_allowance: bool,
}

/// Pricing used to turn a call count into spend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingPolicy {
    /// Price per thousand calls
    pub rate_per_thousand: f64,
    /// Monthly spend after which calls are flagged
    pub monthly_allowance: f64,
}

impl BillingPolicy {
    /// Pricing from configuration.
    #[must_use]
    pub fn from_config(config: &GeocodeConfig) -> Self {
        Self {
            rate_per_thousand: config.billing_rate_per_thousand,
            monthly_allowance: config.monthly_allowance,
        }
    }

    /// `rate × count / 1000`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimated_cost(&self, count: u64) -> f64 {
        self.rate_per_thousand * count as f64 / 1000.0
    }

    /// Snapshot of `count` calls under this policy.
    #[must_use]
    pub fn snapshot(&self, count: u64) -> UsageSnapshot {
        let estimated_cost = self.estimated_cost(count);
        UsageSnapshot {
            count,
            estimated_cost,
            over_allowance: estimated_cost > self.monthly_allowance,
        }
    }
}
