//! Time-based pricing for car-sharing trips.

use chrono::TimeDelta;
use serde::Deserialize;

/// Default unlock fee in currency units.
pub const BASE_FEE: f64 = 1.00;

/// Default per-minute rate in currency units.
pub const PER_MINUTE_RATE: f64 = 0.29;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub base_fee: f64,
    pub per_minute_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fee: BASE_FEE,
            per_minute_rate: PER_MINUTE_RATE,
        }
    }
}

/// Fare for a trip of the given duration.
///
/// Formula: `fare = base_fee + per_minute_rate * duration_minutes`.
/// Negative durations (clock skew) are charged as zero minutes.
pub fn calculate_trip_fare(config: &PricingConfig, duration: TimeDelta) -> f64 {
    let minutes = (duration.num_milliseconds().max(0) as f64) / 60_000.0;
    config.base_fee + config.per_minute_rate * minutes
}
