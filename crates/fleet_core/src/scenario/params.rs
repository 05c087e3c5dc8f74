use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::FleetError;
use crate::pricing::PricingConfig;

/// Fleet and rider pool sizes used by the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FleetSizeConfig {
    pub vehicles: usize,
    pub riders: usize,
    /// Share (0.0..=1.0) of vehicles created eligible for booking.
    pub in_service_ratio: f64,
}

impl Default for FleetSizeConfig {
    fn default() -> Self {
        Self {
            vehicles: 50,
            riders: 200,
            in_service_ratio: 0.95,
        }
    }
}

/// Fuel model: consumption per km and refill behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FuelConfig {
    pub consumption_pct_per_km: f64,
    /// Below this level the vehicle is refilled on the same tick.
    pub refill_threshold_pct: f64,
    /// Refills land uniformly in `refill_min_pct..=100`.
    pub refill_min_pct: f64,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            consumption_pct_per_km: 0.12,
            refill_threshold_pct: 10.0,
            refill_min_pct: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub tick_ms: u64,
    /// Upper bound of the one-off random delay before a vehicle starts ticking.
    pub start_jitter_max_ms: u64,
    /// Idle vehicles report status every N idle ticks.
    pub idle_report_every: u64,
    pub command_buffer: usize,
    pub fuel: FuelConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            start_jitter_max_ms: 5000,
            idle_report_every: 30,
            command_buffer: 32,
            fuel: FuelConfig::default(),
        }
    }
}

impl VehicleConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub ttl_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { ttl_secs: 15 * 60 }
    }
}

impl BookingConfig {
    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::seconds(self.ttl_secs as i64)
    }
}

/// Matching loop behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub poll_interval_ms: u64,
    /// Probability (0.0..=1.0) of booking and starting the trip in one go.
    pub instant_trip_probability: f64,
    /// Rider think time between booking and acting on it (uniform, ms).
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// Probability (0.0..=1.0) that a waiting rider cancels instead of driving.
    pub cancel_probability: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            instant_trip_probability: 0.3,
            min_wait_ms: 10_000,
            max_wait_ms: 20 * 60 * 1000,
            cancel_probability: 0.1,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Capacity of each category channel between vehicles and distributors.
    pub channel_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// Parameters for a fleet simulation run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Seeds the bootstrap and per-actor RNGs. Concurrency still makes runs
    /// non-reproducible; this only fixes the initial fleet.
    pub seed: Option<u64>,
    pub fleet: FleetSizeConfig,
    pub vehicle: VehicleConfig,
    pub booking: BookingConfig,
    pub controller: ControllerConfig,
    pub pricing: PricingConfig,
    pub emitter: EmitterConfig,
}

impl SimulationParams {
    pub fn from_json(raw: &str) -> Result<Self, FleetError> {
        serde_json::from_str(raw).map_err(|e| FleetError::InvalidConfig(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fleet_size(mut self, vehicles: usize, riders: usize) -> Self {
        self.fleet.vehicles = vehicles;
        self.fleet.riders = riders;
        self
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        let invalid = |msg: &str| Err(FleetError::InvalidConfig(msg.to_string()));

        if self.vehicle.tick_ms == 0 {
            return invalid("vehicle.tick_ms must be > 0");
        }
        if self.vehicle.idle_report_every == 0 {
            return invalid("vehicle.idle_report_every must be > 0");
        }
        if self.vehicle.command_buffer == 0 {
            return invalid("vehicle.command_buffer must be > 0");
        }
        let fuel = &self.vehicle.fuel;
        if fuel.consumption_pct_per_km < 0.0 {
            return invalid("vehicle.fuel.consumption_pct_per_km must be >= 0");
        }
        if !(0.0 < fuel.refill_threshold_pct && fuel.refill_threshold_pct < fuel.refill_min_pct)
            || fuel.refill_min_pct > 100.0
        {
            return invalid("vehicle.fuel requires 0 < refill_threshold_pct < refill_min_pct <= 100");
        }
        if self.booking.ttl_secs == 0 {
            return invalid("booking.ttl_secs must be > 0");
        }
        let controller = &self.controller;
        if controller.poll_interval_ms == 0 {
            return invalid("controller.poll_interval_ms must be > 0");
        }
        if controller.min_wait_ms > controller.max_wait_ms {
            return invalid("controller.min_wait_ms must be <= max_wait_ms");
        }
        for (name, p) in [
            ("controller.instant_trip_probability", controller.instant_trip_probability),
            ("controller.cancel_probability", controller.cancel_probability),
            ("fleet.in_service_ratio", self.fleet.in_service_ratio),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(FleetError::InvalidConfig(format!("{name} must be within 0..=1")));
            }
        }
        if self.pricing.base_fee < 0.0 || self.pricing.per_minute_rate < 0.0 {
            return invalid("pricing values must be >= 0");
        }
        if self.emitter.channel_capacity == 0 {
            return invalid("emitter.channel_capacity must be > 0");
        }
        Ok(())
    }
}
