//! Test helpers for common test setup and utilities.
//!
//! Shared fixtures for unit and integration tests: a short straight route,
//! a store built from it and a ready-to-use [`VehicleEnv`].

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::ids::IdGenerator;
use crate::routing::{Route, RouteSegment, RouteStore};
use crate::scenario::SimulationParams;
use crate::spatial::LatLng;
use crate::vehicle::VehicleEnv;

/// Start of the Berlin test route.
pub const TEST_ORIGIN: LatLng = LatLng::new(52.5200, 13.4050);

/// A fixed instant used as "now" by synchronous tests.
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0)
        .single()
        .expect("valid test timestamp")
}

/// Two-segment route of 300 m: 100 m at 10 m/s, then 200 m at 20 m/s.
/// With one-second ticks it finishes on the 20th tick.
pub fn test_route() -> Route {
    let mid = LatLng::new(TEST_ORIGIN.lat, TEST_ORIGIN.lng + 0.0015);
    let end = LatLng::new(TEST_ORIGIN.lat, TEST_ORIGIN.lng + 0.0044);
    Route::from_segments(vec![
        RouteSegment::new(100.0, 10.0, vec![TEST_ORIGIN, mid]),
        RouteSegment::new(200.0, 10.0, vec![mid, end]),
    ])
    .expect("test route is drivable")
}

pub fn test_route_store() -> Arc<RouteStore> {
    Arc::new(RouteStore::from_routes(vec![test_route()]).expect("non-empty store"))
}

/// Routing-engine style JSON describing [`test_route`], for loader tests.
pub fn test_route_json() -> String {
    r#"[{"code": "Ok", "routes": [{
        "distance": 300.0, "duration": 20.0,
        "geometry": {"coordinates": [[13.4050, 52.52], [13.4065, 52.52], [13.4094, 52.52]]},
        "legs": [{"steps": [
            {"distance": 100.0, "duration": 10.0,
             "geometry": {"coordinates": [[13.4050, 52.52], [13.4065, 52.52]]}},
            {"distance": 200.0, "duration": 10.0,
             "geometry": {"coordinates": [[13.4065, 52.52], [13.4094, 52.52]]}}
        ]}]
    }]}]"#
        .to_string()
}

/// Simulation parameters tuned for fast tests: 1 s ticks, no start jitter,
/// idle status every tick and a one-minute booking TTL.
pub fn test_params() -> SimulationParams {
    let mut params = SimulationParams::default().with_seed(42);
    params.vehicle.tick_ms = 1000;
    params.vehicle.start_jitter_max_ms = 0;
    params.vehicle.idle_report_every = 1;
    params.booking.ttl_secs = 60;
    params.pricing.base_fee = 1.0;
    params.pricing.per_minute_rate = 0.5;
    params
}

pub fn test_env() -> VehicleEnv {
    VehicleEnv::from_params(&test_params(), test_route_store(), Arc::new(IdGenerator::new()))
}
