//! Scenario setup: simulation parameters and the initial fleet.
//!
//! Vehicles are parked at random route origins with random fuel and mileage;
//! riders start outside any trip.

mod build;
mod params;

pub use build::{build_fleet, rng_for, Fleet};
pub use params::{
    BookingConfig, ControllerConfig, EmitterConfig, FleetSizeConfig, FuelConfig,
    SimulationParams, VehicleConfig,
};
