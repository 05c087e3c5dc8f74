use std::sync::Arc;
use std::time::Duration;

use fleet_core::actor::VehicleHandle;
use fleet_core::booking::BookingAction;
use fleet_core::controller::FleetController;
use fleet_core::emitter::{event_channels, Subscription};
use fleet_core::events::TripEvent;
use fleet_core::ids::{RiderId, VehicleId};
use fleet_core::rider::{Rider, RiderPool};
use fleet_core::runner::FleetRuntime;
use fleet_core::scenario::{rng_for, Fleet, SimulationParams};
use fleet_core::test_helpers::{test_params, test_route_store, TEST_ORIGIN};
use fleet_core::vehicle::Vehicle;
use tokio::sync::mpsc::UnboundedReceiver;

pub const START_ODOMETER_KM: f64 = 100.0;

/// Parked vehicle at the test route origin with a known odometer.
pub fn parked_vehicle(id: VehicleId, in_service: bool) -> Vehicle {
    Vehicle::new(id, in_service, TEST_ORIGIN, 80.0, START_ODOMETER_KM)
}

/// A running fleet without the controller plus a subscription to all events.
pub struct TestFleet {
    pub runtime: FleetRuntime,
    pub events: Subscription,
    pub params: SimulationParams,
}

impl TestFleet {
    pub fn start(vehicles: Vec<Vehicle>, riders: usize) -> Self {
        Self::start_with(test_params(), vehicles, riders)
    }

    pub fn start_with(params: SimulationParams, vehicles: Vec<Vehicle>, riders: usize) -> Self {
        let (emitter, mut bus) = event_channels(params.emitter.channel_capacity);
        let events = bus.subscribe();
        let fleet = Fleet {
            vehicles,
            riders: RiderPool::with_count(riders),
        };
        let runtime =
            FleetRuntime::start_with_fleet(&params, test_route_store(), fleet, emitter, bus, false)
                .expect("valid test params");
        Self {
            runtime,
            events,
            params,
        }
    }

    pub fn vehicle(&self, id: VehicleId) -> VehicleHandle {
        self.runtime.vehicle(id).cloned().expect("vehicle in fleet")
    }

    pub fn rider(&self, id: RiderId) -> Arc<Rider> {
        self.runtime.riders().get(id).expect("rider in pool")
    }

    /// Controller over this fleet's riders and vehicles, driven manually
    /// through `match_once`.
    pub fn controller(&self, params: &SimulationParams) -> FleetController {
        FleetController::new(
            Arc::clone(self.runtime.riders()),
            self.runtime.vehicles().to_vec(),
            params.controller,
            rng_for(Some(7), 0),
            self.runtime.cancellation_token().child_token(),
        )
    }

    pub async fn next_trip(&mut self) -> TripEvent {
        tokio::time::timeout(Duration::from_secs(120), self.events.trips.recv())
            .await
            .expect("trip event before timeout")
            .expect("trip channel open")
    }

    /// Booking actions delivered so far for `vehicle_id`, in order.
    pub fn booking_actions(&mut self, vehicle_id: VehicleId) -> Vec<BookingAction> {
        drain(&mut self.events.bookings)
            .into_iter()
            .filter(|b| b.cid == vehicle_id)
            .map(|b| b.action)
            .collect()
    }
}

pub fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}
