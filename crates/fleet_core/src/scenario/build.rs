use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ids::VehicleId;
use crate::rider::RiderPool;
use crate::routing::RouteStore;
use crate::scenario::params::SimulationParams;
use crate::vehicle::Vehicle;

/// Upper bound for the random starting mileage of a vehicle (km).
const MAX_INITIAL_ODOMETER_KM: f64 = 60_000.0;

/// Initial fleet: vehicles in id order and the rider pool.
#[derive(Debug)]
pub struct Fleet {
    pub vehicles: Vec<Vehicle>,
    pub riders: RiderPool,
}

/// RNG for a fleet component. Seeded runs derive one stream per `stream` id;
/// unseeded runs draw from OS entropy.
pub fn rng_for(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

/// Creates vehicles with ids `1..=fleet.vehicles` and riders with ids
/// `1..=fleet.riders`.
pub fn build_fleet<R: Rng + ?Sized>(
    params: &SimulationParams,
    routes: &RouteStore,
    rng: &mut R,
) -> Fleet {
    let fuel = params.vehicle.fuel;
    let vehicles = (1..=params.fleet.vehicles as VehicleId)
        .map(|id| {
            let in_service = rng.gen_bool(params.fleet.in_service_ratio);
            let position = routes.pick(rng).origin();
            let fuel_pct = rng.gen_range(fuel.refill_min_pct..=100.0);
            let odometer_km = (rng.gen_range(0.0..MAX_INITIAL_ODOMETER_KM) * 10.0).round() / 10.0;
            Vehicle::new(id, in_service, position, fuel_pct, odometer_km)
        })
        .collect();

    Fleet {
        vehicles,
        riders: RiderPool::with_count(params.fleet.riders),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_params, test_route_store, TEST_ORIGIN};

    #[test]
    fn builds_requested_fleet() {
        let params = test_params().with_fleet_size(20, 7);
        let routes = test_route_store();
        let mut rng = rng_for(params.seed, 0);
        let fleet = build_fleet(&params, &routes, &mut rng);

        assert_eq!(fleet.vehicles.len(), 20);
        assert_eq!(fleet.riders.len(), 7);
        let ids: Vec<_> = fleet.vehicles.iter().map(|v| v.id()).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        for vehicle in &fleet.vehicles {
            assert_eq!(vehicle.position(), TEST_ORIGIN);
            assert!(vehicle.fuel_pct() >= params.vehicle.fuel.refill_min_pct);
            assert!(vehicle.locked());
            assert!(!vehicle.booked());
        }
    }

    #[test]
    fn in_service_ratio_bounds() {
        let routes = test_route_store();
        let mut params = test_params().with_fleet_size(10, 0);

        params.fleet.in_service_ratio = 1.0;
        let fleet = build_fleet(&params, &routes, &mut rng_for(Some(1), 0));
        assert!(fleet.vehicles.iter().all(|v| v.in_service()));

        params.fleet.in_service_ratio = 0.0;
        let fleet = build_fleet(&params, &routes, &mut rng_for(Some(1), 0));
        assert!(fleet.vehicles.iter().all(|v| !v.in_service()));
    }
}
