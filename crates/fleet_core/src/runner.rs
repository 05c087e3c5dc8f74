//! Fleet runtime: starts distributors, vehicle actors and the controller,
//! and tears them down in order.
//!
//! Shutdown cancels the controller and every actor, joins them, and only then
//! joins the distributors. Actors hold the last emitter clones, so the
//! distributors drain every queued event before stopping.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::actor::{VehicleActor, VehicleHandle};
use crate::clock::SimClock;
use crate::controller::{ControllerStats, FleetController};
use crate::emitter::{EventBus, EventEmitter};
use crate::error::FleetError;
use crate::ids::{IdGenerator, VehicleId};
use crate::rider::RiderPool;
use crate::routing::RouteStore;
use crate::scenario::{build_fleet, rng_for, Fleet, SimulationParams};
use crate::vehicle::{Vehicle, VehicleEnv};

/// Stream id reserved for the controller RNG; vehicles use their own ids.
const CONTROLLER_RNG_STREAM: u64 = 0;

/// What is left after [`FleetRuntime::shutdown`].
#[derive(Debug)]
pub struct ShutdownReport {
    pub controller: Option<ControllerStats>,
    pub vehicles: Vec<Vehicle>,
}

pub struct FleetRuntime {
    cancel: CancellationToken,
    vehicles: Vec<VehicleHandle>,
    riders: Arc<RiderPool>,
    vehicle_tasks: Vec<JoinHandle<Vehicle>>,
    controller_task: Option<JoinHandle<ControllerStats>>,
    distributor_tasks: Vec<JoinHandle<()>>,
}

impl FleetRuntime {
    /// Validates `params`, bootstraps a fleet and starts everything.
    pub fn start(
        params: &SimulationParams,
        routes: Arc<RouteStore>,
        emitter: EventEmitter,
        bus: EventBus,
    ) -> Result<Self, FleetError> {
        params.validate()?;
        let fleet = build_fleet(params, &routes, &mut rng_for(params.seed, u64::MAX));
        Ok(Self::launch(params, routes, fleet, emitter, bus, true))
    }

    /// Starts a prepared fleet. Without the controller, vehicles only move
    /// when driven through their handles.
    pub fn start_with_fleet(
        params: &SimulationParams,
        routes: Arc<RouteStore>,
        fleet: Fleet,
        emitter: EventEmitter,
        bus: EventBus,
        run_controller: bool,
    ) -> Result<Self, FleetError> {
        params.validate()?;
        Ok(Self::launch(params, routes, fleet, emitter, bus, run_controller))
    }

    fn launch(
        params: &SimulationParams,
        routes: Arc<RouteStore>,
        fleet: Fleet,
        emitter: EventEmitter,
        bus: EventBus,
        run_controller: bool,
    ) -> Self {
        let cancel = CancellationToken::new();
        let distributor_tasks = bus.spawn();
        let env = VehicleEnv::from_params(params, routes, Arc::new(IdGenerator::new()));
        let clock = SimClock::new();

        let mut vehicles = Vec::with_capacity(fleet.vehicles.len());
        let mut vehicle_tasks = Vec::with_capacity(fleet.vehicles.len());
        for vehicle in fleet.vehicles {
            let rng = rng_for(params.seed, vehicle.id());
            let (actor, handle) = VehicleActor::new(
                vehicle,
                env.clone(),
                clock,
                emitter.clone(),
                rng,
                cancel.child_token(),
            );
            vehicle_tasks.push(actor.spawn());
            vehicles.push(handle);
        }
        drop(emitter);

        let riders = Arc::new(fleet.riders);
        let controller_task = run_controller.then(|| {
            FleetController::new(
                Arc::clone(&riders),
                vehicles.clone(),
                params.controller,
                rng_for(params.seed, CONTROLLER_RNG_STREAM),
                cancel.child_token(),
            )
            .spawn()
        });

        info!(
            vehicles = vehicles.len(),
            riders = riders.len(),
            controller = run_controller,
            "fleet runtime started"
        );
        Self {
            cancel,
            vehicles,
            riders,
            vehicle_tasks,
            controller_task,
            distributor_tasks,
        }
    }

    pub fn vehicles(&self) -> &[VehicleHandle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleHandle> {
        self.vehicles.iter().find(|v| v.id() == id)
    }

    pub fn riders(&self) -> &Arc<RiderPool> {
        &self.riders
    }

    /// Token observed by every task of this runtime.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn shutdown(self) -> ShutdownReport {
        self.cancel.cancel();

        let controller = match self.controller_task {
            Some(task) => match task.await {
                Ok(stats) => Some(stats),
                Err(err) => {
                    error!(%err, "controller task failed");
                    None
                }
            },
            None => None,
        };

        let mut vehicles = Vec::with_capacity(self.vehicle_tasks.len());
        for task in self.vehicle_tasks {
            match task.await {
                Ok(vehicle) => vehicles.push(vehicle),
                Err(err) => error!(%err, "vehicle task failed"),
            }
        }

        drop(self.vehicles);
        for task in self.distributor_tasks {
            if let Err(err) = task.await {
                error!(%err, "distributor task failed");
            }
        }

        info!(vehicles = vehicles.len(), "fleet runtime stopped");
        ShutdownReport {
            controller,
            vehicles,
        }
    }
}
