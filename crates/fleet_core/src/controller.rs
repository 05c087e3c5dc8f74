//! Fleet controller: pairs idle riders with available vehicles.
//!
//! Each poll picks the first rider not in a trip and the first available
//! vehicle (pool order, no fairness). The vehicle scan reads lock-free flags,
//! so the actor's `book` stays the authority and may still refuse.
//!
//! After a successful booking the rider either starts driving right away or,
//! on a separate task, thinks for a random delay and then cancels or starts
//! the trip. When that late action finds the booking gone (it expired first)
//! the rider is released here, since expiry never touches riders.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::actor::VehicleHandle;
use crate::ids::{RiderId, VehicleId};
use crate::rider::{Rider, RiderPool};
use crate::scenario::ControllerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    NoRider,
    NoVehicle,
    /// The rider was claimed by someone else between scan and claim.
    RiderTaken,
    BookFailed {
        vehicle_id: VehicleId,
        rider_id: RiderId,
    },
    InstantTrip {
        vehicle_id: VehicleId,
        rider_id: RiderId,
        started: bool,
    },
    Waiting {
        vehicle_id: VehicleId,
        rider_id: RiderId,
        delay: Duration,
        will_cancel: bool,
    },
}

/// Counters reported when the controller stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub polls: u64,
    pub skipped: u64,
    pub book_failures: u64,
    pub instant_trips: u64,
    pub deferred_bookings: u64,
}

impl ControllerStats {
    fn record(&mut self, outcome: &MatchOutcome) {
        self.polls += 1;
        match outcome {
            MatchOutcome::NoRider | MatchOutcome::NoVehicle | MatchOutcome::RiderTaken => {
                self.skipped += 1
            }
            MatchOutcome::BookFailed { .. } => self.book_failures += 1,
            MatchOutcome::InstantTrip { .. } => self.instant_trips += 1,
            MatchOutcome::Waiting { .. } => self.deferred_bookings += 1,
        }
    }
}

pub struct FleetController {
    riders: Arc<RiderPool>,
    vehicles: Vec<VehicleHandle>,
    config: ControllerConfig,
    rng: StdRng,
    cancel: CancellationToken,
    waits: JoinSet<()>,
    stats: ControllerStats,
}

impl FleetController {
    pub fn new(
        riders: Arc<RiderPool>,
        vehicles: Vec<VehicleHandle>,
        config: ControllerConfig,
        rng: StdRng,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            riders,
            vehicles,
            config,
            rng,
            cancel,
            waits: JoinSet::new(),
            stats: ControllerStats::default(),
        }
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Number of booking-wait tasks still running.
    pub fn pending_waits(&self) -> usize {
        self.waits.len()
    }

    /// One matching attempt.
    pub async fn match_once(&mut self) -> MatchOutcome {
        let outcome = self.try_match().await;
        self.stats.record(&outcome);
        outcome
    }

    async fn try_match(&mut self) -> MatchOutcome {
        let Some(rider) = self.riders.first_available() else {
            return MatchOutcome::NoRider;
        };
        let Some(vehicle) = self.vehicles.iter().find(|v| v.is_available()).cloned() else {
            return MatchOutcome::NoVehicle;
        };
        if !rider.try_claim() {
            return MatchOutcome::RiderTaken;
        }

        let vehicle_id = vehicle.id();
        let rider_id = rider.id();
        if !vehicle.book(Arc::clone(&rider)).await {
            debug!(vehicle_id, rider_id, "book lost the race, releasing rider");
            rider.release();
            return MatchOutcome::BookFailed {
                vehicle_id,
                rider_id,
            };
        }

        let instant = self.rng.gen_bool(self.config.instant_trip_probability);
        if instant {
            let started = vehicle.start_trip(Arc::clone(&rider)).await;
            if !started {
                rider.release();
            }
            return MatchOutcome::InstantTrip {
                vehicle_id,
                rider_id,
                started,
            };
        }

        let delay = Duration::from_millis(
            self.rng
                .gen_range(self.config.min_wait_ms..=self.config.max_wait_ms),
        );
        let will_cancel = self.rng.gen_bool(self.config.cancel_probability);
        self.waits.spawn(settle_booking(
            vehicle,
            rider,
            delay,
            will_cancel,
            self.cancel.clone(),
        ));
        MatchOutcome::Waiting {
            vehicle_id,
            rider_id,
            delay,
            will_cancel,
        }
    }

    fn reap_finished_waits(&mut self) {
        while let Some(result) = self.waits.try_join_next() {
            if let Err(err) = result {
                error!(%err, "booking wait task failed");
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<ControllerStats> {
        tokio::spawn(self.run())
    }

    /// Polls until cancelled, then waits for outstanding booking-wait tasks.
    pub async fn run(mut self) -> ControllerStats {
        let mut ticker = interval(self.config.poll_interval().max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            vehicles = self.vehicles.len(),
            riders = self.riders.len(),
            "fleet controller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let outcome = self.match_once().await;
                    debug!(?outcome, "match attempt");
                    self.reap_finished_waits();
                }
            }
        }

        while let Some(result) = self.waits.join_next().await {
            if let Err(err) = result {
                error!(%err, "booking wait task failed");
            }
        }
        info!(stats = ?self.stats, "fleet controller stopped");
        self.stats
    }
}

/// Rider think time after a deferred booking, followed by cancel or start.
async fn settle_booking(
    vehicle: VehicleHandle,
    rider: Arc<Rider>,
    delay: Duration,
    will_cancel: bool,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
    }

    let applied = if will_cancel {
        vehicle.cancel_book(Arc::clone(&rider)).await
    } else {
        vehicle.start_trip(Arc::clone(&rider)).await
    };
    if !applied {
        debug!(
            vehicle_id = vehicle.id(),
            rider_id = rider.id(),
            will_cancel,
            "booking gone before rider acted, releasing rider"
        );
        rider.release();
    }
}
