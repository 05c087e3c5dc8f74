//! Vehicle actor: one task per car owning its [`Vehicle`] exclusively.
//!
//! Rider requests (book, cancel, start trip) arrive as messages with oneshot
//! replies; expiry, driving and stopping happen on the actor's own ticker.
//! Everything runs on a single task, so the five transitions are linearizable
//! per vehicle without a lock. Ticks begin after a random start jitter; rider
//! requests are served immediately.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::SimClock;
use crate::emitter::EventEmitter;
use crate::ids::VehicleId;
use crate::rider::Rider;
use crate::vehicle::{Vehicle, VehicleEnv, VehicleFlags, VehicleSnapshot};

#[derive(Debug)]
pub enum VehicleCommand {
    Book {
        rider: Arc<Rider>,
        reply: oneshot::Sender<bool>,
    },
    CancelBook {
        rider: Arc<Rider>,
        reply: oneshot::Sender<bool>,
    },
    StartTrip {
        rider: Arc<Rider>,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<VehicleSnapshot>,
    },
}

/// Cloneable address of a running vehicle actor.
#[derive(Debug, Clone)]
pub struct VehicleHandle {
    id: VehicleId,
    flags: Arc<VehicleFlags>,
    commands: mpsc::Sender<VehicleCommand>,
}

impl VehicleHandle {
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// Lock-free view of the actor's availability flags. May be stale by the
    /// time a request reaches the actor.
    pub fn flags(&self) -> &VehicleFlags {
        &self.flags
    }

    pub fn is_available(&self) -> bool {
        self.flags.is_available()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> VehicleCommand,
    ) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.commands.send(make(reply)).await.ok()?;
        response.await.ok()
    }

    /// Returns false if the vehicle is taken, out of service or stopped.
    pub async fn book(&self, rider: Arc<Rider>) -> bool {
        self.request(|reply| VehicleCommand::Book { rider, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn cancel_book(&self, rider: Arc<Rider>) -> bool {
        self.request(|reply| VehicleCommand::CancelBook { rider, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn start_trip(&self, rider: Arc<Rider>) -> bool {
        self.request(|reply| VehicleCommand::StartTrip { rider, reply })
            .await
            .unwrap_or(false)
    }

    /// `None` once the actor has stopped.
    pub async fn snapshot(&self) -> Option<VehicleSnapshot> {
        self.request(|reply| VehicleCommand::Snapshot { reply }).await
    }
}

pub struct VehicleActor {
    vehicle: Vehicle,
    env: VehicleEnv,
    clock: SimClock,
    emitter: EventEmitter,
    commands: mpsc::Receiver<VehicleCommand>,
    rng: StdRng,
    cancel: CancellationToken,
}

impl VehicleActor {
    pub fn new(
        vehicle: Vehicle,
        env: VehicleEnv,
        clock: SimClock,
        emitter: EventEmitter,
        rng: StdRng,
        cancel: CancellationToken,
    ) -> (Self, VehicleHandle) {
        let (tx, rx) = mpsc::channel(env.config.command_buffer.max(1));
        let handle = VehicleHandle {
            id: vehicle.id(),
            flags: vehicle.flags(),
            commands: tx,
        };
        let actor = Self {
            vehicle,
            env,
            clock,
            emitter,
            commands: rx,
            rng,
            cancel,
        };
        (actor, handle)
    }

    /// Runs the actor on its own task; the task yields the final vehicle
    /// state after cancellation.
    pub fn spawn(self) -> JoinHandle<Vehicle> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> Vehicle {
        let tick = self.env.config.tick().max(Duration::from_millis(1));
        let jitter_max = self.env.config.start_jitter_max_ms;
        let jitter = if jitter_max > 0 {
            Duration::from_millis(self.rng.gen_range(0..=jitter_max))
        } else {
            Duration::ZERO
        };
        let mut ticker = interval_at(Instant::now() + jitter + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(vehicle_id = self.vehicle.id(), ?jitter, "vehicle actor started");
        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.handle(command).await,
                    None => commands_open = false,
                },
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    self.vehicle.tick(now, &self.env, &mut self.rng);
                    self.flush().await;
                }
            }
        }
        debug!(vehicle_id = self.vehicle.id(), "vehicle actor stopped");
        self.vehicle
    }

    async fn handle(&mut self, command: VehicleCommand) {
        let now = self.clock.now();
        match command {
            VehicleCommand::Book { rider, reply } => {
                let booked = self.vehicle.book(&rider, now, &self.env);
                self.flush().await;
                let _ = reply.send(booked);
            }
            VehicleCommand::CancelBook { rider, reply } => {
                let cancelled = self.vehicle.cancel_book(&rider, now);
                self.flush().await;
                let _ = reply.send(cancelled);
            }
            VehicleCommand::StartTrip { rider, reply } => {
                let started = self
                    .vehicle
                    .start_trip(&rider, now, &self.env, &mut self.rng);
                self.flush().await;
                let _ = reply.send(started);
            }
            VehicleCommand::Snapshot { reply } => {
                let _ = reply.send(self.vehicle.snapshot());
            }
        }
    }

    async fn flush(&mut self) {
        for event in self.vehicle.take_events() {
            self.emitter.emit(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::event_channels;
    use crate::test_helpers::{test_env, test_time, TEST_ORIGIN};
    use chrono::TimeDelta;
    use rand::SeedableRng;

    fn start_actor(in_service: bool) -> (VehicleHandle, JoinHandle<Vehicle>, CancellationToken) {
        let (emitter, bus) = event_channels(8);
        let _ = bus.spawn();
        let cancel = CancellationToken::new();
        let (actor, handle) = VehicleActor::new(
            Vehicle::new(7, in_service, TEST_ORIGIN, 70.0, 10.0),
            test_env(),
            SimClock::new(),
            emitter,
            StdRng::seed_from_u64(7),
            cancel.clone(),
        );
        (handle, actor.spawn(), cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn serves_requests_and_returns_state_on_cancel() {
        let (handle, task, cancel) = start_actor(true);
        let rider = Arc::new(Rider::new(1));

        assert!(handle.book(Arc::clone(&rider)).await);
        assert!(handle.flags().booked());
        assert!(!handle.is_available());

        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.id, 7);
        assert!(snapshot.booked);

        cancel.cancel();
        let vehicle = task.await.expect("actor task");
        assert!(vehicle.booked());
        assert!(handle.snapshot().await.is_none(), "stopped actor does not answer");
        assert!(!handle.book(rider).await);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_for_start_jitter() {
        let (emitter, mut bus) = event_channels(8);
        let mut statuses = bus.subscribe_status();
        let _ = bus.spawn();
        let mut env = test_env();
        env.config.start_jitter_max_ms = 5_000;
        // The actor draws its jitter first from the same seeded stream.
        let jitter_ms = StdRng::seed_from_u64(7).gen_range(0..=5_000u64);

        let cancel = CancellationToken::new();
        let (actor, _handle) = VehicleActor::new(
            Vehicle::new(7, true, TEST_ORIGIN, 70.0, 10.0),
            env,
            SimClock::anchored_at(test_time()),
            emitter,
            StdRng::seed_from_u64(7),
            cancel.clone(),
        );
        let task = actor.spawn();

        let mut times = Vec::new();
        for _ in 0..3 {
            times.push(statuses.recv().await.expect("status").time);
        }
        let first_tick =
            test_time() + TimeDelta::milliseconds(jitter_ms as i64) + TimeDelta::seconds(1);
        assert_eq!(times[0], first_tick);
        assert_eq!(times[1] - times[0], TimeDelta::seconds(1));
        assert_eq!(times[2] - times[1], TimeDelta::seconds(1));

        cancel.cancel();
        task.await.expect("actor task");
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_service_actor_rejects_bookings() {
        let (handle, _task, cancel) = start_actor(false);
        assert!(!handle.is_available());
        assert!(!handle.book(Arc::new(Rider::new(1))).await);
        cancel.cancel();
    }
}
