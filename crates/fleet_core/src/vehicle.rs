//! Vehicle state machine: bookings, trips, motion and fuel for one car.
//!
//! A [`Vehicle`] is plain data mutated through the transition methods below;
//! the actor in [`crate::actor`] owns it exclusively, so transitions never
//! interleave for one vehicle. Events produced by a transition are queued in
//! an outbox and drained by the owner with [`Vehicle::take_events`].
//!
//! States cycle `Idle -> Booked -> InTrip -> Idle`; a booking can also fall
//! back from `Booked` to `Idle` through cancel or expiry.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::booking::Booking;
use crate::events::{BookingEvent, CarLiveData, FleetEvent, TripEvent};
use crate::ids::{IdGenerator, VehicleId};
use crate::pricing::PricingConfig;
use crate::rider::Rider;
use crate::routing::RouteStore;
use crate::scenario::{SimulationParams, VehicleConfig};
use crate::spatial::LatLng;
use crate::track::Track;
use crate::trip::{PayType, Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Idle,
    Booked,
    InTrip,
}

/// Availability flags mirrored out of the owning actor so the fleet
/// controller can scan vehicles without messaging them.
///
/// `booked` is raised before `in_use` and `in_use` is cleared before
/// `booked`, so any observer sees `in_use => booked`.
#[derive(Debug)]
pub struct VehicleFlags {
    in_service: bool,
    booked: AtomicBool,
    in_use: AtomicBool,
}

impl VehicleFlags {
    fn new(in_service: bool) -> Self {
        Self {
            in_service,
            booked: AtomicBool::new(false),
            in_use: AtomicBool::new(false),
        }
    }

    pub fn in_service(&self) -> bool {
        self.in_service
    }

    pub fn booked(&self) -> bool {
        self.booked.load(Ordering::Acquire)
    }

    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Eligible for a new booking as far as an unsynchronised read can tell.
    pub fn is_available(&self) -> bool {
        self.in_service && !self.in_use() && !self.booked()
    }
}

/// Shared, read-only context every vehicle of a fleet needs.
#[derive(Debug, Clone)]
pub struct VehicleEnv {
    pub routes: Arc<RouteStore>,
    pub ids: Arc<IdGenerator>,
    pub config: VehicleConfig,
    pub booking_ttl: TimeDelta,
    pub pricing: PricingConfig,
}

impl VehicleEnv {
    pub fn from_params(
        params: &SimulationParams,
        routes: Arc<RouteStore>,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self {
            routes,
            ids,
            config: params.vehicle,
            booking_ttl: params.booking.ttl(),
            pricing: params.pricing,
        }
    }
}

/// Point-in-time copy of a vehicle, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub state: VehicleState,
    pub position: LatLng,
    pub speed_kmh: f64,
    pub odometer_km: f64,
    pub fuel_pct: f64,
    pub locked: bool,
    pub in_service: bool,
    pub in_use: bool,
    pub booked: bool,
    /// Current or most recent booking.
    pub booking: Option<Booking>,
    /// Current or most recent trip.
    pub trip: Option<Trip>,
}

#[derive(Debug)]
pub struct Vehicle {
    id: VehicleId,
    position: LatLng,
    speed_kmh: f64,
    odometer_km: f64,
    fuel_pct: f64,
    locked: bool,
    in_use: bool,
    booked: bool,
    booking: Option<Booking>,
    trip: Option<Trip>,
    track: Option<Track>,
    rider: Option<Arc<Rider>>,
    idle_ticks: u64,
    flags: Arc<VehicleFlags>,
    outbox: Vec<FleetEvent>,
}

impl Vehicle {
    /// A parked, locked vehicle.
    pub fn new(
        id: VehicleId,
        in_service: bool,
        position: LatLng,
        fuel_pct: f64,
        odometer_km: f64,
    ) -> Self {
        Self {
            id,
            position,
            speed_kmh: 0.0,
            odometer_km,
            fuel_pct: fuel_pct.clamp(0.0, 100.0),
            locked: true,
            in_use: false,
            booked: false,
            booking: None,
            trip: None,
            track: None,
            rider: None,
            idle_ticks: 0,
            flags: Arc::new(VehicleFlags::new(in_service)),
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn flags(&self) -> Arc<VehicleFlags> {
        Arc::clone(&self.flags)
    }

    pub fn state(&self) -> VehicleState {
        if self.in_use {
            VehicleState::InTrip
        } else if self.booked {
            VehicleState::Booked
        } else {
            VehicleState::Idle
        }
    }

    pub fn in_service(&self) -> bool {
        self.flags.in_service
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn booked(&self) -> bool {
        self.booked
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn odometer_km(&self) -> f64 {
        self.odometer_km
    }

    pub fn fuel_pct(&self) -> f64 {
        self.fuel_pct
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn booking(&self) -> Option<&Booking> {
        self.booking.as_ref()
    }

    pub fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    pub fn take_events(&mut self) -> Vec<FleetEvent> {
        mem::take(&mut self.outbox)
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            state: self.state(),
            position: self.position,
            speed_kmh: self.speed_kmh,
            odometer_km: self.odometer_km,
            fuel_pct: self.fuel_pct,
            locked: self.locked,
            in_service: self.flags.in_service,
            in_use: self.in_use,
            booked: self.booked,
            booking: self.booking.clone(),
            trip: self.trip.clone(),
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> CarLiveData {
        CarLiveData {
            cid: self.id,
            in_use: self.in_use,
            longitude: self.position.lng,
            latitude: self.position.lat,
            speed_kmh: self.speed_kmh.round() as i64,
            gas_percent: self.fuel_pct,
            total_km: self.odometer_km,
            locked: self.locked,
            time: now,
        }
    }

    fn set_booked(&mut self, booked: bool) {
        self.booked = booked;
        self.flags.booked.store(booked, Ordering::Release);
    }

    fn set_in_use(&mut self, in_use: bool) {
        self.in_use = in_use;
        self.flags.in_use.store(in_use, Ordering::Release);
    }

    fn emit_booking(&mut self, now: DateTime<Utc>) {
        if let Some(booking) = &self.booking {
            let event = BookingEvent::from_booking(booking, now);
            self.outbox.push(FleetEvent::Booking(event));
        }
    }

    /// Active booking held by `rider`, if any.
    fn booking_for(&self, rider: &Rider) -> Option<&Booking> {
        self.booking
            .as_ref()
            .filter(|b| self.booked && b.is_active() && b.rider_id == rider.id())
    }

    /// Reserves the vehicle for `rider`. Fails without side effects when the
    /// vehicle is out of service, already booked or on a trip.
    pub fn book(&mut self, rider: &Arc<Rider>, now: DateTime<Utc>, env: &VehicleEnv) -> bool {
        if !self.flags.in_service {
            debug!(vehicle_id = self.id, rider_id = rider.id(), "book rejected: out of service");
            return false;
        }
        if self.booked || self.in_use {
            debug!(vehicle_id = self.id, rider_id = rider.id(), "book rejected: vehicle taken");
            return false;
        }

        let booking = Booking::new(
            env.ids.next_booking_id(),
            self.id,
            rider.id(),
            now,
            env.booking_ttl,
        );
        debug!(vehicle_id = self.id, rider_id = rider.id(), booking_id = booking.id, "booked");
        self.booking = Some(booking);
        self.set_booked(true);
        rider.mark_in_trip();
        self.rider = Some(Arc::clone(rider));
        self.emit_booking(now);
        true
    }

    /// Rider-initiated cancellation. A rider without a matching active booking
    /// is ignored; a booking past its expiry is expired instead.
    pub fn cancel_book(&mut self, rider: &Rider, now: DateTime<Utc>) -> bool {
        self.expire_book(now);
        if self.in_use || self.booking_for(rider).is_none() {
            debug!(vehicle_id = self.id, rider_id = rider.id(), "cancel ignored: no matching booking");
            return false;
        }
        let Some(booking) = self.booking.as_mut() else {
            return false;
        };
        if let Err(err) = booking.cancel() {
            warn!(vehicle_id = self.id, %err, "cancel ignored");
            return false;
        }
        debug!(vehicle_id = self.id, rider_id = rider.id(), booking_id = booking.id, "booking cancelled");
        self.set_booked(false);
        self.rider = None;
        rider.release();
        self.emit_booking(now);
        true
    }

    /// Expires the active booking once its TTL has passed. Driven by the
    /// vehicle clock, so the rider's `in_trip` flag is left alone.
    pub fn expire_book(&mut self, now: DateTime<Utc>) -> bool {
        if !self.booked || self.in_use {
            return false;
        }
        let Some(booking) = self.booking.as_mut() else {
            return false;
        };
        if !booking.is_active() || !booking.is_expired_at(now) {
            return false;
        }
        if let Err(err) = booking.expire() {
            warn!(vehicle_id = self.id, %err, "expire ignored");
            return false;
        }
        info!(vehicle_id = self.id, booking_id = booking.id, rider_id = booking.rider_id, "booking expired");
        self.set_booked(false);
        self.rider = None;
        self.emit_booking(now);
        true
    }

    /// Starts the trip for the rider holding the active booking: the booking
    /// is served, the car unlocked and a random route attached. A booking past
    /// its expiry is expired here and never served.
    pub fn start_trip<R: Rng + ?Sized>(
        &mut self,
        rider: &Rider,
        now: DateTime<Utc>,
        env: &VehicleEnv,
        rng: &mut R,
    ) -> bool {
        self.expire_book(now);
        if self.in_use || self.booking_for(rider).is_none() {
            warn!(vehicle_id = self.id, rider_id = rider.id(), "start trip ignored: no matching booking");
            return false;
        }
        let Some(booking) = self.booking.as_mut() else {
            return false;
        };
        if let Err(err) = booking.serve() {
            warn!(vehicle_id = self.id, %err, "start trip ignored");
            return false;
        }
        let booking_id = booking.id;
        self.emit_booking(now);

        let route = env.routes.pick(rng);
        self.position = route.origin();
        self.track = Some(Track::new(route));
        let trip = Trip::start(
            env.ids.next_trip_id(),
            booking_id,
            self.position,
            now,
            self.odometer_km,
            PayType::random(rng),
        );
        info!(vehicle_id = self.id, rider_id = rider.id(), booking_id, trip_id = trip.id, "trip started");
        self.trip = Some(trip);
        self.set_in_use(true);
        self.locked = false;
        self.idle_ticks = 0;
        true
    }

    /// One driving tick: advance along the track, account distance and fuel,
    /// and close the trip when the route is done.
    pub fn run<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, env: &VehicleEnv, rng: &mut R) {
        if !self.in_use {
            return;
        }
        let Some(track) = self.track.as_mut() else {
            return;
        };
        let step = track.advance(env.config.tick());
        let km = step.distance_m / 1000.0;

        self.speed_kmh = step.speed_kmh;
        self.odometer_km += km;
        self.position = step.position;
        self.fuel_pct = (self.fuel_pct - km * env.config.fuel.consumption_pct_per_km).max(0.0);
        if self.fuel_pct < env.config.fuel.refill_threshold_pct {
            self.refill(env, rng);
        }

        if step.finished {
            self.stop_trip(now, env);
        }
    }

    fn refill<R: Rng + ?Sized>(&mut self, env: &VehicleEnv, rng: &mut R) {
        let before = self.fuel_pct;
        self.fuel_pct = rng.gen_range(env.config.fuel.refill_min_pct..=100.0);
        debug!(vehicle_id = self.id, before, after = self.fuel_pct, "refilled");
    }

    /// Ends the running trip: releases the rider, locks the car and emits the
    /// closed trip.
    pub fn stop_trip(&mut self, now: DateTime<Utc>, env: &VehicleEnv) -> bool {
        if !self.in_use {
            return false;
        }
        self.set_in_use(false);
        self.set_booked(false);
        self.locked = true;
        self.speed_kmh = 0.0;
        self.track = None;
        if let Some(rider) = self.rider.take() {
            rider.release();
        }

        let position = self.position;
        let odometer = self.odometer_km;
        if let Some(trip) = self.trip.as_mut() {
            trip.close(position, now, odometer, &env.pricing);
            if let Some(event) = TripEvent::from_trip(trip) {
                info!(
                    vehicle_id = self.id,
                    trip_id = event.tid,
                    distance_km = event.distance,
                    amount = event.amount,
                    "trip completed"
                );
                self.outbox.push(FleetEvent::Trip(event));
            }
        }
        true
    }

    /// One iteration of the vehicle loop. Driving vehicles report every tick;
    /// idle vehicles check booking expiry and report every
    /// `idle_report_every` ticks.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, env: &VehicleEnv, rng: &mut R) {
        if self.in_use {
            self.run(now, env, rng);
            self.outbox.push(FleetEvent::Status(self.status(now)));
            return;
        }

        self.idle_ticks += 1;
        self.expire_book(now);
        if self.idle_ticks % env.config.idle_report_every.max(1) == 0 {
            self.outbox.push(FleetEvent::Status(self.status(now)));
        }
    }
}
