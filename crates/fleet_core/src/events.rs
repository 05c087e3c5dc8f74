//! Flat event records handed to downstream sinks.
//!
//! Field names are the wire names; timestamps serialize as RFC 3339 UTC.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::booking::{Booking, BookingAction};
use crate::ids::{BookingId, RiderId, TripId, VehicleId};
use crate::trip::{PayType, Trip};

pub const TOPIC_CAR_LIVE_DATA: &str = "car_live_data";
pub const TOPIC_TRIPS: &str = "trips";
pub const TOPIC_BOOKINGS: &str = "bookings";

/// Periodic vehicle status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarLiveData {
    pub cid: VehicleId,
    pub in_use: bool,
    pub longitude: f64,
    pub latitude: f64,
    pub speed_kmh: i64,
    pub gas_percent: f64,
    pub total_km: f64,
    pub locked: bool,
    pub time: DateTime<Utc>,
}

/// Closed trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripEvent {
    pub tid: TripId,
    pub bid: BookingId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_lon: f64,
    pub start_lat: f64,
    pub end_lon: f64,
    pub end_lat: f64,
    pub distance: f64,
    pub amount: f64,
    pub pay_type: PayType,
}

impl TripEvent {
    /// `None` while the trip is still running.
    pub fn from_trip(trip: &Trip) -> Option<Self> {
        let end = trip.end()?;
        Some(Self {
            tid: trip.id,
            bid: trip.booking_id,
            start_time: trip.start_time,
            end_time: end.time,
            start_lon: trip.start_position.lng,
            start_lat: trip.start_position.lat,
            end_lon: end.position.lng,
            end_lat: end.position.lat,
            distance: end.distance_km,
            amount: end.amount,
            pay_type: trip.pay_type,
        })
    }
}

/// Booking lifecycle change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingEvent {
    pub bid: BookingId,
    pub uid: RiderId,
    pub cid: VehicleId,
    pub time: DateTime<Utc>,
    pub booking_time: DateTime<Utc>,
    pub expire: DateTime<Utc>,
    pub action: BookingAction,
}

impl BookingEvent {
    pub fn from_booking(booking: &Booking, time: DateTime<Utc>) -> Self {
        Self {
            bid: booking.id,
            uid: booking.rider_id,
            cid: booking.vehicle_id,
            time,
            booking_time: booking.created_at,
            expire: booking.expires_at,
            action: booking.action(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FleetEvent {
    Status(CarLiveData),
    Trip(TripEvent),
    Booking(BookingEvent),
}

impl FleetEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            FleetEvent::Status(_) => TOPIC_CAR_LIVE_DATA,
            FleetEvent::Trip(_) => TOPIC_TRIPS,
            FleetEvent::Booking(_) => TOPIC_BOOKINGS,
        }
    }
}
