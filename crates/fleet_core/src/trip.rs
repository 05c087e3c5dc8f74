use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::ids::{BookingId, TripId};
use crate::pricing::{calculate_trip_fare, PricingConfig};
use crate::spatial::LatLng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayType {
    Card,
    Cash,
    Wallet,
}

impl PayType {
    pub const ALL: [PayType; 3] = [PayType::Card, PayType::Cash, PayType::Wallet];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// End-of-trip fields, populated once by [`Trip::close`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripEnd {
    pub position: LatLng,
    pub time: DateTime<Utc>,
    pub distance_km: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub booking_id: BookingId,
    pub start_position: LatLng,
    pub start_time: DateTime<Utc>,
    /// Odometer reading when the trip started; distance is measured against it.
    pub start_odometer_km: f64,
    pub pay_type: PayType,
    end: Option<TripEnd>,
}

impl Trip {
    pub fn start(
        id: TripId,
        booking_id: BookingId,
        position: LatLng,
        time: DateTime<Utc>,
        odometer_km: f64,
        pay_type: PayType,
    ) -> Self {
        Self {
            id,
            booking_id,
            start_position: position,
            start_time: time,
            start_odometer_km: odometer_km,
            pay_type,
            end: None,
        }
    }

    pub fn end(&self) -> Option<&TripEnd> {
        self.end.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }

    /// Populates the end fields and computes the fare. Closing twice keeps the
    /// first result.
    pub fn close(
        &mut self,
        position: LatLng,
        time: DateTime<Utc>,
        odometer_km: f64,
        pricing: &PricingConfig,
    ) -> &TripEnd {
        let start_time = self.start_time;
        let start_odometer = self.start_odometer_km;
        self.end.get_or_insert_with(|| TripEnd {
            position,
            time,
            distance_km: (odometer_km - start_odometer).max(0.0),
            amount: calculate_trip_fare(pricing, time - start_time),
        })
    }
}
