use std::sync::atomic::{AtomicU64, Ordering};

pub type VehicleId = u64;
pub type RiderId = u64;
pub type BookingId = u64;
pub type TripId = u64;

/// Hands out booking and trip identifiers. Shared by every vehicle of a fleet
/// through an `Arc`; ids start at 1 and are never reused within a process.
#[derive(Debug)]
pub struct IdGenerator {
    next_booking: AtomicU64,
    next_trip: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next_booking: AtomicU64::new(first),
            next_trip: AtomicU64::new(first),
        }
    }

    pub fn next_booking_id(&self) -> BookingId {
        self.next_booking.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_trip_id(&self) -> TripId {
        self.next_trip.fetch_add(1, Ordering::Relaxed)
    }
}
