//! Riders and the rider pool.
//!
//! A rider's only mutable state is its `in_trip` flag, shared between the
//! fleet controller (claims) and vehicle actors (book / stop trip).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ids::RiderId;

#[derive(Debug)]
pub struct Rider {
    id: RiderId,
    in_trip: AtomicBool,
}

impl Rider {
    pub fn new(id: RiderId) -> Self {
        Self {
            id,
            in_trip: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> RiderId {
        self.id
    }

    pub fn in_trip(&self) -> bool {
        self.in_trip.load(Ordering::Acquire)
    }

    /// Atomically flips `in_trip` from false to true. Returns false when the
    /// rider was already taken, so two matchers can never claim the same rider.
    pub fn try_claim(&self) -> bool {
        self.in_trip
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn mark_in_trip(&self) {
        self.in_trip.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.in_trip.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiderPool {
    riders: Vec<Arc<Rider>>,
}

impl RiderPool {
    /// Pool of `count` riders with ids `1..=count`.
    pub fn with_count(count: usize) -> Self {
        Self {
            riders: (1..=count as RiderId).map(|id| Arc::new(Rider::new(id))).collect(),
        }
    }

    pub fn from_riders(riders: Vec<Arc<Rider>>) -> Self {
        Self { riders }
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rider>> {
        self.riders.iter()
    }

    pub fn get(&self, id: RiderId) -> Option<Arc<Rider>> {
        self.riders.iter().find(|r| r.id() == id).cloned()
    }

    /// First rider not currently in a trip. Pool order, no fairness.
    pub fn first_available(&self) -> Option<Arc<Rider>> {
        self.riders.iter().find(|r| !r.in_trip()).cloned()
    }

    pub fn in_trip_count(&self) -> usize {
        self.riders.iter().filter(|r| r.in_trip()).count()
    }
}
