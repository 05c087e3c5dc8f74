//! Booking value object and its action transitions.
//!
//! A booking starts as `add` and moves exactly once to one of the terminal
//! actions `service`, `cancel` or `expire`.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::BookingTransitionError;
use crate::ids::{BookingId, RiderId, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Add,
    Service,
    Cancel,
    Expire,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Add => "add",
            BookingAction::Service => "service",
            BookingAction::Cancel => "cancel",
            BookingAction::Expire => "expire",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingAction::Add)
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub vehicle_id: VehicleId,
    pub rider_id: RiderId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    action: BookingAction,
}

impl Booking {
    pub fn new(
        id: BookingId,
        vehicle_id: VehicleId,
        rider_id: RiderId,
        created_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Self {
        Self {
            id,
            vehicle_id,
            rider_id,
            created_at,
            expires_at: created_at + ttl,
            action: BookingAction::Add,
        }
    }

    pub fn action(&self) -> BookingAction {
        self.action
    }

    /// Still waiting for the rider: neither served nor abandoned.
    pub fn is_active(&self) -> bool {
        self.action == BookingAction::Add
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn serve(&mut self) -> Result<(), BookingTransitionError> {
        self.transition(BookingAction::Service)
    }

    pub fn cancel(&mut self) -> Result<(), BookingTransitionError> {
        self.transition(BookingAction::Cancel)
    }

    pub fn expire(&mut self) -> Result<(), BookingTransitionError> {
        self.transition(BookingAction::Expire)
    }

    fn transition(&mut self, to: BookingAction) -> Result<(), BookingTransitionError> {
        if self.action.is_terminal() {
            return Err(BookingTransitionError {
                booking_id: self.id,
                from: self.action,
                to,
            });
        }
        self.action = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking() -> Booking {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("date");
        Booking::new(1, 10, 100, created, TimeDelta::minutes(15))
    }

    #[test]
    fn expiry_is_creation_plus_ttl() {
        let b = booking();
        assert_eq!(b.expires_at - b.created_at, TimeDelta::minutes(15));
        assert!(!b.is_expired_at(b.created_at + TimeDelta::minutes(14)));
        assert!(b.is_expired_at(b.expires_at));
    }

    #[test]
    fn terminal_actions_are_final() {
        let mut b = booking();
        assert!(b.is_active());
        b.expire().expect("add -> expire");
        assert_eq!(b.action(), BookingAction::Expire);

        let err = b.serve().expect_err("expire -> service must fail");
        assert_eq!(err.from, BookingAction::Expire);
        assert_eq!(err.to, BookingAction::Service);
        assert_eq!(b.action(), BookingAction::Expire);
        assert!(b.cancel().is_err());
    }

    #[test]
    fn service_is_terminal_too() {
        let mut b = booking();
        b.serve().expect("add -> service");
        assert!(!b.is_active());
        assert!(b.cancel().is_err());
    }

    #[test]
    fn action_serializes_lowercase() {
        let json = serde_json::to_string(&BookingAction::Service).expect("json");
        assert_eq!(json, "\"service\"");
    }
}
