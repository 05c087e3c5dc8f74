//! Error types for the fleet simulation core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced while setting up a simulation. Runtime races between
/// riders and vehicles are not errors; they are reported as `false` results.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("failed to read route file {}: {source}", .path.display())]
    RouteIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse route file {}: {source}", .path.display())]
    RouteParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("route store is empty")]
    EmptyRouteStore,

    #[error("invalid route #{index}: {reason}")]
    InvalidRoute { index: usize, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Illegal transition attempted on a booking that already reached a terminal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("booking {booking_id} is already {from}, cannot move to {to}")]
pub struct BookingTransitionError {
    pub booking_id: u64,
    pub from: crate::booking::BookingAction,
    pub to: crate::booking::BookingAction,
}
