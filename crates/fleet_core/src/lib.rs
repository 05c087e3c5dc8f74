pub mod actor;
pub mod booking;
pub mod clock;
pub mod controller;
pub mod emitter;
pub mod error;
pub mod events;
pub mod ids;
pub mod pricing;
pub mod rider;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod track;
pub mod trip;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
