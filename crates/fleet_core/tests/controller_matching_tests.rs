mod support;

use std::time::Duration;

use fleet_core::booking::BookingAction;
use fleet_core::controller::MatchOutcome;
use fleet_core::scenario::SimulationParams;
use fleet_core::test_helpers::test_params;
use support::fleet::{parked_vehicle, TestFleet};

fn params_with(instant: f64, cancel: f64, wait_ms: u64) -> SimulationParams {
    let mut params = test_params();
    params.controller.instant_trip_probability = instant;
    params.controller.cancel_probability = cancel;
    params.controller.min_wait_ms = wait_ms;
    params.controller.max_wait_ms = wait_ms;
    params
}

#[tokio::test(start_paused = true)]
async fn no_rider_when_pool_is_empty() {
    let fleet = TestFleet::start(vec![parked_vehicle(1, true)], 0);
    let mut controller = fleet.controller(&params_with(1.0, 0.0, 0));
    assert_eq!(controller.match_once().await, MatchOutcome::NoRider);
    assert_eq!(controller.stats().skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn no_vehicle_when_fleet_is_out_of_service() {
    let fleet = TestFleet::start(vec![parked_vehicle(1, false), parked_vehicle(2, false)], 3);
    let mut controller = fleet.controller(&params_with(1.0, 0.0, 0));
    assert_eq!(controller.match_once().await, MatchOutcome::NoVehicle);
    assert_eq!(fleet.runtime.riders().in_trip_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn instant_trip_books_and_starts() {
    let mut fleet = TestFleet::start(vec![parked_vehicle(1, true)], 2);
    let mut controller = fleet.controller(&params_with(1.0, 0.0, 0));

    let outcome = controller.match_once().await;
    assert_eq!(
        outcome,
        MatchOutcome::InstantTrip {
            vehicle_id: 1,
            rider_id: 1,
            started: true
        }
    );
    assert!(fleet.rider(1).in_trip());
    assert!(!fleet.rider(2).in_trip());
    assert!(fleet.vehicle(1).flags().in_use());

    // The only vehicle is busy until the trip ends.
    assert_eq!(controller.match_once().await, MatchOutcome::NoVehicle);

    let trip = fleet.next_trip().await;
    assert!(trip.distance > 0.0);
    assert!(!fleet.rider(1).in_trip());
    assert_eq!(
        fleet.booking_actions(1),
        vec![BookingAction::Add, BookingAction::Service]
    );
    assert_eq!(controller.stats().instant_trips, 1);
}

#[tokio::test(start_paused = true)]
async fn waiting_rider_cancels_after_think_time() {
    let mut fleet = TestFleet::start(vec![parked_vehicle(1, true)], 1);
    let mut controller = fleet.controller(&params_with(0.0, 1.0, 5_000));

    let outcome = controller.match_once().await;
    assert_eq!(
        outcome,
        MatchOutcome::Waiting {
            vehicle_id: 1,
            rider_id: 1,
            delay: Duration::from_secs(5),
            will_cancel: true
        }
    );
    assert_eq!(controller.pending_waits(), 1);
    assert!(fleet.vehicle(1).flags().booked());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!fleet.rider(1).in_trip());
    assert!(fleet.vehicle(1).is_available());
    assert_eq!(
        fleet.booking_actions(1),
        vec![BookingAction::Add, BookingAction::Cancel]
    );
}

#[tokio::test(start_paused = true)]
async fn waiting_rider_starts_trip_after_think_time() {
    let mut fleet = TestFleet::start(vec![parked_vehicle(1, true)], 1);
    let mut controller = fleet.controller(&params_with(0.0, 0.0, 5_000));

    assert!(matches!(
        controller.match_once().await,
        MatchOutcome::Waiting {
            will_cancel: false,
            ..
        }
    ));
    assert!(!fleet.vehicle(1).flags().in_use());

    let trip = fleet.next_trip().await;
    assert!(trip.start_time < trip.end_time);
    assert!(!fleet.rider(1).in_trip());
    assert_eq!(
        fleet.booking_actions(1),
        vec![BookingAction::Add, BookingAction::Service]
    );
}

#[tokio::test(start_paused = true)]
async fn rider_is_released_when_booking_expires_first() {
    let mut fleet = TestFleet::start(vec![parked_vehicle(1, true)], 1);
    // Think time is twice the 60 s booking TTL.
    let mut controller = fleet.controller(&params_with(0.0, 0.0, 120_000));

    assert!(matches!(
        controller.match_once().await,
        MatchOutcome::Waiting { .. }
    ));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!fleet.vehicle(1).flags().booked());
    assert!(fleet.rider(1).in_trip(), "rider still thinking");

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!fleet.rider(1).in_trip(), "late start releases the rider");
    assert!(fleet.vehicle(1).is_available());
    assert_eq!(
        fleet.booking_actions(1),
        vec![BookingAction::Add, BookingAction::Expire]
    );
}

#[tokio::test(start_paused = true)]
async fn racing_controllers_book_a_vehicle_once() {
    let fleet = TestFleet::start(vec![parked_vehicle(1, true)], 2);
    let params = params_with(1.0, 0.0, 0);
    let mut first = fleet.controller(&params);
    let mut second = fleet.controller(&params);

    // Both scans run before the actor answers, so both reach `book`.
    let (a, b) = tokio::join!(first.match_once(), second.match_once());
    assert_eq!(
        a,
        MatchOutcome::InstantTrip {
            vehicle_id: 1,
            rider_id: 1,
            started: true
        }
    );
    assert_eq!(
        b,
        MatchOutcome::BookFailed {
            vehicle_id: 1,
            rider_id: 2
        }
    );
    assert_eq!(second.stats().book_failures, 1);
    assert!(fleet.rider(1).in_trip());
    assert!(!fleet.rider(2).in_trip(), "losing claim is released");
}

#[tokio::test(start_paused = true)]
async fn spawned_controller_stops_on_cancel() {
    let fleet = TestFleet::start(vec![parked_vehicle(1, true)], 1);
    let controller = fleet.controller(&params_with(0.0, 0.0, 600_000));
    let token = fleet.runtime.cancellation_token();
    let task = controller.spawn();

    tokio::time::sleep(Duration::from_secs(3)).await;
    token.cancel();
    let stats = task.await.expect("controller task");
    assert_eq!(stats.deferred_bookings, 1);
    assert!(stats.polls >= 3);
    assert_eq!(stats.skipped, stats.polls - 1);
}
