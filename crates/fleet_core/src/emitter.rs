//! Event plumbing between vehicle actors and downstream sinks.
//!
//! Vehicles push onto three bounded category channels and await each send, so
//! a stalled distributor back-pressures the emitting vehicle. One distributor
//! task per category clones every event into each subscriber's unbounded
//! queue; a slow subscriber only grows its own queue.
//!
//! Distributors stop once every [`EventEmitter`] clone has been dropped and
//! the category channel is drained.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::{
    BookingEvent, CarLiveData, FleetEvent, TripEvent, TOPIC_BOOKINGS, TOPIC_CAR_LIVE_DATA,
    TOPIC_TRIPS,
};

/// Cloneable sending side handed to every vehicle actor.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    status: mpsc::Sender<CarLiveData>,
    trips: mpsc::Sender<TripEvent>,
    bookings: mpsc::Sender<BookingEvent>,
}

impl EventEmitter {
    /// Returns false when the category channel is already closed.
    pub async fn emit(&self, event: FleetEvent) -> bool {
        let topic = event.topic();
        let delivered = match event {
            FleetEvent::Status(e) => self.status.send(e).await.is_ok(),
            FleetEvent::Trip(e) => self.trips.send(e).await.is_ok(),
            FleetEvent::Booking(e) => self.bookings.send(e).await.is_ok(),
        };
        if !delivered {
            debug!(topic, "event channel closed, dropping event");
        }
        delivered
    }
}

/// Receiving ends for one subscriber across all three categories.
#[derive(Debug)]
pub struct Subscription {
    pub status: mpsc::UnboundedReceiver<CarLiveData>,
    pub trips: mpsc::UnboundedReceiver<TripEvent>,
    pub bookings: mpsc::UnboundedReceiver<BookingEvent>,
}

/// Receiving side of the category channels plus registered subscribers.
/// Subscribe before calling [`EventBus::spawn`].
#[derive(Debug)]
pub struct EventBus {
    status_rx: mpsc::Receiver<CarLiveData>,
    trips_rx: mpsc::Receiver<TripEvent>,
    bookings_rx: mpsc::Receiver<BookingEvent>,
    status_subscribers: Vec<mpsc::UnboundedSender<CarLiveData>>,
    trip_subscribers: Vec<mpsc::UnboundedSender<TripEvent>>,
    booking_subscribers: Vec<mpsc::UnboundedSender<BookingEvent>>,
}

/// Creates the emitter/bus pair. `capacity` is clamped to at least 1.
pub fn event_channels(capacity: usize) -> (EventEmitter, EventBus) {
    let capacity = capacity.max(1);
    let (status_tx, status_rx) = mpsc::channel(capacity);
    let (trips_tx, trips_rx) = mpsc::channel(capacity);
    let (bookings_tx, bookings_rx) = mpsc::channel(capacity);
    (
        EventEmitter {
            status: status_tx,
            trips: trips_tx,
            bookings: bookings_tx,
        },
        EventBus {
            status_rx,
            trips_rx,
            bookings_rx,
            status_subscribers: Vec::new(),
            trip_subscribers: Vec::new(),
            booking_subscribers: Vec::new(),
        },
    )
}

impl EventBus {
    pub fn subscribe_status(&mut self) -> mpsc::UnboundedReceiver<CarLiveData> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.status_subscribers.push(tx);
        rx
    }

    pub fn subscribe_trips(&mut self) -> mpsc::UnboundedReceiver<TripEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.trip_subscribers.push(tx);
        rx
    }

    pub fn subscribe_bookings(&mut self) -> mpsc::UnboundedReceiver<BookingEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.booking_subscribers.push(tx);
        rx
    }

    pub fn subscribe(&mut self) -> Subscription {
        Subscription {
            status: self.subscribe_status(),
            trips: self.subscribe_trips(),
            bookings: self.subscribe_bookings(),
        }
    }

    /// Starts one distributor task per category.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(distribute(
                TOPIC_CAR_LIVE_DATA,
                self.status_rx,
                self.status_subscribers,
            )),
            tokio::spawn(distribute(TOPIC_TRIPS, self.trips_rx, self.trip_subscribers)),
            tokio::spawn(distribute(
                TOPIC_BOOKINGS,
                self.bookings_rx,
                self.booking_subscribers,
            )),
        ]
    }
}

async fn distribute<T: Clone + Send + 'static>(
    topic: &'static str,
    mut rx: mpsc::Receiver<T>,
    mut subscribers: Vec<mpsc::UnboundedSender<T>>,
) {
    let mut forwarded: u64 = 0;
    while let Some(event) = rx.recv().await {
        subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
        forwarded += 1;
    }
    debug!(topic, forwarded, "distributor stopped");
}
