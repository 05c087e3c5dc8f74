//! Track: a progress cursor over one route, owned by a vehicle for one trip.
//!
//! Motion is piecewise constant: each segment is driven at its own
//! distance/duration ratio. Time left over after a segment is exhausted carries
//! into the next one, so a single long tick can cross several segments.

use std::sync::Arc;
use std::time::Duration;

use crate::routing::Route;
use crate::spatial::{point_along, LatLng};

/// Outcome of advancing a track by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackStep {
    pub distance_m: f64,
    pub speed_kmh: f64,
    pub position: LatLng,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Track {
    route: Arc<Route>,
    segment: usize,
    segment_progress_m: f64,
    travelled_m: f64,
    finished: bool,
}

impl Track {
    pub fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            segment: 0,
            segment_progress_m: 0.0,
            travelled_m: 0.0,
            finished: false,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn travelled_m(&self) -> f64 {
        self.travelled_m
    }

    pub fn position(&self) -> LatLng {
        let segment = &self.route.segments()[self.segment];
        let fraction = self.segment_progress_m / segment.distance_m;
        point_along(&segment.points, fraction).unwrap_or_else(|| self.route.origin())
    }

    pub fn advance(&mut self, dt: Duration) -> TrackStep {
        let mut remaining_s = dt.as_secs_f64();
        let mut distance_m = 0.0;
        let mut speed_mps = 0.0;
        let segment_count = self.route.segments().len();

        while remaining_s > 0.0 && !self.finished {
            let (segment_distance, segment_speed) = {
                let segment = &self.route.segments()[self.segment];
                (segment.distance_m, segment.speed_mps())
            };
            speed_mps = segment_speed;

            let left_m = segment_distance - self.segment_progress_m;
            let step_m = segment_speed * remaining_s;
            if step_m < left_m {
                self.segment_progress_m += step_m;
                distance_m += step_m;
                remaining_s = 0.0;
            } else {
                distance_m += left_m;
                remaining_s -= left_m / segment_speed;
                if self.segment + 1 < segment_count {
                    self.segment += 1;
                    self.segment_progress_m = 0.0;
                } else {
                    self.segment_progress_m = segment_distance;
                    self.finished = true;
                }
            }
        }

        self.travelled_m += distance_m;
        TrackStep {
            distance_m,
            speed_kmh: speed_mps * 3.6,
            position: self.position(),
            finished: self.finished,
        }
    }
}
