//! Route store: pre-computed driving routes shared read-only by every vehicle.
//!
//! Routes are loaded once at startup from a JSON file holding a list of
//! routing-engine responses (OSRM `route` service shape). Each step of each leg
//! becomes one [`RouteSegment`] with its own distance, duration and polyline;
//! routes without steps collapse into a single segment spanning the route
//! geometry.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use crate::error::FleetError;
use crate::spatial::LatLng;

/// One piece of a route driven at a constant speed.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub distance_m: f64,
    pub duration_s: f64,
    pub points: Vec<LatLng>,
}

impl RouteSegment {
    pub fn new(distance_m: f64, duration_s: f64, points: Vec<LatLng>) -> Self {
        Self {
            distance_m,
            duration_s,
            points,
        }
    }

    /// Fixed speed of this segment in metres per second.
    pub fn speed_mps(&self) -> f64 {
        if self.duration_s > 0.0 {
            self.distance_m / self.duration_s
        } else {
            0.0
        }
    }

    fn is_drivable(&self) -> bool {
        self.distance_m > 0.0 && self.duration_s > 0.0
    }
}

/// Immutable driving route: an ordered list of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    segments: Vec<RouteSegment>,
    distance_m: f64,
    duration_s: f64,
}

impl Route {
    /// Builds a route, dropping segments that have no distance or no duration.
    pub fn from_segments(segments: Vec<RouteSegment>) -> Option<Self> {
        let segments: Vec<RouteSegment> = segments
            .into_iter()
            .filter(|s| s.is_drivable() && !s.points.is_empty())
            .collect();
        if segments.is_empty() {
            return None;
        }
        let distance_m = segments.iter().map(|s| s.distance_m).sum();
        let duration_s = segments.iter().map(|s| s.duration_s).sum();
        Some(Self {
            segments,
            distance_m,
            duration_s,
        })
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn origin(&self) -> LatLng {
        // Constructor guarantees a non-empty first segment.
        self.segments[0].points[0]
    }

    pub fn destination(&self) -> LatLng {
        let last = &self.segments[self.segments.len() - 1];
        last.points[last.points.len() - 1]
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<RouteDescription>,
}

#[derive(Debug, Deserialize)]
struct RouteDescription {
    distance: f64, // metres
    duration: f64, // seconds
    geometry: Geometry,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    distance: f64,
    duration: f64,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat]
}

impl Geometry {
    fn points(&self) -> Vec<LatLng> {
        self.coordinates
            .iter()
            .copied()
            .map(LatLng::from_lng_lat)
            .filter(LatLng::is_valid)
            .collect()
    }
}

impl RouteDescription {
    fn into_route(self) -> Option<Route> {
        let steps: Vec<RouteSegment> = self
            .legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .map(|step| RouteSegment::new(step.distance, step.duration, step.geometry.points()))
            .collect();

        Route::from_segments(steps).or_else(|| {
            Route::from_segments(vec![RouteSegment::new(
                self.distance,
                self.duration,
                self.geometry.points(),
            )])
        })
    }
}

/// Shared, read-only collection of routes. Never empty.
#[derive(Debug, Clone)]
pub struct RouteStore {
    routes: Vec<Arc<Route>>,
}

impl RouteStore {
    pub fn from_routes(routes: Vec<Route>) -> Result<Self, FleetError> {
        if routes.is_empty() {
            return Err(FleetError::EmptyRouteStore);
        }
        Ok(Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        })
    }

    /// Load routes from a JSON file containing a list of routing-engine responses.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FleetError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| FleetError::RouteIo {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json(&raw).map_err(|err| match err {
            FleetError::RouteParse { source, .. } => FleetError::RouteParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!(path = %path.display(), routes = store.len(), "loaded route store");
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self, FleetError> {
        let responses: Vec<RouteResponse> =
            serde_json::from_str(raw).map_err(|source| FleetError::RouteParse {
                path: Default::default(),
                source,
            })?;

        let mut routes = Vec::new();
        for (index, response) in responses.into_iter().enumerate() {
            if let Some(code) = response.code.as_deref() {
                if code != "Ok" {
                    return Err(FleetError::InvalidRoute {
                        index,
                        reason: format!("response code {code}"),
                    });
                }
            }
            for description in response.routes {
                let route = description.into_route().ok_or_else(|| FleetError::InvalidRoute {
                    index,
                    reason: "no drivable segment".to_string(),
                })?;
                routes.push(route);
            }
        }
        Self::from_routes(routes)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<Route>> {
        self.routes.get(index).cloned()
    }

    /// Draws one route uniformly at random, with replacement.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Arc<Route> {
        let index = rng.gen_range(0..self.routes.len());
        Arc::clone(&self.routes[index])
    }
}
