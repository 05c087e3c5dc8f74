//! Spatial helpers: coordinates, haversine distance and polyline interpolation.
//!
//! Routes are plain lat/lng polylines; no geographic index is needed because
//! vehicles only ever move along the route they were handed.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point from a routing-engine `[lng, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lng: pair[0],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance in kilometres.
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn lerp(a: LatLng, b: LatLng, t: f64) -> LatLng {
    let t = t.clamp(0.0, 1.0);
    LatLng {
        lat: a.lat + (b.lat - a.lat) * t,
        lng: a.lng + (b.lng - a.lng) * t,
    }
}

/// Point located at `fraction` (0..=1) of the polyline's geometric length.
///
/// Degenerate polylines (single point or zero length) return their first point.
pub fn point_along(points: &[LatLng], fraction: f64) -> Option<LatLng> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(first);
    }
    if fraction >= 1.0 {
        return points.last().copied();
    }

    let lengths: Vec<f64> = points
        .windows(2)
        .map(|pair| distance_km(pair[0], pair[1]))
        .collect();
    let total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        return Some(first);
    }

    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for (i, len) in lengths.iter().enumerate() {
        if remaining <= *len {
            let t = if *len > 0.0 { remaining / len } else { 0.0 };
            return Some(lerp(points[i], points[i + 1], t));
        }
        remaining -= len;
    }
    points.last().copied()
}
