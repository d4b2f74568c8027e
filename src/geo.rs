use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside [-90, 90] x [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(TrackerError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<GeoPoint> for (f64, f64) {
    fn from(p: GeoPoint) -> Self {
        (p.latitude, p.longitude)
    }
}

/// Great-circle distance in meters between two points (haversine).
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h a hair outside [0, 1] near antipodes
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Anything that sits at a fixed point on the map.
pub trait Anchored {
    fn anchor(&self) -> GeoPoint;
}

impl Anchored for GeoPoint {
    fn anchor(&self) -> GeoPoint {
        *self
    }
}

/// The `k` candidates closest to `origin`, nearest first.
///
/// Equal distances keep their input order.
pub fn nearest_k<T: Anchored>(origin: GeoPoint, candidates: &[T], k: i64) -> Vec<(&T, f64)> {
    if k <= 0 {
        return Vec::new();
    }

    candidates
        .iter()
        .map(|c| (c, distance(origin, c.anchor())))
        .sorted_by(|a, b| a.1.total_cmp(&b.1))
        .take(k as usize)
        .collect()
}
