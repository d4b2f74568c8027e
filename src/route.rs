use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::geo::{distance, GeoPoint};

/// One recorded position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSample {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

impl RouteSample {
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self { point, timestamp }
    }
}

/// Append-only path of samples with a running distance total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    samples: Vec<RouteSample>,
    total_distance_m: f64,
    frozen: bool,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample to the end of the route.
    ///
    /// Fails without touching the route if the sample is older than the
    /// current last sample or the route has been frozen.
    pub fn append(&mut self, sample: RouteSample) -> Result<()> {
        if self.frozen {
            return Err(TrackerError::RouteFrozen);
        }

        if let Some(last) = self.samples.last() {
            if sample.timestamp < last.timestamp {
                debug!(last = %last.timestamp, got = %sample.timestamp, "rejecting stale sample");
                return Err(TrackerError::OutOfOrderSample {
                    last: last.timestamp,
                    got: sample.timestamp,
                });
            }
            self.total_distance_m += distance(last.point, sample.point);
        }

        self.samples.push(sample);
        Ok(())
    }

    /// Cached sum of the legs, in meters.
    pub fn total_distance(&self) -> f64 {
        self.total_distance_m
    }

    /// Sum of the legs computed from the stored samples.
    pub fn recompute_distance(&self) -> f64 {
        self.samples
            .iter()
            .tuple_windows()
            .fold(0.0, |acc, (a, b)| acc + distance(a.point, b.point))
    }

    /// Iterate the recorded points from the first sample. Each call starts over.
    pub fn points(&self) -> Points<'_> {
        Points {
            inner: self.samples.iter(),
        }
    }

    pub fn samples(&self) -> &[RouteSample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&RouteSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&RouteSample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Lazy view over a route's points.
#[derive(Debug, Clone)]
pub struct Points<'a> {
    inner: std::slice::Iter<'a, RouteSample>,
}

impl Iterator for Points<'_> {
    type Item = GeoPoint;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|s| s.point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Points<'_> {}

impl<'a> IntoIterator for &'a Route {
    type Item = GeoPoint;
    type IntoIter = Points<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn at(millis: i64, lat: f64, lng: f64) -> RouteSample {
        RouteSample::new(
            GeoPoint::new(lat, lng).unwrap(),
            DateTime::from_timestamp_millis(millis).unwrap(),
        )
    }

    #[test]
    fn test_first_sample_adds_no_distance() {
        let mut route = Route::new();
        route.append(at(0, 37.5663, 126.9779)).unwrap();

        assert_eq!(route.len(), 1);
        assert_eq!(route.total_distance(), 0.0);
    }

    #[test]
    fn test_cached_distance_matches_recompute() {
        let mut route = Route::new();
        let path = [
            (37.5663, 126.9779),
            (37.5670, 126.9785),
            (37.5688, 126.9790),
            (37.5688, 126.9790),
            (37.5701, 126.9760),
            (37.5788, 126.9770),
        ];
        for (i, (lat, lng)) in path.iter().enumerate() {
            route.append(at(i as i64 * 1_000, *lat, *lng)).unwrap();
            assert!((route.total_distance() - route.recompute_distance()).abs() < 1e-9);
        }
        assert!(route.total_distance() > 1_000.0);
    }

    #[test]
    fn test_equal_timestamps_are_accepted() {
        let mut route = Route::new();
        route.append(at(5_000, 10.0, 10.0)).unwrap();
        route.append(at(5_000, 10.0001, 10.0)).unwrap();
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn test_out_of_order_sample_leaves_route_unchanged() {
        let mut route = Route::new();
        route.append(at(1_000, 10.0, 10.0)).unwrap();
        route.append(at(2_000, 10.001, 10.0)).unwrap();
        let before = route.clone();

        let err = route.append(at(1_500, 10.002, 10.0)).unwrap_err();
        assert_matches!(err, TrackerError::OutOfOrderSample { .. });
        assert_eq!(route, before);
    }

    #[test]
    fn test_frozen_route_rejects_appends() {
        let mut route = Route::new();
        route.append(at(0, 1.0, 1.0)).unwrap();
        route.freeze();

        assert_matches!(route.append(at(10, 1.0, 1.1)), Err(TrackerError::RouteFrozen));
        assert_eq!(route.len(), 1);
    }

    #[test]
    fn test_points_restart_from_first() {
        let mut route = Route::new();
        route.append(at(0, 1.0, 1.0)).unwrap();
        route.append(at(1, 2.0, 2.0)).unwrap();
        route.append(at(2, 3.0, 3.0)).unwrap();

        let mut first_pass = route.points();
        assert_eq!(first_pass.next().map(|p| p.latitude), Some(1.0));
        assert_eq!(first_pass.next().map(|p| p.latitude), Some(2.0));

        let lats: Vec<f64> = route.points().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
        assert_eq!(route.points().len(), 3);
        assert_eq!((&route).into_iter().count(), 3);
    }
}
