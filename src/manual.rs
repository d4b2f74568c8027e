use chrono::{DateTime, Utc};

use crate::geo::GeoPoint;
use crate::route::RouteSample;

/// Default per-tick step in degrees.
pub const DEFAULT_STEP_DEGREES: f64 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::North => 0b0001,
            Direction::South => 0b0010,
            Direction::East => 0b0100,
            Direction::West => 0b1000,
        }
    }
}

/// Set of directions currently held down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections(u8);

impl HeldDirections {
    pub fn press(&mut self, dir: Direction) {
        self.0 |= dir.bit();
    }

    pub fn release(&mut self, dir: Direction) {
        self.0 &= !dir.bit();
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn contains(&self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Net (lat, lng) unit vector; opposite directions cancel.
    fn axes(&self) -> (i8, i8) {
        let mut lat = 0;
        let mut lng = 0;
        if self.contains(Direction::North) {
            lat += 1;
        }
        if self.contains(Direction::South) {
            lat -= 1;
        }
        if self.contains(Direction::East) {
            lng += 1;
        }
        if self.contains(Direction::West) {
            lng -= 1;
        }
        (lat, lng)
    }
}

/// Synthetic position source driven by directional input.
///
/// Key events mutate the held set, ticks read it. Both go through `&mut self`,
/// so a tick always sees a complete held set.
#[derive(Debug, Clone)]
pub struct ManualInjector {
    position: GeoPoint,
    held: HeldDirections,
    step_degrees: f64,
}

impl ManualInjector {
    pub fn new(start: GeoPoint, step_degrees: f64) -> Self {
        Self {
            position: start,
            held: HeldDirections::default(),
            step_degrees,
        }
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn reposition(&mut self, to: GeoPoint) {
        self.position = to;
    }

    pub fn held(&self) -> HeldDirections {
        self.held
    }

    pub fn press(&mut self, dir: Direction) {
        self.held.press(dir);
    }

    pub fn release(&mut self, dir: Direction) {
        self.held.release(dir);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    /// Advance one tick. Yields a sample only if the held set moves us.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<RouteSample> {
        let (dlat, dlng) = self.held.axes();
        if dlat == 0 && dlng == 0 {
            return None;
        }

        let latitude =
            (self.position.latitude + f64::from(dlat) * self.step_degrees).clamp(-90.0, 90.0);
        let longitude = wrap_longitude(self.position.longitude + f64::from(dlng) * self.step_degrees);

        let next = GeoPoint {
            latitude,
            longitude,
        };
        // pinned against a pole
        if next == self.position {
            return None;
        }
        self.position = next;
        Some(RouteSample::new(self.position, now))
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}
