//! Time of day and the ambient light colour that goes with it.

use cgmath::{Vector3, VectorSpace};

const HOURS_PER_DAY: f32 = 24.0;

/// Ambient colour peaks, ordered by hour: night, morning, day, evening.
const AMBIENT_KEYS: [(f32, [f32; 3]); 4] = [
    (2.0, [0.0, 0.15, 0.15]),
    (8.0, [0.6, 0.3, 0.3]),
    (14.0, [0.6, 0.6, 0.6]),
    (21.0, [0.5, 0.2, 0.2]),
];

/// A clock that fades the ambient light between the four key colours,
/// wrapping from evening through midnight back to night.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DayCycle {
    time_of_day: f32,
    /// Seconds of game time per in-game hour.
    pub time_per_hour: f32,
}

impl Default for DayCycle {
    fn default() -> Self {
        Self {
            time_of_day: 2.0,
            time_per_hour: 100.0,
        }
    }
}

impl DayCycle {
    pub fn new(time_of_day: f32, time_per_hour: f32) -> Self {
        Self {
            time_of_day: time_of_day.rem_euclid(HOURS_PER_DAY),
            time_per_hour,
        }
    }

    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Advance the clock and return the new ambient intensity.
    pub fn advance(&mut self, dt: f32) -> Vector3<f32> {
        if self.time_per_hour > 0.0 {
            self.time_of_day = (self.time_of_day + dt / self.time_per_hour).rem_euclid(HOURS_PER_DAY);
        }
        self.ambient()
    }

    pub fn ambient(&self) -> Vector3<f32> {
        ambient_at(self.time_of_day)
    }
}

/// Blend between the last key before `hour` and the first key at or after it.
pub fn ambient_at(hour: f32) -> Vector3<f32> {
    let first = AMBIENT_KEYS[0];
    let last = AMBIENT_KEYS[AMBIENT_KEYS.len() - 1];
    let (from_hour, from) = AMBIENT_KEYS
        .iter()
        .rev()
        .find(|(h, _)| *h < hour)
        .copied()
        .unwrap_or(last);
    let (to_hour, to) = AMBIENT_KEYS
        .iter()
        .find(|(h, _)| *h >= hour)
        .copied()
        .unwrap_or(first);

    let span = (to_hour - from_hour).rem_euclid(HOURS_PER_DAY);
    let into = (hour - from_hour).rem_euclid(HOURS_PER_DAY);
    let blend = if span > 0.0 { (into / span).min(1.0) } else { 0.0 };
    Vector3::from(from).lerp(Vector3::from(to), blend)
}
