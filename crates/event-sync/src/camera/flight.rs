// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time-based camera interpolation for map widgets without a native fly-to.

use std::time::Duration;

use crate::event::LngLat;

const BASE_DURATION_SECS: f64 = 0.6;
const PER_DOUBLING_SECS: f64 = 0.25;
const PER_ZOOM_LEVEL_SECS: f64 = 0.1;
const MIN_DURATION_SECS: f64 = 0.2;
const MAX_DURATION_SECS: f64 = 4.0;

/// One animated transition from a start view to a target view.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    from: LngLat,
    from_zoom: f64,
    to: LngLat,
    to_zoom: f64,
    duration: Duration,
    elapsed: Duration,
}

impl Flight {
    /// `speed` scales the duration inversely; 1.0 is the nominal pace.
    #[must_use]
    pub fn new(from: LngLat, from_zoom: f64, to: LngLat, to_zoom: f64, speed: f64) -> Self {
        Self {
            from,
            from_zoom,
            to,
            to_zoom,
            duration: flight_duration(from, from_zoom, to, to_zoom, speed),
            elapsed: Duration::ZERO,
        }
    }

    /// Move the clock forward and return the view at the new time.
    pub fn advance(&mut self, dt: Duration) -> (LngLat, f64) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.sample()
    }

    /// View at the current time.
    #[must_use]
    pub fn sample(&self) -> (LngLat, f64) {
        let t = ease_in_out_cubic(self.progress());
        let center = LngLat::new(
            lerp(self.from.lon, self.to.lon, t),
            lerp(self.from.lat, self.to.lat, t),
        );
        (center, lerp(self.from_zoom, self.to_zoom, t))
    }

    /// Fraction of the duration elapsed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    #[must_use]
    pub fn target(&self) -> (LngLat, f64) {
        (self.to, self.to_zoom)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Replace the destination, continuing from wherever the camera is now.
    pub fn retarget(&mut self, to: LngLat, to_zoom: f64, speed: f64) {
        let (from, from_zoom) = self.sample();
        *self = Self::new(from, from_zoom, to, to_zoom, speed);
    }
}

/// Longer hops take longer, but only logarithmically so.
fn flight_duration(from: LngLat, from_zoom: f64, to: LngLat, to_zoom: f64, speed: f64) -> Duration {
    let degrees = (to.lon - from.lon).hypot(to.lat - from.lat);
    // Distance in 256px tiles at the starting zoom.
    let tiles = degrees / 360.0 * 2_f64.powf(from_zoom);
    let secs = BASE_DURATION_SECS
        + PER_DOUBLING_SECS * (1.0 + tiles).log2()
        + PER_ZOOM_LEVEL_SECS * (to_zoom - from_zoom).abs();
    let secs = secs / speed.max(0.1);
    if !secs.is_finite() {
        return Duration::from_secs_f64(MIN_DURATION_SECS);
    }
    Duration::from_secs_f64(secs.clamp(MIN_DURATION_SECS, MAX_DURATION_SECS))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_reaches_target() {
        let mut flight = Flight::new(LngLat::new(0.0, 0.0), 10.0, LngLat::new(1.0, 1.0), 14.0, 1.0);
        assert!(!flight.is_finished());
        assert_eq!(flight.sample(), (LngLat::new(0.0, 0.0), 10.0));

        let (center, zoom) = flight.advance(flight.duration() + Duration::from_secs(1));
        assert!(flight.is_finished());
        assert_eq!(center, LngLat::new(1.0, 1.0));
        assert!((zoom - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flight_midpoint() {
        let mut flight = Flight::new(LngLat::new(0.0, 0.0), 12.0, LngLat::new(2.0, 4.0), 12.0, 1.0);
        let half = flight.duration() / 2;
        let (center, _) = flight.advance(half);
        assert!((center.lon - 1.0).abs() < 1e-6);
        assert!((center.lat - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_faster_speed_is_shorter() {
        let slow = Flight::new(LngLat::new(0.0, 0.0), 8.0, LngLat::new(5.0, 5.0), 12.0, 0.5);
        let fast = Flight::new(LngLat::new(0.0, 0.0), 8.0, LngLat::new(5.0, 5.0), 12.0, 2.0);
        assert!(fast.duration() < slow.duration());
    }

    #[test]
    fn test_retarget_continues_from_current_view() {
        let mut flight = Flight::new(LngLat::new(0.0, 0.0), 12.0, LngLat::new(10.0, 0.0), 12.0, 1.0);
        let half = flight.duration() / 2;
        let (midway, _) = flight.advance(half);

        flight.retarget(LngLat::new(-10.0, 0.0), 12.0, 1.0);

        assert!((flight.progress()).abs() < f64::EPSILON);
        assert_eq!(flight.sample().0, midway);
        assert_eq!(flight.target().0, LngLat::new(-10.0, 0.0));
    }

    #[test]
    fn test_extreme_coordinates_do_not_panic() {
        let mut flight = Flight::new(LngLat::new(1.7e308, 0.0), 12.0, LngLat::new(-1.7e308, 0.0), 12.0, 1.0);
        assert_eq!(flight.duration(), Duration::from_secs_f64(MIN_DURATION_SECS));

        flight.advance(Duration::from_millis(16));
        flight.retarget(LngLat::new(1.7e308, 0.0), 12.0, 1.0);
        flight.advance(Duration::from_millis(16));
        flight.retarget(LngLat::new(0.0, 0.0), 12.0, 1.0);

        assert!(flight.duration() >= Duration::from_secs_f64(MIN_DURATION_SECS));
        assert!(flight.duration() <= Duration::from_secs_f64(MAX_DURATION_SECS));
    }
}
