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

//! Event data model.
//!
//! Events are immutable once normalized. A fetch replaces the whole list;
//! nothing in this crate edits an event field by field.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A geographic point in degrees, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Raw event location. Either coordinate may be missing in upstream data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

impl Location {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude: Some(longitude),
            latitude: Some(latitude),
        }
    }

    /// The location as a point, if both coordinates are present and within
    /// longitude [-180, 180] and latitude [-90, 90].
    #[must_use]
    pub fn point(&self) -> Option<LngLat> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat) => {
                Some(LngLat::new(lon, lat))
            }
            _ => None,
        }
    }
}

/// A sports event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    /// Canonical event identifier, unique within a list.
    pub id: String,
    pub location: Location,
    pub address: String,
    /// Start date as sent by the API (usually RFC 3339).
    pub date: String,
    pub duration: Option<String>,
    pub difficulty_level: Option<String>,
    pub category: String,
    pub organizer: Option<String>,
}

impl Event {
    /// Create an event with an id and coordinates, leaving descriptive fields empty.
    #[must_use]
    pub fn new(id: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            id: id.into(),
            location: Location::new(longitude, latitude),
            ..Default::default()
        }
    }

    /// Parsed start date. `None` when the API sent something that is not RFC 3339.
    #[must_use]
    pub fn starts_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_requires_both_coordinates() {
        let partial = Location {
            longitude: Some(10.0),
            latitude: None,
        };
        assert_eq!(partial.point(), None);
        assert_eq!(Location::new(10.0, 20.0).point(), Some(LngLat::new(10.0, 20.0)));
    }

    #[test]
    fn test_point_rejects_non_finite() {
        assert_eq!(Location::new(f64::NAN, 20.0).point(), None);
        assert_eq!(Location::new(10.0, f64::INFINITY).point(), None);
    }

    #[test]
    fn test_point_rejects_out_of_range() {
        assert_eq!(Location::new(1.7e308, 0.0).point(), None);
        assert_eq!(Location::new(-180.5, 0.0).point(), None);
        assert_eq!(Location::new(0.0, 90.01).point(), None);
        assert_eq!(Location::new(180.0, -90.0).point(), Some(LngLat::new(180.0, -90.0)));
    }

    #[test]
    fn test_starts_at() {
        let mut event = Event::new("a", 1.0, 2.0);
        event.date = "2024-06-01T09:30:00+02:00".to_string();
        let starts = event.starts_at().unwrap();
        assert_eq!(starts.format("%Y-%m-%d %H:%M").to_string(), "2024-06-01 09:30");

        event.date = "next saturday".to_string();
        assert!(event.starts_at().is_none());
    }
}
