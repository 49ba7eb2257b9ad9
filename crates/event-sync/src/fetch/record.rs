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

//! Wire records from the events endpoint and their normalization.
//!
//! Record format:
//! ```text
//! {"_id": "...", "category": "...", "duration": ..., "difficultyLevel": ...,
//!  "organizer": ..., "address": "...", "location": {"longitude": ..., "latitude": ...},
//!  "date": "..."}
//! ```
//!
//! Upstream data is loosely typed: numbers sometimes arrive as strings and
//! the identifier is `_id` on most records but `id` on some. Normalization
//! settles on one canonical id here so nothing downstream compares two
//! different id fields.

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::event::{Event, Location};

/// One event record as sent by the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "_id")]
    pub object_id: Option<Value>,
    pub id: Option<Value>,
    pub category: Option<String>,
    pub duration: Option<Value>,
    pub difficulty_level: Option<Value>,
    pub organizer: Option<Value>,
    pub address: Option<String>,
    pub location: Option<RawLocation>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    pub longitude: Option<Value>,
    pub latitude: Option<Value>,
}

impl RawEvent {
    /// Canonical identifier: `_id`, falling back to `id`.
    #[must_use]
    pub fn canonical_id(&self) -> Option<String> {
        let non_empty = |value: &Value| scalar_to_string(value).filter(|id| !id.is_empty());
        self.object_id
            .as_ref()
            .and_then(non_empty)
            .or_else(|| self.id.as_ref().and_then(non_empty))
    }

    /// Convert into an [`Event`]. Returns `None` when the record has no usable id.
    #[must_use]
    pub fn normalize(self) -> Option<Event> {
        let id = self.canonical_id()?;
        let location = self
            .location
            .map(|loc| Location {
                longitude: loc.longitude.as_ref().and_then(coordinate),
                latitude: loc.latitude.as_ref().and_then(coordinate),
            })
            .unwrap_or_default();

        Some(Event {
            id,
            location,
            address: self.address.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            duration: self.duration.as_ref().and_then(scalar_to_string),
            difficulty_level: self.difficulty_level.as_ref().and_then(scalar_to_string),
            category: self.category.unwrap_or_default(),
            organizer: self.organizer.as_ref().and_then(organizer_name),
        })
    }
}

/// Normalize a decoded JSON array into events, dropping records that are
/// malformed or carry no id.
#[must_use]
pub fn normalize_records(records: Vec<Value>) -> Vec<Event> {
    let total = records.len();
    let events: Vec<Event> = records
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => {
                let event = raw.normalize();
                if event.is_none() {
                    warn!("Dropping event record {position}: no identifier");
                }
                event
            }
            Err(e) => {
                warn!("Dropping malformed event record {position}: {e}");
                None
            }
        })
        .collect();

    if events.len() < total {
        warn!("Normalized {} of {} event records", events.len(), total);
    }
    events
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coordinates come as numbers, occasionally as numeric strings.
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// The organizer is either a reference id or an embedded object with a name.
fn organizer_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("username"))
            .or_else(|| map.get("_id"))
            .and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_record() {
        let raw: RawEvent = serde_json::from_value(json!({
            "_id": "65f0c1",
            "category": "Running",
            "duration": 90,
            "difficultyLevel": "Intermediate",
            "organizer": {"_id": "u1", "name": "City Club"},
            "address": "1 Quai de la Seine",
            "location": {"longitude": 2.35, "latitude": 48.85},
            "date": "2024-06-01T09:30:00Z"
        }))
        .unwrap();

        let event = raw.normalize().unwrap();
        assert_eq!(event.id, "65f0c1");
        assert_eq!(event.category, "Running");
        assert_eq!(event.duration.as_deref(), Some("90"));
        assert_eq!(event.difficulty_level.as_deref(), Some("Intermediate"));
        assert_eq!(event.organizer.as_deref(), Some("City Club"));
        assert_eq!(event.location, Location::new(2.35, 48.85));
    }

    #[test]
    fn test_canonical_id_prefers_object_id() {
        let raw: RawEvent = serde_json::from_value(json!({"_id": "mongo", "id": "plain"})).unwrap();
        assert_eq!(raw.canonical_id().as_deref(), Some("mongo"));

        let raw: RawEvent = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(raw.canonical_id().as_deref(), Some("42"));
    }

    #[test]
    fn test_blank_object_id_falls_back_to_id() {
        let events = normalize_records(vec![json!({"_id": "", "id": "b"}), json!({"_id": null, "id": "c"})]);
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_string_coordinates_accepted() {
        let raw: RawEvent = serde_json::from_value(json!({
            "_id": "a",
            "location": {"longitude": "10.5", "latitude": " 20.25 "}
        }))
        .unwrap();
        let event = raw.normalize().unwrap();
        assert_eq!(event.location, Location::new(10.5, 20.25));
    }

    #[test]
    fn test_missing_latitude_kept_as_none() {
        let raw: RawEvent = serde_json::from_value(json!({
            "_id": "a",
            "location": {"longitude": 10.0}
        }))
        .unwrap();
        let event = raw.normalize().unwrap();
        assert_eq!(event.location.latitude, None);
        assert_eq!(event.location.point(), None);
    }

    #[test]
    fn test_normalize_records_drops_bad_entries() {
        let events = normalize_records(vec![
            json!({"_id": "a", "location": {"longitude": 1.0, "latitude": 2.0}}),
            json!({"category": "no id"}),
            json!("not an object"),
            json!({"_id": "", "category": "empty id"}),
            json!({"id": "b"}),
        ]);

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
