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

//! Point-feature index derived from the event list.
//!
//! The index is a pure function of the list it was built from. When the list
//! changes, build a new index and drop the old one; there are no incremental
//! updates, so lookups and features can never disagree with the list.

mod feature;

pub use feature::{Feature, FeatureCollection, FeatureProperties, Geometry};

use std::collections::HashMap;

use log::warn;

use crate::event::Event;

/// Why an event has no feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Longitude or latitude missing, not finite or out of range.
    MissingCoordinates,
    /// Another event earlier in the list has the same id.
    DuplicateId,
}

/// An event left out of the feature collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub id: String,
    pub position: usize,
    pub reason: SkipReason,
}

/// Lookup tables and features for one event list.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    events: Vec<Event>,
    position_of: HashMap<String, usize>,
    features: FeatureCollection,
    skipped: Vec<SkippedEvent>,
}

impl FeatureIndex {
    /// Build the index for `events`. O(n).
    ///
    /// Events without finite coordinates stay in the list and remain
    /// selectable from it, but get no map feature.
    #[must_use]
    pub fn build(events: Vec<Event>) -> Self {
        let mut position_of = HashMap::with_capacity(events.len());
        let mut features = Vec::with_capacity(events.len());
        let mut skipped = Vec::new();

        for (position, event) in events.iter().enumerate() {
            if position_of.contains_key(&event.id) {
                warn!(
                    "Event {} at position {} duplicates an earlier id, skipping",
                    event.id, position
                );
                skipped.push(SkippedEvent {
                    id: event.id.clone(),
                    position,
                    reason: SkipReason::DuplicateId,
                });
                continue;
            }
            position_of.insert(event.id.clone(), position);

            match event.location.point() {
                Some(point) => features.push(Feature::point(event.id.clone(), point)),
                None => {
                    warn!(
                        "Event {} has no usable coordinates ({:?}), excluded from map",
                        event.id, event.location
                    );
                    skipped.push(SkippedEvent {
                        id: event.id.clone(),
                        position,
                        reason: SkipReason::MissingCoordinates,
                    });
                }
            }
        }

        if !skipped.is_empty() {
            warn!(
                "Indexed {} of {} events as map features ({} skipped)",
                features.len(),
                events.len(),
                skipped.len()
            );
        }

        Self {
            events,
            position_of,
            features: FeatureCollection { features },
            skipped,
        }
    }

    /// Event with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Event> {
        self.position_of.get(id).map(|&position| &self.events[position])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position_of.contains_key(id)
    }

    /// Position of the event in the list the index was built from.
    #[must_use]
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.position_of.get(id).copied()
    }

    #[must_use]
    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    /// Events in list order, including those without a feature.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedEvent] {
        &self.skipped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LngLat, Location};
    use std::collections::HashSet;

    fn two_events() -> Vec<Event> {
        vec![Event::new("a", 10.0, 20.0), Event::new("b", 11.0, 21.0)]
    }

    #[test]
    fn test_build_lookups() {
        let index = FeatureIndex::build(two_events());

        assert_eq!(index.len(), 2);
        assert_eq!(index.position_of("a"), Some(0));
        assert_eq!(index.position_of("b"), Some(1));
        assert_eq!(index.get("b").map(|e| e.id.as_str()), Some("b"));
        assert!(index.get("c").is_none());
        assert_eq!(index.features().len(), 2);
        assert_eq!(index.features().features[1].position(), LngLat::new(11.0, 21.0));
        assert!(index.skipped().is_empty());
    }

    #[test]
    fn test_missing_latitude_recorded_as_skipped() {
        let mut event = Event::new("x", 10.0, 0.0);
        event.location.latitude = None;

        let index = FeatureIndex::build(vec![event]);

        assert_eq!(index.features().len(), 0);
        assert_eq!(
            index.skipped(),
            &[SkippedEvent {
                id: "x".to_string(),
                position: 0,
                reason: SkipReason::MissingCoordinates,
            }]
        );
        // Still part of the list.
        assert_eq!(index.position_of("x"), Some(0));
    }

    #[test]
    fn test_out_of_range_coordinates_skipped_as_missing() {
        let index = FeatureIndex::build(vec![
            Event::new("far", 1.7e308, 0.0),
            Event::new("near", -1.7e308, 0.0),
            Event::new("ok", 5.0, 45.0),
        ]);

        assert_eq!(index.features().len(), 1);
        assert_eq!(index.features().features[0].id(), "ok");
        let reasons: Vec<_> = index.skipped().iter().map(|s| (s.id.as_str(), s.reason)).collect();
        assert_eq!(
            reasons,
            [("far", SkipReason::MissingCoordinates), ("near", SkipReason::MissingCoordinates)]
        );
        assert!(index.contains("far"));
    }

    #[test]
    fn test_feature_count_matches_finite_coordinates() {
        let events = vec![
            Event::new("a", 1.0, 1.0),
            Event {
                id: "b".to_string(),
                location: Location::default(),
                ..Default::default()
            },
            Event::new("c", f64::NAN, 1.0),
            Event::new("d", 2.0, f64::NEG_INFINITY),
            Event::new("e", -179.9, 85.0),
        ];
        let expected = events.iter().filter(|e| e.location.point().is_some()).count();

        let index = FeatureIndex::build(events.clone());

        assert_eq!(index.features().len(), expected);
        let ids: HashSet<&str> = index.features().iter().map(Feature::id).collect();
        assert_eq!(ids.len(), index.features().len());
        assert!(ids.iter().all(|id| events.iter().any(|e| e.id == *id)));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let events = vec![
            Event::new("a", 1.0, 1.0),
            Event::new("a", 5.0, 5.0),
            Event::new("b", 2.0, 2.0),
        ];

        let index = FeatureIndex::build(events);

        assert_eq!(index.position_of("a"), Some(0));
        assert_eq!(index.features().len(), 2);
        assert_eq!(index.features().features[0].position(), LngLat::new(1.0, 1.0));
        assert_eq!(index.skipped()[0].reason, SkipReason::DuplicateId);
        assert_eq!(index.skipped()[0].position, 1);
    }

    #[test]
    fn test_rebuild_after_reorder() {
        let first = FeatureIndex::build(two_events());
        let mut reordered = two_events();
        reordered.reverse();
        let second = FeatureIndex::build(reordered);

        assert_eq!(first.position_of("a"), Some(0));
        assert_eq!(second.position_of("a"), Some(1));
        assert_eq!(second.features().features[0].id(), "b");
    }
}
