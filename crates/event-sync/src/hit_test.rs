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

//! Map click resolution.

use log::trace;

use crate::renderer::{MapRenderer, ScreenPoint, EVENT_LAYER};

/// Turns a pointer position into the id of the event feature under it.
///
/// Stateless; it only asks the renderer's hit-test about one layer.
#[derive(Debug, Clone)]
pub struct MapClickAdapter {
    layer: String,
}

impl Default for MapClickAdapter {
    fn default() -> Self {
        Self::new(EVENT_LAYER)
    }
}

impl MapClickAdapter {
    #[must_use]
    pub fn new(layer: impl Into<String>) -> Self {
        Self { layer: layer.into() }
    }

    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Id of the topmost event feature at `point`, or `None` on a miss.
    #[must_use]
    pub fn resolve_click<R: MapRenderer + ?Sized>(&self, renderer: &R, point: ScreenPoint) -> Option<String> {
        let hit = renderer
            .query_rendered_features(&self.layer, point)
            .into_iter()
            .next()
            .map(|properties| properties.id);
        trace!("Click at ({:.0}, {:.0}) resolved to {:?}", point.x, point.y, hit);
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LngLat;
    use crate::index::{FeatureCollection, FeatureProperties};

    /// Reports fixed hits on the event layer only.
    struct StubRenderer {
        hits: Vec<&'static str>,
    }

    impl MapRenderer for StubRenderer {
        fn is_ready(&self) -> bool {
            true
        }

        fn set_point_layer(&mut self, _layer: &str, _features: &FeatureCollection) {}

        fn query_rendered_features(&self, layer: &str, _point: ScreenPoint) -> Vec<FeatureProperties> {
            if layer != EVENT_LAYER {
                return Vec::new();
            }
            self.hits
                .iter()
                .map(|id| FeatureProperties { id: (*id).to_string() })
                .collect()
        }

        fn fly_to(&mut self, _center: LngLat, _zoom: f64, _speed: f64) {}
    }

    #[test]
    fn test_first_hit_wins() {
        let renderer = StubRenderer { hits: vec!["b", "a"] };
        let adapter = MapClickAdapter::default();
        assert_eq!(adapter.resolve_click(&renderer, ScreenPoint::new(5.0, 5.0)).as_deref(), Some("b"));
    }

    #[test]
    fn test_miss() {
        let renderer = StubRenderer { hits: Vec::new() };
        assert!(MapClickAdapter::default()
            .resolve_click(&renderer, ScreenPoint::new(5.0, 5.0))
            .is_none());
    }

    #[test]
    fn test_restricted_to_configured_layer() {
        let renderer = StubRenderer { hits: vec!["a"] };
        let adapter = MapClickAdapter::new("venues");
        assert_eq!(adapter.layer(), "venues");
        assert!(adapter.resolve_click(&renderer, ScreenPoint::new(0.0, 0.0)).is_none());
    }
}
