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

//! Point features in `GeoJSON` shape.

use serde::{Deserialize, Serialize};

use crate::event::LngLat;

/// Property bag carried by every event feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: String,
}

/// Feature geometry. Only points are produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// `[longitude, latitude]`
    Point([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    #[must_use]
    pub fn point(id: impl Into<String>, at: LngLat) -> Self {
        Self {
            geometry: Geometry::Point([at.lon, at.lat]),
            properties: FeatureProperties { id: id.into() },
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.properties.id
    }

    #[must_use]
    pub fn position(&self) -> LngLat {
        match self.geometry {
            Geometry::Point([lon, lat]) => LngLat::new(lon, lat),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Serialize as a `GeoJSON` document for renderers that take a source by value.
    pub fn to_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_geojson_shape() {
        let collection = FeatureCollection {
            features: vec![Feature::point("a", LngLat::new(10.0, 20.0))],
        };

        let value: serde_json::Value = serde_json::from_str(&collection.to_geojson().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [10.0, 20.0]},
                    "properties": {"id": "a"}
                }]
            })
        );
    }
}
