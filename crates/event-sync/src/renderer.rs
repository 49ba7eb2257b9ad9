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

//! Collaborator traits for the map and list views.
//!
//! The engine does not draw anything. Front ends implement these traits on
//! top of whatever map widget and list widget they use.

use crate::event::LngLat;
use crate::index::{FeatureCollection, FeatureProperties};

/// Name of the point layer that holds event features.
pub const EVENT_LAYER: &str = "events";

/// A position in map widget pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Point rendering, hit-testing and camera primitive of a map widget.
pub trait MapRenderer {
    /// Whether the widget is initialized and can take camera commands.
    fn is_ready(&self) -> bool;

    /// Register or replace the point layer `layer` with `features`.
    fn set_point_layer(&mut self, layer: &str, features: &FeatureCollection);

    /// Properties of the features of `layer` under `point`, topmost first.
    fn query_rendered_features(&self, layer: &str, point: ScreenPoint) -> Vec<FeatureProperties>;

    /// Start an animated camera transition. A call while a transition is
    /// running retargets it.
    fn fly_to(&mut self, center: LngLat, zoom: f64, speed: f64);
}

/// Where a scrolled element should end up in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAlign {
    Start,
    #[default]
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

/// A scrollable list of event cards.
pub trait ListPanel {
    /// Stable reference to a rendered card.
    type Handle: Clone;

    /// Scroll so the card behind `handle` is visible. Fire and forget.
    fn scroll_into_view(&mut self, handle: &Self::Handle, align: ScrollAlign, behavior: ScrollBehavior);
}
