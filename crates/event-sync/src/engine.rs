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

//! Composition root wiring the index, selection, camera and list together.
//!
//! All methods run on the UI thread, one at a time, in the order the
//! triggering input arrived.

use log::{debug, info};
use tokio::sync::broadcast;

use crate::camera::{CameraConfig, CameraController, ViewportState};
use crate::event::{Event, LngLat};
use crate::hit_test::MapClickAdapter;
use crate::index::FeatureIndex;
use crate::list_sync::ListSync;
use crate::renderer::{ListPanel, MapRenderer, ScreenPoint, EVENT_LAYER};
use crate::selection::{SelectionController, SelectionEvent, SelectionState, SideEffect};

/// Configuration for [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub camera: CameraConfig,
    /// Point layer the events are registered under.
    pub layer: String,
    /// Broadcast channel capacity for selection events.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            layer: EVENT_LAYER.to_string(),
            event_channel_capacity: 64,
        }
    }
}

/// Keeps the map, the list and the selected event consistent.
pub struct SyncEngine<R, L: ListPanel> {
    index: FeatureIndex,
    selection: SelectionController,
    camera: CameraController,
    list_sync: ListSync<L::Handle>,
    clicks: MapClickAdapter,
    layer: String,
    renderer: R,
    list: L,
}

impl<R, L: ListPanel> std::fmt::Debug for SyncEngine<R, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("events", &self.index.len())
            .field("features", &self.index.features().len())
            .field("selection", self.selection.state())
            .field("viewport", self.camera.viewport())
            .finish_non_exhaustive()
    }
}

impl<R: MapRenderer, L: ListPanel> SyncEngine<R, L> {
    /// Create an engine with an empty event list.
    ///
    /// `initial_center` is the user's location when known.
    pub fn new(config: EngineConfig, renderer: R, list: L, initial_center: Option<LngLat>) -> Self {
        Self {
            index: FeatureIndex::default(),
            selection: SelectionController::new(config.event_channel_capacity),
            camera: CameraController::new(config.camera, initial_center),
            list_sync: ListSync::default(),
            clicks: MapClickAdapter::new(config.layer.clone()),
            layer: config.layer,
            renderer,
            list,
        }
    }

    /// Install a new event list.
    ///
    /// Rebuilds the index, drops a selection that is no longer listed,
    /// releases references to vanished cards and purges a buffered camera
    /// request for a stale event. None of this emits side effects.
    pub fn replace_events(&mut self, events: Vec<Event>) -> &FeatureIndex {
        self.index = FeatureIndex::build(events);
        info!(
            "Event list replaced: {} events, {} map features",
            self.index.len(),
            self.index.features().len()
        );

        self.selection.on_event_list_replaced(&self.index);
        self.list_sync.retain_listed(&self.index);
        let selection = &self.selection;
        self.camera
            .discard_stale(|id| selection.state().is_selected(id));

        if self.renderer.is_ready() {
            self.renderer.set_point_layer(&self.layer, self.index.features());
        }
        &self.index
    }

    /// The map widget finished initializing.
    pub fn on_renderer_ready(&mut self) {
        debug!("Renderer ready, registering {} features", self.index.features().len());
        self.renderer.set_point_layer(&self.layer, self.index.features());
        let selection = &self.selection;
        self.camera
            .on_renderer_ready(&mut self.renderer, |id| selection.state().is_selected(id));
    }

    /// A click on the map. Returns the event it selected, if any.
    pub fn handle_map_click(&mut self, point: ScreenPoint) -> Option<String> {
        let id = self.clicks.resolve_click(&self.renderer, point)?;
        self.select_from_map(&id);
        Some(id)
    }

    /// Select an event from the map side.
    pub fn select_from_map(&mut self, id: &str) {
        let effects = self.selection.select_from_map(&self.index, id);
        self.apply(effects);
    }

    /// Select an event from the list side.
    pub fn select_from_list(&mut self, id: &str) {
        let effects = self.selection.select_from_list(&self.index, id);
        self.apply(effects);
    }

    /// Clear the selection; the camera stays put.
    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// The map came to rest at `center`/`zoom`.
    pub fn on_camera_idle(&mut self, center: LngLat, zoom: f64) {
        self.camera.on_move_end(center, zoom);
    }

    /// A card for `id` was rendered.
    pub fn mount_card(&mut self, id: impl Into<String>, handle: L::Handle) {
        self.list_sync.mount(id, handle);
    }

    /// The card for `id` is no longer rendered.
    pub fn unmount_card(&mut self, id: &str) {
        self.list_sync.unmount(id);
    }

    /// Whether a scroll for `id` that is completing now should still take
    /// visible effect.
    #[must_use]
    pub fn confirm_scroll(&self, id: &str) -> bool {
        self.selection.state().is_selected(id)
    }

    #[must_use]
    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    /// The currently selected event.
    #[must_use]
    pub fn selected_event(&self) -> Option<&Event> {
        self.selection
            .state()
            .selected_id()
            .and_then(|id| self.index.get(id))
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportState {
        self.camera.viewport()
    }

    #[must_use]
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.selection.subscribe()
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[must_use]
    pub fn list_panel(&self) -> &L {
        &self.list
    }

    pub fn list_panel_mut(&mut self) -> &mut L {
        &mut self.list
    }

    fn apply(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::FlyTo { id, center } => {
                    let request = self.camera.focus_request(&id, center);
                    self.camera.fly_to(&mut self.renderer, request);
                }
                SideEffect::ScrollTo { id } => {
                    self.list_sync.scroll_to(&mut self.list, &self.index, &id);
                }
            }
        }
    }
}
