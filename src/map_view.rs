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

//! Slippy map widget: tiles, event points, pan/zoom and animated fly-to.

use std::collections::HashMap;
use std::time::Duration;

use eframe::egui;
use event_sync::{Feature, FeatureCollection, FeatureProperties, Flight, LngLat, MapRenderer, ScreenPoint};
use log::{debug, trace};

use crate::tiles::{TileManager, WebMercator};

/// Click tolerance around a point, in pixels.
pub const HIT_RADIUS_PX: f32 = 10.0;
const POINT_RADIUS: f32 = 6.0;
const SELECTED_POINT_RADIUS: f32 = 9.0;
/// Wheel pixels per zoom level.
const SCROLL_PER_ZOOM_LEVEL: f32 = 200.0;

/// What happened in the map during one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MapFrame {
    /// The widget was laid out for the first time this frame.
    pub became_ready: bool,
    /// A click that was not part of a drag, in widget coordinates.
    pub clicked: Option<ScreenPoint>,
    /// The camera came to rest at this center and zoom.
    pub settled: Option<(LngLat, f64)>,
}

#[derive(Debug)]
pub struct MapView {
    center: LngLat,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    flight: Option<Flight>,
    layers: HashMap<String, Vec<Feature>>,
    size: egui::Vec2,
    ready: bool,
}

impl MapView {
    pub fn new(center: LngLat, zoom: f64, min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            flight: None,
            layers: HashMap::new(),
            size: egui::Vec2::ZERO,
            ready: false,
        }
    }

    pub fn center(&self) -> LngLat {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    /// Record the widget size and mark the map usable.
    ///
    /// Returns `true` the first time.
    pub fn set_viewport_size(&mut self, size: egui::Vec2) -> bool {
        self.size = size;
        let first = !self.ready;
        self.ready = true;
        first
    }

    /// Step a running transition. Returns the resting view once it ends.
    pub fn tick(&mut self, dt: Duration) -> Option<(LngLat, f64)> {
        let flight = self.flight.as_mut()?;
        let (center, zoom) = flight.advance(dt);
        self.center = center;
        self.zoom = zoom;
        if flight.is_finished() {
            self.flight = None;
            trace!("Flight finished at ({:.5}, {:.5}) z{:.2}", center.lon, center.lat, zoom);
            return Some((center, zoom));
        }
        None
    }

    /// Move the view by a pointer drag. Cancels any transition.
    pub fn pan_by(&mut self, delta: egui::Vec2) {
        self.flight = None;
        self.center = WebMercator::offset_to_lnglat(self.center, f64::from(-delta.x), f64::from(-delta.y), self.zoom);
    }

    /// Change the zoom by `levels`. Cancels any transition.
    pub fn zoom_by(&mut self, levels: f64) {
        self.flight = None;
        self.zoom = (self.zoom + levels).clamp(self.min_zoom, self.max_zoom);
    }

    /// Widget coordinates of `at`.
    pub fn to_screen(&self, at: LngLat) -> ScreenPoint {
        let (dx, dy) = WebMercator::offset_px(at, self.center, self.zoom);
        #[allow(clippy::cast_possible_truncation, reason = "screen coordinates")]
        let (dx, dy) = (dx as f32, dy as f32);
        ScreenPoint::new(self.size.x / 2.0 + dx, self.size.y / 2.0 + dy)
    }

    fn in_view(&self, p: ScreenPoint) -> bool {
        (-HIT_RADIUS_PX..=self.size.x + HIT_RADIUS_PX).contains(&p.x)
            && (-HIT_RADIUS_PX..=self.size.y + HIT_RADIUS_PX).contains(&p.y)
    }

    /// Draw the map and handle input. `selected` is highlighted.
    pub fn draw(&mut self, ui: &mut egui::Ui, tiles: &TileManager, selected: Option<&str>) -> MapFrame {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let mut frame = MapFrame {
            became_ready: self.set_viewport_size(rect.size()),
            ..MapFrame::default()
        };

        if self.is_flying() {
            let dt = ui.input(|i| i.stable_dt).min(0.1);
            frame.settled = self.tick(Duration::from_secs_f32(dt));
            ui.ctx().request_repaint();
        }

        if response.dragged() {
            self.pan_by(response.drag_delta());
        }
        if response.drag_stopped() {
            frame.settled = Some((self.center, self.zoom));
        }

        if response.hovered() {
            let (pinch, scroll) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y));
            let levels = pinch.log2() + scroll / SCROLL_PER_ZOOM_LEVEL;
            if levels.abs() > 0.001 {
                self.zoom_by(f64::from(levels));
                frame.settled = Some((self.center, self.zoom));
            }
        }

        if response.clicked() {
            frame.clicked = response
                .interact_pointer_pos()
                .map(|pos| ScreenPoint::new(pos.x - rect.min.x, pos.y - rect.min.y));
        }

        self.paint(&painter, rect, tiles, selected, ui.ctx());
        frame
    }

    fn paint(&self, painter: &egui::Painter, rect: egui::Rect, tiles: &TileManager, selected: Option<&str>, ctx: &egui::Context) {
        let center = rect.center();
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 220, 240));

        let visible = TileManager::get_visible_tiles(self.center, self.zoom, rect.width(), rect.height());
        let mut tiles_rendered = 0;
        for tile in visible {
            if let Some(texture) = tiles.get_tile(tile.coord, ctx) {
                let tile_rect = egui::Rect::from_min_size(
                    egui::pos2(center.x + tile.offset_x, center.y + tile.offset_y),
                    egui::vec2(tile.size, tile.size),
                );
                painter.image(
                    texture.id(),
                    tile_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
                tiles_rendered += 1;
            }
        }

        let mut selected_pos = None;
        for feature in self.layers.values().flatten() {
            let p = self.to_screen(feature.position());
            if !self.in_view(p) {
                continue;
            }
            let pos = rect.min + egui::vec2(p.x, p.y);
            if Some(feature.id()) == selected {
                selected_pos = Some(pos);
                continue;
            }
            painter.circle_filled(pos, POINT_RADIUS, egui::Color32::from_rgb(30, 110, 220));
            painter.circle_stroke(pos, POINT_RADIUS, egui::Stroke::new(1.5, egui::Color32::WHITE));
        }
        // Selected point on top
        if let Some(pos) = selected_pos {
            painter.circle_filled(pos, SELECTED_POINT_RADIUS, egui::Color32::from_rgb(230, 70, 40));
            painter.circle_stroke(pos, SELECTED_POINT_RADIUS, egui::Stroke::new(2.0, egui::Color32::WHITE));
        }

        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            "Drag to pan | Scroll or pinch to zoom",
            egui::FontId::proportional(12.0),
            egui::Color32::BLACK,
        );

        // Attribution (required by Carto)
        painter.text(
            rect.right_bottom() + egui::vec2(-10.0, -10.0),
            egui::Align2::RIGHT_BOTTOM,
            "© OpenStreetMap contributors © CARTO",
            egui::FontId::proportional(10.0),
            egui::Color32::from_black_alpha(180),
        );

        let tile_status = if tiles.get_error_count() > 0 {
            Some((format!("Failed to load {} tiles", tiles.get_error_count()), egui::Color32::from_rgb(220, 50, 50)))
        } else if tiles.has_loading_tiles() && tiles_rendered == 0 {
            Some(("Loading map tiles...".to_string(), egui::Color32::from_rgb(255, 200, 100)))
        } else {
            None
        };
        if let Some((message, bg_color)) = tile_status {
            let pos = rect.center_top() + egui::vec2(0.0, 20.0);
            let galley = painter.layout_no_wrap(message.clone(), egui::FontId::proportional(12.0), egui::Color32::WHITE);
            let bubble = egui::Rect::from_center_size(pos, galley.size() + egui::vec2(24.0, 12.0));
            painter.rect_filled(bubble, 5.0, bg_color);
            painter.text(pos, egui::Align2::CENTER_CENTER, message, egui::FontId::proportional(12.0), egui::Color32::WHITE);
        }
    }
}

impl MapRenderer for MapView {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_point_layer(&mut self, layer: &str, features: &FeatureCollection) {
        debug!("Layer '{}' now has {} points", layer, features.len());
        self.layers.insert(layer.to_string(), features.features.clone());
    }

    fn query_rendered_features(&self, layer: &str, point: ScreenPoint) -> Vec<FeatureProperties> {
        let Some(features) = self.layers.get(layer) else {
            return Vec::new();
        };

        let mut hits: Vec<(f32, &Feature)> = features
            .iter()
            .filter_map(|feature| {
                let p = self.to_screen(feature.position());
                let distance = (p.x - point.x).hypot(p.y - point.y);
                (self.in_view(p) && distance <= HIT_RADIUS_PX).then_some((distance, feature))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        hits.into_iter().map(|(_, feature)| feature.properties.clone()).collect()
    }

    fn fly_to(&mut self, center: LngLat, zoom: f64, speed: f64) {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        match self.flight.as_mut() {
            Some(flight) if !flight.is_finished() => flight.retarget(center, zoom, speed),
            _ => self.flight = Some(Flight::new(self.center, self.zoom, center, zoom, speed)),
        }
    }
}
