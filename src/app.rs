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

use std::sync::mpsc;

use eframe::egui;
use event_sync::{
    ClearReason, Event, EventFetcher, LngLat, SelectionEvent, SelectionOrigin, SyncEngine,
};
use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::event_list::EventList;
use crate::map_view::MapView;
use crate::tiles::TileManager;

type FetchResult = Result<Vec<Event>, String>;

/// Run one fetch on a background thread. The result arrives on the returned
/// channel unless `token` is cancelled first.
fn spawn_fetch(fetcher: EventFetcher, token: CancellationToken, ctx: egui::Context) -> mpsc::Receiver<FetchResult> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to start fetch runtime: {}", e);
                let _ = tx.send(Err(e.to_string()));
                return;
            }
        };

        let result = rt.block_on(async {
            tokio::select! {
                () = token.cancelled() => None,
                result = fetcher.fetch() => Some(result),
            }
        });

        match result {
            Some(result) => {
                if let Err(e) = &result {
                    error!("Event fetch failed: {}", e);
                }
                // The receiver is gone if a newer fetch replaced this one.
                let _ = tx.send(result.map_err(|e| e.to_string()));
                ctx.request_repaint();
            }
            None => debug!("Event fetch cancelled"),
        }
    });

    rx
}

/// Distinct non-empty categories, sorted.
fn categories_of(events: &[Event]) -> Vec<String> {
    let mut categories: Vec<String> = events
        .iter()
        .filter(|e| !e.category.is_empty())
        .map(|e| e.category.clone())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}

fn filter_events(events: &[Event], category: Option<&str>) -> Vec<Event> {
    events
        .iter()
        .filter(|e| category.is_none_or(|c| e.category == c))
        .cloned()
        .collect()
}

pub struct EventMapApp {
    engine: SyncEngine<MapView, EventList>,
    tiles: TileManager,
    fetcher: Option<EventFetcher>,
    fetch_rx: Option<mpsc::Receiver<FetchResult>>,
    fetch_token: Option<CancellationToken>,
    shutdown: CancellationToken,
    selection_events: broadcast::Receiver<SelectionEvent>,
    all_events: Vec<Event>,
    categories: Vec<String>,
    category_filter: Option<String>,
    fetch_error: Option<String>,
    last_fetched: Option<chrono::DateTime<chrono::Local>>,
    last_activity: Option<String>,
    list_width: f32,
}

impl std::fmt::Debug for EventMapApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMapApp")
            .field("engine", &self.engine)
            .field("category_filter", &self.category_filter)
            .field("fetch_error", &self.fetch_error)
            .finish_non_exhaustive()
    }
}

impl EventMapApp {
    pub fn new(config: &AppConfig, start: Option<LngLat>, ctx: &egui::Context) -> Self {
        let service = config.service_config();
        let engine_config = config.engine_config();
        let camera = &engine_config.camera;
        let map = MapView::new(
            start.unwrap_or(camera.default_center),
            camera.default_zoom,
            camera.min_zoom,
            camera.max_zoom,
        );
        let engine = SyncEngine::new(engine_config, map, EventList::default(), start);
        let selection_events = engine.subscribe();

        let (fetcher, fetch_error) = match EventFetcher::new(&service) {
            Ok(fetcher) => (Some(fetcher), None),
            Err(e) => {
                error!("Cannot create event fetcher: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let mut app = Self {
            engine,
            tiles: TileManager::new(service.map_style_url.clone(), service.map_api_key.clone()),
            fetcher,
            fetch_rx: None,
            fetch_token: None,
            shutdown: CancellationToken::new(),
            selection_events,
            all_events: Vec::new(),
            categories: Vec::new(),
            category_filter: None,
            fetch_error,
            last_fetched: None,
            last_activity: None,
            list_width: config.event_list_width,
        };
        app.reload(ctx);
        app
    }

    /// Start a fresh fetch, abandoning one still in progress.
    fn reload(&mut self, ctx: &egui::Context) {
        let Some(fetcher) = self.fetcher.clone() else {
            return;
        };
        if let Some(token) = self.fetch_token.take() {
            token.cancel();
        }
        info!("Fetching events from {}", fetcher.url());
        let token = self.shutdown.child_token();
        self.fetch_rx = Some(spawn_fetch(fetcher, token.clone(), ctx.clone()));
        self.fetch_token = Some(token);
    }

    fn is_loading(&self) -> bool {
        self.fetch_rx.is_some()
    }

    fn poll_fetch(&mut self) {
        let Some(rx) = &self.fetch_rx else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.fetch_rx = None;
                self.fetch_token = None;
                return;
            }
        };
        self.fetch_rx = None;
        self.fetch_token = None;
        self.last_fetched = Some(chrono::Local::now());

        match result {
            Ok(events) => {
                self.fetch_error = None;
                self.all_events = events;
            }
            Err(e) => {
                // Show an empty state rather than a stale list.
                self.fetch_error = Some(e);
                self.all_events.clear();
            }
        }
        self.categories = categories_of(&self.all_events);
        if self
            .category_filter
            .as_ref()
            .is_some_and(|c| !self.categories.contains(c))
        {
            self.category_filter = None;
        }
        self.apply_filter();
    }

    /// Hand the filtered list to the engine as a list replacement.
    fn apply_filter(&mut self) {
        let events = filter_events(&self.all_events, self.category_filter.as_deref());
        self.engine.replace_events(events);
    }

    fn drain_selection_events(&mut self) {
        loop {
            match self.selection_events.try_recv() {
                Ok(SelectionEvent::Selected { id, origin }) => {
                    let side = match origin {
                        SelectionOrigin::Map => "map",
                        SelectionOrigin::List => "list",
                    };
                    self.last_activity = Some(format!("Selected {id} from the {side}"));
                }
                Ok(SelectionEvent::Cleared { previous, reason }) => {
                    self.last_activity = Some(match reason {
                        ClearReason::User => format!("Cleared {previous}"),
                        ClearReason::Invalidated => format!("{previous} is no longer listed"),
                    });
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Missed {} selection events", skipped);
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Event Map").strong().size(15.0));
            ui.separator();

            let before = self.category_filter.clone();
            egui::ComboBox::from_label("Category")
                .selected_text(self.category_filter.as_deref().unwrap_or("All"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.category_filter, None, "All");
                    for category in &self.categories {
                        ui.selectable_value(&mut self.category_filter, Some(category.clone()), category.as_str());
                    }
                });
            if self.category_filter != before {
                debug!("Category filter changed to {:?}", self.category_filter);
                self.apply_filter();
            }

            let has_selection = self.engine.selection().selected_id().is_some();
            if ui.add_enabled(has_selection, egui::Button::new("Clear")).clicked() {
                self.engine.clear_selection();
            }

            if ui.add_enabled(self.fetcher.is_some(), egui::Button::new("Reload")).clicked() {
                self.reload(ui.ctx());
            }
            if self.is_loading() {
                ui.spinner();
            }
        });
    }

    fn draw_status(&self, ui: &mut egui::Ui) {
        let index = self.engine.index();
        ui.horizontal(|ui| {
            ui.label(format!(
                "{} events | {} on map | {} skipped",
                index.len(),
                index.features().len(),
                index.skipped().len()
            ));
            if let Some(at) = self.last_fetched {
                ui.label(egui::RichText::new(format!("updated {}", at.format("%H:%M:%S"))).weak());
            }
            let map = self.engine.renderer();
            ui.separator();
            ui.label(
                egui::RichText::new(format!("{:.4}, {:.4} z{:.1}", map.center().lat, map.center().lon, map.zoom()))
                    .monospace()
                    .weak(),
            );
            if let Some(activity) = &self.last_activity {
                ui.separator();
                ui.label(activity);
            }
            if let Some(e) = &self.fetch_error {
                ui.separator();
                ui.colored_label(egui::Color32::from_rgb(220, 50, 50), format!("Fetch failed: {e}"));
            }
        });
    }

    fn draw_event_list(&mut self, ui: &mut egui::Ui, selected: Option<&str>) {
        ui.label(egui::RichText::new(format!("Events ({})", self.engine.index().len())).strong());
        ui.add_space(4.0);

        if self.engine.index().is_empty() {
            let message = if self.is_loading() { "Loading events..." } else { "No events to show" };
            ui.label(egui::RichText::new(message).weak());
        }

        let pending = self.engine.list_panel_mut().take_pending();
        let engine = &self.engine;
        let frame = EventList::show(ui, engine.index().events(), selected, pending, |id| engine.confirm_scroll(id));

        let changes = self.engine.list_panel_mut().reconcile(&frame.rendered);
        for id in &changes.unmounted {
            self.engine.unmount_card(id);
        }
        for (id, card) in changes.mounted {
            self.engine.mount_card(id, card);
        }

        if let Some(id) = frame.clicked {
            self.engine.select_from_list(&id);
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui, selected: Option<&str>) {
        let frame = self.engine.renderer_mut().draw(ui, &self.tiles, selected);

        if frame.became_ready {
            self.engine.on_renderer_ready();
        }
        if let Some((center, zoom)) = frame.settled {
            self.engine.on_camera_idle(center, zoom);
        }
        if let Some(point) = frame.clicked {
            self.engine.handle_map_click(point);
        }
    }
}

impl eframe::App for EventMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_fetch();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.draw_toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.draw_status(ui));

        let selected = self.engine.selection().selected_id().map(str::to_string);
        egui::SidePanel::right("event_list")
            .default_width(self.list_width)
            .show(ctx, |ui| self.draw_event_list(ui, selected.as_deref()));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_map(ui, selected.as_deref()));

        self.drain_selection_events();
    }
}

impl Drop for EventMapApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, category: &str) -> Event {
        Event {
            category: category.to_string(),
            ..Event::new(id, 0.0, 0.0)
        }
    }

    #[test]
    fn test_categories_sorted_unique_non_empty() {
        let events = vec![event("1", "trail"), event("2", ""), event("3", "cycling"), event("4", "trail")];
        assert_eq!(categories_of(&events), vec!["cycling", "trail"]);
    }

    #[test]
    fn test_filter_events() {
        let events = vec![event("1", "trail"), event("2", "cycling"), event("3", "trail")];

        let ids = |list: Vec<Event>| list.into_iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(filter_events(&events, Some("trail"))), vec!["1", "3"]);
        assert_eq!(ids(filter_events(&events, None)).len(), 3);
        assert!(filter_events(&events, Some("rowing")).is_empty());
    }
}
