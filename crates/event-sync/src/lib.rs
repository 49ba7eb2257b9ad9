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

//! Selection synchronization between a map of events and a list of event cards.
//!
//! Three views have to agree at all times: a point layer on a map, a
//! scrollable list of cards, and the single selected event. This library
//! keeps them consistent while the user clicks on either view, the camera is
//! animating, and the event list is replaced underneath.
//!
//! - **Fetch layer** ([`fetch`]): one-shot download and normalization of events
//! - **Index layer** ([`index`]): point features and id lookups, rebuilt per list
//! - **Selection layer** ([`selection`]): the selection state machine
//! - **View layers** ([`camera`], [`list_sync`], [`hit_test`]): camera
//!   transitions, scroll-into-view and click resolution against the
//!   [`MapRenderer`] and [`ListPanel`] collaborator traits
//!
//! # Quick Start
//!
//! [`SyncEngine`] wires everything together:
//!
//! ```no_run
//! use event_sync::{EngineConfig, EventFetcher, ServiceConfig, SyncEngine};
//! # use event_sync::{FeatureCollection, FeatureProperties, ListPanel, LngLat, MapRenderer,
//! #     ScreenPoint, ScrollAlign, ScrollBehavior};
//! # struct Map;
//! # impl MapRenderer for Map {
//! #     fn is_ready(&self) -> bool { true }
//! #     fn set_point_layer(&mut self, _: &str, _: &FeatureCollection) {}
//! #     fn query_rendered_features(&self, _: &str, _: ScreenPoint) -> Vec<FeatureProperties> { Vec::new() }
//! #     fn fly_to(&mut self, _: LngLat, _: f64, _: f64) {}
//! # }
//! # struct Cards;
//! # impl ListPanel for Cards {
//! #     type Handle = usize;
//! #     fn scroll_into_view(&mut self, _: &usize, _: ScrollAlign, _: ScrollBehavior) {}
//! # }
//!
//! # async fn example() -> Result<(), event_sync::FetchError> {
//! let fetcher = EventFetcher::new(&ServiceConfig::default())?;
//! let mut engine = SyncEngine::new(EngineConfig::default(), Map, Cards, None);
//!
//! engine.replace_events(fetcher.fetch_or_empty().await);
//! engine.handle_map_click(ScreenPoint::new(320.0, 240.0));
//! println!("Selected: {:?}", engine.selection());
//! # Ok(())
//! # }
//! ```
//!
//! # Using Individual Layers
//!
//! ```
//! use event_sync::{Event, FeatureIndex, SelectionController, SideEffect};
//!
//! let index = FeatureIndex::build(vec![
//!     Event::new("a", 10.0, 20.0),
//!     Event::new("b", 11.0, 21.0),
//! ]);
//! let mut selection = SelectionController::default();
//!
//! let effects = selection.select_from_map(&index, "b");
//! assert!(matches!(effects[1], SideEffect::ScrollTo { .. }));
//! assert!(selection.select_from_map(&index, "b").is_empty());
//! ```

pub mod camera;
pub mod config;
pub mod engine;
pub mod event;
pub mod fetch;
pub mod hit_test;
pub mod index;
pub mod list_sync;
pub mod renderer;
pub mod selection;

pub use camera::{CameraConfig, CameraController, CameraOutcome, Flight, FlyToRequest, ViewportState};
pub use config::ServiceConfig;
pub use engine::{EngineConfig, SyncEngine};
pub use event::{Event, LngLat, Location};
pub use fetch::{EventFetcher, FetchError};
pub use hit_test::MapClickAdapter;
pub use index::{Feature, FeatureCollection, FeatureIndex, FeatureProperties, SkipReason, SkippedEvent};
pub use list_sync::{ListSync, ScrollRequest};
pub use renderer::{ListPanel, MapRenderer, ScreenPoint, ScrollAlign, ScrollBehavior, EVENT_LAYER};
pub use selection::{
    ClearReason, SelectionController, SelectionEvent, SelectionOrigin, SelectionState, SideEffect,
};
