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

//! Selection state machine.
//!
//! The controller is the only owner of "which event is selected". It never
//! touches the camera or the list itself: each transition returns the side
//! effects it wants and the caller routes them. State changes are also
//! published on a broadcast channel for observers.
//!
//! ```text
//!              select_from_map / select_from_list (new id)
//!  Unselected ─────────────────────────────────────────────▶ Selected(id)
//!      ▲                                                        │
//!      └──────────── clear() / list replaced without id ◀──────┘
//! ```

use log::debug;
use tokio::sync::broadcast;

use crate::event::LngLat;
use crate::index::FeatureIndex;

/// Current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(String),
}

impl SelectionState {
    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        match self {
            Self::Unselected => None,
            Self::Selected(id) => Some(id),
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_id() == Some(id)
    }
}

/// Which view a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    Map,
    List,
}

/// Request emitted by a transition for another component to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Move the camera to the selected event.
    FlyTo { id: String, center: LngLat },
    /// Bring the selected event's card into view.
    ScrollTo { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// Explicit `clear()`.
    User,
    /// The event list was replaced and no longer contains the selection.
    Invalidated,
}

/// Published on every state change.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Selected { id: String, origin: SelectionOrigin },
    Cleared { previous: String, reason: ClearReason },
}

/// Single source of truth for the selected event.
#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    event_tx: broadcast::Sender<SelectionEvent>,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SelectionController {
    /// Create an unselected controller. `event_capacity` sizes the broadcast channel.
    #[must_use]
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: SelectionState::Unselected,
            event_tx,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Subscribe to selection changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.event_tx.subscribe()
    }

    /// A feature on the map was clicked. Requests both a fly-to and a scroll.
    pub fn select_from_map(&mut self, index: &FeatureIndex, feature_id: &str) -> Vec<SideEffect> {
        self.select(index, feature_id, SelectionOrigin::Map)
    }

    /// A card in the list was clicked. Requests only a fly-to; the card is
    /// already on screen.
    pub fn select_from_list(&mut self, index: &FeatureIndex, id: &str) -> Vec<SideEffect> {
        self.select(index, id, SelectionOrigin::List)
    }

    /// Drop the selection. The camera is left where it is.
    ///
    /// Returns `true` if something was selected.
    pub fn clear(&mut self) -> bool {
        self.clear_with(ClearReason::User)
    }

    /// Re-validate against a freshly built index.
    ///
    /// Returns `true` if the selection was dropped. No side effects are
    /// requested either way.
    pub fn on_event_list_replaced(&mut self, index: &FeatureIndex) -> bool {
        let stale = matches!(&self.state, SelectionState::Selected(id) if !index.contains(id));
        if !stale {
            return false;
        }
        debug!("Selected event no longer in list, clearing {:?}", self.state);
        self.clear_with(ClearReason::Invalidated)
    }

    fn select(&mut self, index: &FeatureIndex, id: &str, origin: SelectionOrigin) -> Vec<SideEffect> {
        let Some(event) = index.get(id) else {
            debug!("Ignoring {origin:?} selection of unknown event {id}");
            return Vec::new();
        };

        if self.state.is_selected(id) {
            return Vec::new();
        }

        self.state = SelectionState::Selected(event.id.clone());
        let _ = self.event_tx.send(SelectionEvent::Selected {
            id: event.id.clone(),
            origin,
        });

        let mut effects = Vec::with_capacity(2);
        if let Some(center) = event.location.point() {
            effects.push(SideEffect::FlyTo {
                id: event.id.clone(),
                center,
            });
        }
        if origin == SelectionOrigin::Map {
            effects.push(SideEffect::ScrollTo {
                id: event.id.clone(),
            });
        }
        effects
    }

    fn clear_with(&mut self, reason: ClearReason) -> bool {
        match std::mem::take(&mut self.state) {
            SelectionState::Unselected => false,
            SelectionState::Selected(previous) => {
                let _ = self.event_tx.send(SelectionEvent::Cleared { previous, reason });
                true
            }
        }
    }
}
