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

//! Keeps the selected card visible in the list panel.
//!
//! Card references are keyed by event id, not by list position, so filtering
//! or reordering the list cannot make a reference point at the wrong card.
//! A scroll request for a card that is not mounted is dropped silently.

use std::collections::HashMap;

use log::debug;

use crate::index::FeatureIndex;
use crate::renderer::{ListPanel, ScrollAlign, ScrollBehavior};

/// A scroll that was handed to the list panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    pub id: String,
    /// Position of the card in the current list.
    pub position: usize,
}

/// Registry of mounted cards plus the scroll-into-view policy.
#[derive(Debug)]
pub struct ListSync<H> {
    mounted: HashMap<String, H>,
    align: ScrollAlign,
    behavior: ScrollBehavior,
}

impl<H> Default for ListSync<H> {
    fn default() -> Self {
        Self::new(ScrollAlign::Center, ScrollBehavior::Smooth)
    }
}

impl<H> ListSync<H> {
    #[must_use]
    pub fn new(align: ScrollAlign, behavior: ScrollBehavior) -> Self {
        Self {
            mounted: HashMap::new(),
            align,
            behavior,
        }
    }

    /// A card for `id` was rendered.
    pub fn mount(&mut self, id: impl Into<String>, handle: H) {
        self.mounted.insert(id.into(), handle);
    }

    /// The card for `id` went away.
    pub fn unmount(&mut self, id: &str) -> Option<H> {
        self.mounted.remove(id)
    }

    #[must_use]
    pub fn is_mounted(&self, id: &str) -> bool {
        self.mounted.contains_key(id)
    }

    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Forget references to cards whose event is not in `index`.
    pub fn retain_listed(&mut self, index: &FeatureIndex) {
        let before = self.mounted.len();
        self.mounted.retain(|id, _| index.contains(id));
        let dropped = before - self.mounted.len();
        if dropped > 0 {
            debug!("Released {dropped} card references after list replacement");
        }
    }

    /// Ask `panel` to bring the card for `id` into view.
    ///
    /// Returns `None` without touching the panel when `id` is not in the
    /// list or its card is not mounted. Never retries.
    pub fn scroll_to<P>(&self, panel: &mut P, index: &FeatureIndex, id: &str) -> Option<ScrollRequest>
    where
        P: ListPanel<Handle = H> + ?Sized,
    {
        let Some(position) = index.position_of(id) else {
            debug!("Scroll target {id} not in current list");
            return None;
        };
        let Some(handle) = self.mounted.get(id) else {
            debug!("Scroll target {id} at position {position} not mounted yet");
            return None;
        };

        panel.scroll_into_view(handle, self.align, self.behavior);
        Some(ScrollRequest {
            id: id.to_string(),
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[derive(Default)]
    struct FakePanel {
        scrolled: Vec<(u32, ScrollAlign, ScrollBehavior)>,
    }

    impl ListPanel for FakePanel {
        type Handle = u32;

        fn scroll_into_view(&mut self, handle: &u32, align: ScrollAlign, behavior: ScrollBehavior) {
            self.scrolled.push((*handle, align, behavior));
        }
    }

    fn index() -> FeatureIndex {
        FeatureIndex::build(vec![Event::new("a", 10.0, 20.0), Event::new("b", 11.0, 21.0)])
    }

    #[test]
    fn test_scroll_to_mounted_card() {
        let index = index();
        let mut panel = FakePanel::default();
        let mut sync = ListSync::default();
        sync.mount("a", 100);
        sync.mount("b", 200);

        let request = sync.scroll_to(&mut panel, &index, "b");

        assert_eq!(
            request,
            Some(ScrollRequest {
                id: "b".to_string(),
                position: 1,
            })
        );
        assert_eq!(panel.scrolled, vec![(200, ScrollAlign::Center, ScrollBehavior::Smooth)]);
    }

    #[test]
    fn test_unmounted_card_is_silent_noop() {
        let index = index();
        let mut panel = FakePanel::default();
        let mut sync = ListSync::default();
        sync.mount("a", 100);

        assert!(sync.scroll_to(&mut panel, &index, "b").is_none());
        assert!(sync.scroll_to(&mut panel, &index, "missing").is_none());
        assert!(panel.scrolled.is_empty());
    }

    #[test]
    fn test_unmount_and_retain() {
        let mut sync = ListSync::default();
        sync.mount("a", 1);
        sync.mount("b", 2);
        sync.mount("gone", 3);

        assert_eq!(sync.unmount("a"), Some(1));
        sync.retain_listed(&index());

        assert!(!sync.is_mounted("a"));
        assert!(sync.is_mounted("b"));
        assert!(!sync.is_mounted("gone"));
        assert_eq!(sync.mounted_count(), 1);
    }

    #[test]
    fn test_position_follows_reordered_list() {
        let mut panel = FakePanel::default();
        let mut sync = ListSync::default();
        sync.mount("a", 1);

        let reordered = FeatureIndex::build(vec![Event::new("b", 11.0, 21.0), Event::new("a", 10.0, 20.0)]);
        let request = sync.scroll_to(&mut panel, &reordered, "a").unwrap();

        assert_eq!(request.position, 1);
        assert_eq!(panel.scrolled[0].0, 1);
    }
}
