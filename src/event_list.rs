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

//! Scrollable list of event cards.
//!
//! egui redraws every card each frame, so "mounting" means a card was laid
//! out this frame. Scroll requests are stored and carried out when the
//! matching card is drawn.

use std::collections::HashSet;

use eframe::egui;
use event_sync::{Event, ListPanel, ScrollAlign, ScrollBehavior};
use log::trace;

/// A scroll request waiting for its card to be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingScroll {
    pub card: egui::Id,
    pub align: ScrollAlign,
    pub behavior: ScrollBehavior,
}

/// Cards drawn during one frame.
#[derive(Debug, Default)]
pub struct ListFrame {
    /// Event id of a clicked card.
    pub clicked: Option<String>,
    /// Every card laid out this frame.
    pub rendered: Vec<(String, egui::Id)>,
}

/// Cards that appeared or went away since the previous frame.
#[derive(Debug, Default, PartialEq)]
pub struct MountChanges {
    pub mounted: Vec<(String, egui::Id)>,
    pub unmounted: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EventList {
    pending: Option<PendingScroll>,
    visible: HashSet<String>,
}

impl EventList {
    /// Stable widget id of the card for `event_id`.
    pub fn card_id(event_id: &str) -> egui::Id {
        egui::Id::new(("event-card", event_id))
    }

    pub fn take_pending(&mut self) -> Option<PendingScroll> {
        self.pending.take()
    }

    /// Diff this frame's cards against the previous frame's.
    pub fn reconcile(&mut self, rendered: &[(String, egui::Id)]) -> MountChanges {
        let now: HashSet<&str> = rendered.iter().map(|(id, _)| id.as_str()).collect();
        let mut changes = MountChanges::default();

        for (id, card) in rendered {
            if !self.visible.contains(id) {
                changes.mounted.push((id.clone(), *card));
            }
        }
        changes.unmounted = self
            .visible
            .iter()
            .filter(|id| !now.contains(id.as_str()))
            .cloned()
            .collect();
        changes.unmounted.sort();

        self.visible = now.into_iter().map(str::to_string).collect();
        changes
    }

    /// Draw the cards. `confirm` is asked whether a pending scroll still
    /// applies when its card comes up.
    pub fn show<F>(ui: &mut egui::Ui, events: &[Event], selected: Option<&str>, pending: Option<PendingScroll>, confirm: F) -> ListFrame
    where
        F: Fn(&str) -> bool,
    {
        let mut frame = ListFrame::default();
        let mut pending = pending;

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for event in events {
                let card = Self::card_id(&event.id);
                let is_selected = selected == Some(event.id.as_str());
                let response = ui.push_id(card, |ui| draw_card(ui, event, is_selected)).inner;

                if response.clicked() {
                    frame.clicked = Some(event.id.clone());
                }

                if let Some(scroll) = pending.filter(|p| p.card == card) {
                    pending = None;
                    if confirm(&event.id) {
                        trace!("Scrolling card {} into view", event.id);
                        response.scroll_to_me_animation(Some(to_align(scroll.align)), to_animation(scroll.behavior));
                    }
                }

                frame.rendered.push((event.id.clone(), card));
                ui.add_space(3.0);
            }
        });

        frame
    }
}

impl ListPanel for EventList {
    type Handle = egui::Id;

    fn scroll_into_view(&mut self, handle: &egui::Id, align: ScrollAlign, behavior: ScrollBehavior) {
        self.pending = Some(PendingScroll {
            card: *handle,
            align,
            behavior,
        });
    }
}

fn to_align(align: ScrollAlign) -> egui::Align {
    match align {
        ScrollAlign::Start => egui::Align::Min,
        ScrollAlign::Center => egui::Align::Center,
        ScrollAlign::End => egui::Align::Max,
    }
}

fn to_animation(behavior: ScrollBehavior) -> egui::style::ScrollAnimation {
    match behavior {
        ScrollBehavior::Smooth => egui::style::ScrollAnimation::default(),
        ScrollBehavior::Instant => egui::style::ScrollAnimation::none(),
    }
}

/// Human-readable start date, falling back to what the API sent.
pub fn format_date(event: &Event) -> String {
    event
        .starts_at()
        .map_or_else(|| event.date.clone(), |dt| dt.format("%a %-d %b %Y, %H:%M").to_string())
}

fn draw_card(ui: &mut egui::Ui, event: &Event, is_selected: bool) -> egui::Response {
    let frame = if is_selected {
        egui::Frame::group(ui.style()).fill(egui::Color32::from_rgba_unmultiplied(100, 140, 180, 220))
    } else {
        egui::Frame::group(ui.style())
    };

    let inner = frame.show(ui, |ui| {
        ui.set_width(ui.available_width());

        ui.horizontal(|ui| {
            let title = if event.category.is_empty() { "Event" } else { event.category.as_str() };
            ui.label(egui::RichText::new(title).size(13.0).strong());
            if event.location.point().is_none() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new("no location").size(9.0).weak());
                });
            }
        });

        ui.label(egui::RichText::new(format_date(event)).size(10.0).monospace());

        if !event.address.is_empty() {
            ui.label(egui::RichText::new(&event.address).size(10.0));
        }

        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;
            if let Some(level) = &event.difficulty_level {
                ui.label(egui::RichText::new(format!("Level: {level}")).size(9.0).weak());
            }
            if let Some(duration) = &event.duration {
                ui.label(egui::RichText::new(format!("Duration: {duration}")).size(9.0).weak());
            }
        });

        if let Some(organizer) = &event.organizer {
            ui.label(egui::RichText::new(format!("By {organizer}")).size(9.0).italics());
        }
    });

    inner.response.interact(egui::Sense::click())
}
