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

//! Map viewport ownership and animated transitions.
//!
//! Only one transition is ever in flight. A new `fly_to` while animating
//! retargets the running transition (cancel-and-supersede) instead of queuing.
//! Before the renderer is initialized, at most one request is buffered; a
//! later request overwrites it, and it is replayed once the renderer reports
//! ready.

mod flight;

pub use flight::Flight;

use log::debug;

use crate::event::LngLat;
use crate::renderer::MapRenderer;

/// Camera defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Initial center when nothing better is known.
    pub default_center: LngLat,
    /// Initial zoom.
    pub default_zoom: f64,
    /// Zoom used when flying to a selected event.
    pub focus_zoom: f64,
    /// Transition speed factor (1.0 nominal).
    pub speed: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_center: LngLat::new(2.3522, 48.8566),
            default_zoom: 12.0,
            focus_zoom: 14.0,
            speed: 1.2,
            min_zoom: 2.0,
            max_zoom: 18.0,
        }
    }
}

/// The map viewport as the camera controller last set or observed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub center: LngLat,
    pub zoom: f64,
    pub animating: bool,
}

/// A camera transition request.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyToRequest {
    pub center: LngLat,
    pub zoom: f64,
    pub speed: f64,
    /// Event the transition is for, used to drop it if that event goes stale.
    pub subject: Option<String>,
}

/// What a `fly_to` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOutcome {
    /// A transition started from rest.
    Started,
    /// A running transition was pointed at the new destination.
    Retargeted,
    /// Renderer not ready; the request was buffered.
    Buffered,
    /// Renderer not ready; the request overwrote an earlier buffered one.
    BufferReplaced,
}

/// Sole owner of [`ViewportState`].
#[derive(Debug)]
pub struct CameraController {
    config: CameraConfig,
    viewport: ViewportState,
    in_flight: Option<FlyToRequest>,
    pending: Option<FlyToRequest>,
}

impl CameraController {
    /// Start at `center`, or the configured default.
    #[must_use]
    pub fn new(config: CameraConfig, center: Option<LngLat>) -> Self {
        let viewport = ViewportState {
            center: center.filter(LngLat::is_finite).unwrap_or(config.default_center),
            zoom: config.default_zoom,
            animating: false,
        };
        Self {
            config,
            viewport,
            in_flight: None,
            pending: None,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    #[must_use]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Request buffered while the renderer was not ready.
    #[must_use]
    pub fn pending(&self) -> Option<&FlyToRequest> {
        self.pending.as_ref()
    }

    /// Request currently animating.
    #[must_use]
    pub fn in_flight(&self) -> Option<&FlyToRequest> {
        self.in_flight.as_ref()
    }

    /// Build a request to center on an event at the configured focus zoom.
    #[must_use]
    pub fn focus_request(&self, id: &str, center: LngLat) -> FlyToRequest {
        FlyToRequest {
            center,
            zoom: self.config.focus_zoom,
            speed: self.config.speed,
            subject: Some(id.to_string()),
        }
    }

    /// Animate to `request`, superseding anything in flight.
    pub fn fly_to<R: MapRenderer + ?Sized>(&mut self, renderer: &mut R, request: FlyToRequest) -> CameraOutcome {
        let request = FlyToRequest {
            zoom: request.zoom.clamp(self.config.min_zoom, self.config.max_zoom),
            ..request
        };

        if !renderer.is_ready() {
            let outcome = if self.pending.is_some() {
                CameraOutcome::BufferReplaced
            } else {
                CameraOutcome::Buffered
            };
            debug!("Renderer not ready, buffering camera request for {:?}", request.subject);
            self.pending = Some(request);
            return outcome;
        }

        self.start(renderer, request)
    }

    /// Replay the buffered request, unless `still_current` rejects its subject.
    pub fn on_renderer_ready<R, F>(&mut self, renderer: &mut R, still_current: F) -> Option<CameraOutcome>
    where
        R: MapRenderer + ?Sized,
        F: Fn(&str) -> bool,
    {
        let request = self.pending.take()?;
        if let Some(subject) = request.subject.as_deref() {
            if !still_current(subject) {
                debug!("Dropping buffered camera request for stale event {subject}");
                return None;
            }
        }
        Some(self.start(renderer, request))
    }

    /// Drop a buffered request whose subject `still_current` rejects.
    ///
    /// Returns `true` if a request was dropped. The running transition is
    /// left alone.
    pub fn discard_stale<F: Fn(&str) -> bool>(&mut self, still_current: F) -> bool {
        let stale = self
            .pending
            .as_ref()
            .and_then(|request| request.subject.as_deref())
            .is_some_and(|subject| !still_current(subject));
        if stale {
            debug!("Discarding stale buffered camera request");
            self.pending = None;
        }
        stale
    }

    /// The renderer finished moving (transition endpoint reached, or the
    /// user moved the map). Records where it ended up.
    pub fn on_move_end(&mut self, center: LngLat, zoom: f64) {
        self.viewport.center = center;
        self.viewport.zoom = zoom;
        self.viewport.animating = false;
        self.in_flight = None;
    }

    fn start<R: MapRenderer + ?Sized>(&mut self, renderer: &mut R, request: FlyToRequest) -> CameraOutcome {
        let outcome = if self.viewport.animating {
            CameraOutcome::Retargeted
        } else {
            CameraOutcome::Started
        };
        debug!(
            "Camera {:?} to ({:.5}, {:.5}) z{:.1}",
            outcome, request.center.lon, request.center.lat, request.zoom
        );
        renderer.fly_to(request.center, request.zoom, request.speed);
        self.viewport.animating = true;
        self.in_flight = Some(request);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FeatureCollection, FeatureProperties};
    use crate::renderer::ScreenPoint;

    #[derive(Default)]
    struct FakeRenderer {
        ready: bool,
        flights: Vec<(LngLat, f64, f64)>,
    }

    impl MapRenderer for FakeRenderer {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn set_point_layer(&mut self, _layer: &str, _features: &FeatureCollection) {}

        fn query_rendered_features(&self, _layer: &str, _point: ScreenPoint) -> Vec<FeatureProperties> {
            Vec::new()
        }

        fn fly_to(&mut self, center: LngLat, zoom: f64, speed: f64) {
            self.flights.push((center, zoom, speed));
        }
    }

    fn request(id: &str, lon: f64, lat: f64) -> FlyToRequest {
        FlyToRequest {
            center: LngLat::new(lon, lat),
            zoom: 14.0,
            speed: 1.0,
            subject: Some(id.to_string()),
        }
    }

    #[test]
    fn test_initial_viewport() {
        let camera = CameraController::new(CameraConfig::default(), Some(LngLat::new(5.0, 45.0)));
        assert_eq!(camera.viewport().center, LngLat::new(5.0, 45.0));
        assert!(!camera.viewport().animating);

        let camera = CameraController::new(CameraConfig::default(), Some(LngLat::new(f64::NAN, 0.0)));
        assert_eq!(camera.viewport().center, CameraConfig::default().default_center);
    }

    #[test]
    fn test_fly_to_then_supersede() {
        let mut renderer = FakeRenderer {
            ready: true,
            ..Default::default()
        };
        let mut camera = CameraController::new(CameraConfig::default(), None);

        assert_eq!(camera.fly_to(&mut renderer, request("a", 10.0, 20.0)), CameraOutcome::Started);
        assert!(camera.viewport().animating);
        assert_eq!(camera.fly_to(&mut renderer, request("b", 11.0, 21.0)), CameraOutcome::Retargeted);

        assert_eq!(renderer.flights.len(), 2);
        assert_eq!(camera.in_flight().and_then(|r| r.subject.as_deref()), Some("b"));

        camera.on_move_end(LngLat::new(11.0, 21.0), 14.0);
        assert!(!camera.viewport().animating);
        assert!(camera.in_flight().is_none());
        assert_eq!(camera.viewport().center, LngLat::new(11.0, 21.0));

        assert_eq!(camera.fly_to(&mut renderer, request("a", 10.0, 20.0)), CameraOutcome::Started);
    }

    #[test]
    fn test_buffer_until_ready_latest_wins() {
        let mut renderer = FakeRenderer::default();
        let mut camera = CameraController::new(CameraConfig::default(), None);

        assert_eq!(camera.fly_to(&mut renderer, request("a", 10.0, 20.0)), CameraOutcome::Buffered);
        assert_eq!(
            camera.fly_to(&mut renderer, request("b", 11.0, 21.0)),
            CameraOutcome::BufferReplaced
        );
        assert!(renderer.flights.is_empty());
        assert!(!camera.viewport().animating);

        renderer.ready = true;
        let outcome = camera.on_renderer_ready(&mut renderer, |_| true);

        assert_eq!(outcome, Some(CameraOutcome::Started));
        assert_eq!(renderer.flights, vec![(LngLat::new(11.0, 21.0), 14.0, 1.0)]);
        assert!(camera.pending().is_none());
        assert!(camera.on_renderer_ready(&mut renderer, |_| true).is_none());
    }

    #[test]
    fn test_stale_buffered_request_dropped() {
        let mut renderer = FakeRenderer::default();
        let mut camera = CameraController::new(CameraConfig::default(), None);
        camera.fly_to(&mut renderer, request("a", 10.0, 20.0));

        renderer.ready = true;
        assert!(camera.on_renderer_ready(&mut renderer, |id| id != "a").is_none());
        assert!(renderer.flights.is_empty());
    }

    #[test]
    fn test_discard_stale() {
        let mut renderer = FakeRenderer::default();
        let mut camera = CameraController::new(CameraConfig::default(), None);
        camera.fly_to(&mut renderer, request("a", 10.0, 20.0));

        assert!(!camera.discard_stale(|id| id == "a"));
        assert!(camera.pending().is_some());
        assert!(camera.discard_stale(|id| id == "b"));
        assert!(camera.pending().is_none());
    }

    #[test]
    fn test_zoom_clamped() {
        let mut renderer = FakeRenderer {
            ready: true,
            ..Default::default()
        };
        let mut camera = CameraController::new(CameraConfig::default(), None);
        let mut req = request("a", 0.0, 0.0);
        req.zoom = 40.0;

        camera.fly_to(&mut renderer, req);

        assert!((renderer.flights[0].1 - 18.0).abs() < f64::EPSILON);
    }
}
