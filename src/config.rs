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

//! Application configuration management.
//!
//! Persistent configuration is stored as TOML through `confy`. Environment
//! variables override the file for the service endpoints, and command-line
//! flags override both. The result is turned into explicit config values for
//! the engine and fetcher once, at startup.

use std::time::Duration;

use event_sync::config::{DEFAULT_API_BASE_URL, DEFAULT_MAP_STYLE_URL};
use event_sync::{CameraConfig, EngineConfig, LngLat, ServiceConfig};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "eventmap-desktop";
const CONFIG_NAME: &str = "config";

/// Environment variable overriding `api_base_url`.
pub const API_BASE_URL_ENV: &str = "EVENTMAP_API_BASE_URL";
/// Environment variable overriding `map_style_url`.
pub const MAP_STYLE_URL_ENV: &str = "EVENTMAP_MAP_STYLE_URL";
/// Environment variable overriding `map_api_key`.
pub const MAP_API_KEY_ENV: &str = "EVENTMAP_MAP_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Base URL of the events API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base map tile URL template
    #[serde(default = "default_map_style_url")]
    pub map_style_url: String,

    /// Map provider key (optional, env var takes precedence)
    #[serde(default)]
    pub map_api_key: Option<String>,

    /// Events request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Zoom level at startup
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// Zoom level when flying to a selected event
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: f64,

    /// Camera transition speed (1.0 nominal)
    #[serde(default = "default_fly_speed")]
    pub fly_speed: f64,

    /// Event list panel width in pixels
    #[serde(default = "default_event_list_width")]
    pub event_list_width: f32,

    /// Look up the user's location by IP at startup
    #[serde(default = "default_true")]
    pub geolocate: bool,

    /// Override start latitude (for machines without a usable location)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    /// Override start longitude
    #[serde(default)]
    pub override_longitude: Option<f64>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_map_style_url() -> String {
    DEFAULT_MAP_STYLE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_zoom() -> f64 {
    12.0
}

fn default_focus_zoom() -> f64 {
    14.0
}

fn default_fly_speed() -> f64 {
    1.2
}

fn default_event_list_width() -> f32 {
    360.0
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            api_base_url: default_api_base_url(),
            map_style_url: default_map_style_url(),
            map_api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            default_zoom: default_zoom(),
            focus_zoom: default_focus_zoom(),
            fly_speed: default_fly_speed(),
            event_list_width: default_event_list_width(),
            geolocate: true,
            override_latitude: None,
            override_longitude: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(API_BASE_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(url) = non_empty(MAP_STYLE_URL_ENV) {
            self.map_style_url = url;
        }
        if let Some(key) = non_empty(MAP_API_KEY_ENV) {
            self.map_api_key = Some(key);
        }
    }

    /// Start location override, if both coordinates are configured.
    pub fn override_location(&self) -> Option<LngLat> {
        match (self.override_longitude, self.override_latitude) {
            (Some(lon), Some(lat)) => Some(LngLat::new(lon, lat)).filter(LngLat::is_finite),
            _ => None,
        }
    }

    /// Endpoints for the fetcher and the tile source.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            api_base_url: self.api_base_url.clone(),
            map_style_url: self.map_style_url.clone(),
            map_api_key: self.map_api_key.clone().filter(|k| !k.is_empty()),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    /// Engine settings.
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = CameraConfig::default();
        EngineConfig {
            camera: CameraConfig {
                default_zoom: sane_zoom(self.default_zoom, &defaults, defaults.default_zoom),
                focus_zoom: sane_zoom(self.focus_zoom, &defaults, defaults.focus_zoom),
                speed: if self.fly_speed.is_finite() && self.fly_speed > 0.0 {
                    self.fly_speed
                } else {
                    defaults.speed
                },
                ..defaults
            },
            ..EngineConfig::default()
        }
    }
}

/// Clamp a configured zoom into the camera's range; non-finite values fall back.
fn sane_zoom(zoom: f64, camera: &CameraConfig, fallback: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(camera.min_zoom, camera.max_zoom)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"api_base_url": "https://events.example.org"}"#).unwrap();
        assert_eq!(config.api_base_url, "https://events.example.org");
        assert_eq!(config.map_style_url, DEFAULT_MAP_STYLE_URL);
        assert!(config.geolocate);
        assert!((config.focus_zoom - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            (API_BASE_URL_ENV, "https://env.example.org/api"),
            (MAP_API_KEY_ENV, "secret"),
            (MAP_STYLE_URL_ENV, "   "),
        ]);
        let mut config = AppConfig::default();

        config.apply_env(|name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.api_base_url, "https://env.example.org/api");
        assert_eq!(config.map_api_key.as_deref(), Some("secret"));
        // Blank values are ignored.
        assert_eq!(config.map_style_url, DEFAULT_MAP_STYLE_URL);
    }

    #[test]
    fn test_service_config() {
        let config = AppConfig {
            map_api_key: Some(String::new()),
            request_timeout_secs: 0,
            ..Default::default()
        };
        let service = config.service_config();
        assert_eq!(service.map_api_key, None);
        assert_eq!(service.request_timeout, Duration::from_secs(1));
        assert_eq!(service.events_url(), format!("{DEFAULT_API_BASE_URL}/events"));
    }

    #[test]
    fn test_override_location_needs_both() {
        let mut config = AppConfig {
            override_latitude: Some(45.0),
            ..Default::default()
        };
        assert!(config.override_location().is_none());
        config.override_longitude = Some(5.0);
        assert_eq!(config.override_location(), Some(LngLat::new(5.0, 45.0)));
    }

    #[test]
    fn test_engine_config_sanitizes_camera() {
        let config = AppConfig {
            focus_zoom: 99.0,
            fly_speed: -1.0,
            ..Default::default()
        };
        let camera = config.engine_config().camera;
        assert!((camera.focus_zoom - camera.max_zoom).abs() < f64::EPSILON);
        assert!((camera.speed - CameraConfig::default().speed).abs() < f64::EPSILON);
    }

    #[test]
    fn test_engine_config_rejects_non_finite() {
        let config = AppConfig {
            default_zoom: f64::NAN,
            focus_zoom: f64::NEG_INFINITY,
            fly_speed: f64::INFINITY,
            ..Default::default()
        };
        let camera = config.engine_config().camera;
        let defaults = CameraConfig::default();
        assert!((camera.default_zoom - defaults.default_zoom).abs() < f64::EPSILON);
        assert!((camera.focus_zoom - defaults.focus_zoom).abs() < f64::EPSILON);
        assert!((camera.speed - defaults.speed).abs() < f64::EPSILON);
    }
}
