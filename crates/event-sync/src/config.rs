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

//! External service endpoints.
//!
//! Built once by the application and handed to the components that need it.
//! Nothing in this crate reads the process environment.

use std::time::Duration;

/// Default events API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default base map tile template (`{s}`, `{z}`, `{x}`, `{y}` placeholders).
pub const DEFAULT_MAP_STYLE_URL: &str = "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}.png";

/// Endpoints and credentials for the services the application talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL of the events API; `/events` is appended.
    pub api_base_url: String,
    /// Base map tile URL template.
    pub map_style_url: String,
    /// Map provider key, if the tile source needs one.
    pub map_api_key: Option<String>,
    /// Timeout applied to the events request.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            map_style_url: DEFAULT_MAP_STYLE_URL.to_string(),
            map_api_key: None,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ServiceConfig {
    /// Full URL of the events collection.
    #[must_use]
    pub fn events_url(&self) -> String {
        format!("{}/events", self.api_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_trims_trailing_slash() {
        let config = ServiceConfig {
            api_base_url: "https://api.example.org/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.events_url(), "https://api.example.org/v1/events");
        assert_eq!(ServiceConfig::default().events_url(), "http://localhost:5000/api/events");
    }
}
