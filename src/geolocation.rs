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

//! Approximate user location from the public IP address.

use std::time::Duration;

use event_sync::LngLat;
use log::{info, warn};
use serde_json::Value;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// A lookup service and the JSON keys it reports coordinates under.
struct Provider {
    url: &'static str,
    lat_key: &'static str,
    lon_key: &'static str,
}

const PROVIDERS: [Provider; 2] = [
    Provider {
        url: "https://ipapi.co/json/",
        lat_key: "latitude",
        lon_key: "longitude",
    },
    // No API key needed
    Provider {
        url: "http://ip-api.com/json/",
        lat_key: "lat",
        lon_key: "lon",
    },
];

/// Pull a finite coordinate pair out of a provider response.
fn parse_location(value: &Value, lat_key: &str, lon_key: &str) -> Option<LngLat> {
    let lat = value.get(lat_key).and_then(Value::as_f64)?;
    let lon = value.get(lon_key).and_then(Value::as_f64)?;
    Some(LngLat::new(lon, lat)).filter(LngLat::is_finite)
}

/// Try each provider in turn. `None` if all of them fail.
pub fn get_current_location() -> Option<LngLat> {
    info!("Fetching current location...");

    let client = match reqwest::blocking::Client::builder().timeout(LOOKUP_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build geolocation client: {}", e);
            return None;
        }
    };

    for provider in &PROVIDERS {
        let value = client
            .get(provider.url)
            .send()
            .and_then(reqwest::blocking::Response::json::<Value>);
        match value {
            Ok(value) => {
                if let Some(location) = parse_location(&value, provider.lat_key, provider.lon_key) {
                    info!("Location found via {}: {}, {}", provider.url, location.lat, location.lon);
                    return Some(location);
                }
                warn!("No coordinates in response from {}", provider.url);
            }
            Err(e) => warn!("Geolocation via {} failed: {}", provider.url, e),
        }
    }

    warn!("Failed to fetch location from all sources");
    None
}
