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

//! One-shot retrieval of the event collection.
//!
//! A fetch is a single `GET {api_base_url}/events`. There is no pagination,
//! no retry and no cancellation at this layer: callers that stop caring about
//! a fetch drop its future.

mod record;

pub use record::{normalize_records, RawEvent, RawLocation};

use log::{error, info};
use serde_json::Value;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::event::Event;

/// Errors that can occur while fetching events.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid event payload: {0}")]
    Decode(String),
}

/// Client for the events endpoint.
#[derive(Debug, Clone)]
pub struct EventFetcher {
    client: reqwest::Client,
    url: String,
}

impl EventFetcher {
    /// Build a fetcher for the endpoint described by `config`.
    pub fn new(config: &ServiceConfig) -> Result<Self, FetchError> {
        let url = config.events_url();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        Ok(Self { client, url })
    }

    /// The URL this fetcher requests.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and normalize the full event list.
    pub async fn fetch(&self) -> Result<Vec<Event>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: self.url.clone(),
            source,
        })?;

        let records: Vec<Value> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let events = normalize_records(records);
        info!("Fetched {} events from {}", events.len(), self.url);
        Ok(events)
    }

    /// Fetch, turning any failure into an empty list.
    ///
    /// The failure is logged. The caller shows an empty state and does not retry.
    pub async fn fetch_or_empty(&self) -> Vec<Event> {
        match self.fetch().await {
            Ok(events) => events,
            Err(e) => {
                error!("Event fetch failed: {e}");
                Vec::new()
            }
        }
    }
}
