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

mod app;
mod config;
mod event_list;
mod geolocation;
mod map_view;
mod tiles;

use clap::Parser;
use eframe::egui;
use log::{info, warn};

use app::EventMapApp;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse sports events on a map and in a synchronized list")]
struct Args {
    /// Base URL of the events API (overrides config file and environment)
    #[arg(long)]
    api_url: Option<String>,

    /// Base map tile URL template with {s}, {z}, {x}, {y} and {key} placeholders
    #[arg(long)]
    map_style_url: Option<String>,

    /// Skip IP geolocation and start at the configured or default center
    #[arg(long)]
    no_geolocate: bool,
}

impl Args {
    /// Command-line flags win over file and environment.
    fn apply(self, config: &mut AppConfig) {
        if let Some(url) = self.api_url {
            config.api_base_url = url;
        }
        if let Some(url) = self.map_style_url {
            config.map_style_url = url;
        }
        if self.no_geolocate {
            config.geolocate = false;
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting Event Map...");

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        info!("Config file: {}", path.display());
    }
    config.apply_env(|name| std::env::var(name).ok());
    args.apply(&mut config);

    let start = config.override_location().or_else(|| {
        if config.geolocate {
            geolocation::get_current_location()
        } else {
            None
        }
    });
    if start.is_none() {
        info!("Using default map center");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("Event Map"),
        ..Default::default()
    };

    eframe::run_native(
        "Event Map",
        options,
        Box::new(move |cc| Ok(Box::new(EventMapApp::new(&config, start, &cc.egui_ctx)))),
    )
}
