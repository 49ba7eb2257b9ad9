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

//! Raster base map tiles: projection, download and a disk cache.

use egui::{ColorImage, TextureHandle};
use event_sync::LngLat;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

pub const TILE_SIZE: f64 = 256.0;
const CACHE_DURATION_DAYS: u64 = 7;
const MAX_TILE_ZOOM: u8 = 19;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Web Mercator projection utilities.
///
/// Coordinates are in tile units at the given (possibly fractional) zoom:
/// the world spans `0.0..2^zoom` on both axes.
pub struct WebMercator;

impl WebMercator {
    fn world_size(zoom: f64) -> f64 {
        2_f64.powf(zoom)
    }

    /// Convert latitude to Web Mercator Y coordinate
    pub fn lat_to_y(lat: f64, zoom: f64) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * Self::world_size(zoom)
    }

    /// Convert longitude to Web Mercator X coordinate
    pub fn lon_to_x(lon: f64, zoom: f64) -> f64 {
        ((lon + 180.0) / 360.0) * Self::world_size(zoom)
    }

    /// Convert tile coordinates back to latitude
    pub fn tile_to_lat(y: f64, zoom: f64) -> f64 {
        let n = Self::world_size(zoom);
        let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    pub fn tile_to_lon(x: f64, zoom: f64) -> f64 {
        x / Self::world_size(zoom) * 360.0 - 180.0
    }

    /// Pixel offset of `point` from `center` in a view at `zoom`.
    pub fn offset_px(point: LngLat, center: LngLat, zoom: f64) -> (f64, f64) {
        let dx = Self::lon_to_x(point.lon, zoom) - Self::lon_to_x(center.lon, zoom);
        let dy = Self::lat_to_y(point.lat, zoom) - Self::lat_to_y(center.lat, zoom);
        (dx * TILE_SIZE, dy * TILE_SIZE)
    }

    /// The geographic point `(dx, dy)` pixels away from `center`.
    pub fn offset_to_lnglat(center: LngLat, dx: f64, dy: f64, zoom: f64) -> LngLat {
        let x = Self::lon_to_x(center.lon, zoom) + dx / TILE_SIZE;
        let y = Self::lat_to_y(center.lat, zoom) + dy / TILE_SIZE;
        let max = Self::world_size(zoom);
        LngLat::new(
            Self::tile_to_lon(x.rem_euclid(max), zoom),
            Self::tile_to_lat(y.clamp(0.0, max), zoom),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Expand a `{s}/{z}/{x}/{y}/{key}` URL template for this tile.
    pub fn url(&self, template: &str, api_key: Option<&str>) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((self.x + self.y) % 4) as usize];
        template
            .replace("{s}", &subdomain.to_string())
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
            .replace("{key}", api_key.unwrap_or_default())
    }

    /// Cache filename based on hash of the tile URL
    fn cache_filename(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}.png", hasher.finalize())
    }
}

/// A tile placed relative to the view center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleTile {
    pub coord: TileCoord,
    /// Offset of the tile's top-left corner from the view center, in pixels.
    pub offset_x: f32,
    pub offset_y: f32,
    /// Edge length on screen; differs from 256 at fractional zoom levels.
    pub size: f32,
}

enum TileState {
    Loading,
    Loaded(TextureHandle),
    Failed,
}

type TileTable = Arc<Mutex<HashMap<TileCoord, TileState>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TileManager {
    cache_dir: PathBuf,
    url_template: String,
    api_key: Option<String>,
    tiles: TileTable,
    download_queue: Arc<Mutex<HashSet<TileCoord>>>,
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("cache_dir", &self.cache_dir)
            .field("url_template", &self.url_template)
            .finish_non_exhaustive()
    }
}

impl TileManager {
    pub fn new(url_template: impl Into<String>, api_key: Option<String>) -> Self {
        let cache_dir = Self::get_cache_dir();

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create tile cache directory {}: {}", cache_dir.display(), e);
        }

        Self::cleanup_old_tiles(&cache_dir);

        Self {
            cache_dir,
            url_template: url_template.into(),
            api_key,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            download_queue: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn get_cache_dir() -> PathBuf {
        let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        path.push("eventmap-desktop");
        path.push("tiles");
        path
    }

    fn cleanup_old_tiles(cache_dir: &Path) {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(CACHE_DURATION_DAYS * 24 * 60 * 60);

        let Ok(entries) = fs::read_dir(cache_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired {
                match fs::remove_file(entry.path()) {
                    Ok(()) => debug!("Removed old tile cache: {}", entry.path().display()),
                    Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
                }
            }
        }
    }

    fn tile_url(&self, coord: TileCoord) -> String {
        coord.url(&self.url_template, self.api_key.as_deref())
    }

    /// Get tile from cache or queue for download
    pub fn get_tile(&self, coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
        let mut tiles = lock(&self.tiles);

        match tiles.get(&coord) {
            Some(TileState::Loaded(texture)) => Some(texture.clone()),
            Some(TileState::Loading | TileState::Failed) => None,
            None => {
                let url = self.tile_url(coord);
                let cache_path = self.cache_dir.join(TileCoord::cache_filename(&url));

                if cache_path.exists() {
                    match fs::read(&cache_path)
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| decode_texture(&bytes, coord, ctx))
                    {
                        Ok(texture) => {
                            tiles.insert(coord, TileState::Loaded(texture.clone()));
                            return Some(texture);
                        }
                        Err(e) => warn!("Failed to load cached tile {}: {}", cache_path.display(), e),
                    }
                }

                tiles.insert(coord, TileState::Loading);
                drop(tiles);
                self.queue_download(coord, url, ctx.clone());
                None
            }
        }
    }

    fn queue_download(&self, coord: TileCoord, url: String, ctx: egui::Context) {
        if !lock(&self.download_queue).insert(coord) {
            return;
        }

        let tiles = Arc::clone(&self.tiles);
        let queue = Arc::clone(&self.download_queue);
        let cache_path = self.cache_dir.join(TileCoord::cache_filename(&url));

        std::thread::spawn(move || {
            let state = match download_tile(&url, &cache_path, coord, &ctx) {
                Ok(texture) => TileState::Loaded(texture),
                Err(e) => {
                    warn!("Tile {}: {}", url, e);
                    TileState::Failed
                }
            };
            lock(&tiles).insert(coord, state);
            lock(&queue).remove(&coord);
            ctx.request_repaint();
        });
    }

    /// Get all tiles needed for a viewport at a fractional zoom level
    pub fn get_visible_tiles(center: LngLat, zoom: f64, viewport_width: f32, viewport_height: f32) -> Vec<VisibleTile> {
        let tile_zoom = zoom.round().clamp(0.0, f64::from(MAX_TILE_ZOOM));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "clamped to 0..=19")]
        let tile_zoom_level = tile_zoom as u8;
        let scale = 2_f64.powf(zoom - tile_zoom);
        let tile_px = TILE_SIZE * scale;

        let center_tile_x = WebMercator::lon_to_x(center.lon, tile_zoom);
        let center_tile_y = WebMercator::lat_to_y(center.lat, tile_zoom);

        #[allow(clippy::cast_possible_truncation, reason = "viewport sized in pixels")]
        let (tiles_wide, tiles_high) = (
            (f64::from(viewport_width) / tile_px).ceil() as i64 + 2,
            (f64::from(viewport_height) / tile_px).ceil() as i64 + 2,
        );

        #[allow(clippy::cast_possible_truncation, reason = "tile indices fit in i64")]
        let (start_x, start_y) = (
            center_tile_x.floor() as i64 - tiles_wide / 2,
            center_tile_y.floor() as i64 - tiles_high / 2,
        );

        let max_tile = 1_i64 << tile_zoom_level;
        let mut tiles = Vec::new();

        for dy in 0..tiles_high {
            for dx in 0..tiles_wide {
                let tile_x = start_x + dx;
                let tile_y = start_y + dy;

                // Latitude doesn't wrap
                if !(0..max_tile).contains(&tile_y) {
                    continue;
                }
                let wrapped_x = tile_x.rem_euclid(max_tile);

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss,
                    reason = "tile indices are within 0..2^19"
                )]
                let tile = VisibleTile {
                    coord: TileCoord::new(wrapped_x as u32, tile_y as u32, tile_zoom_level),
                    offset_x: ((tile_x as f64 - center_tile_x) * tile_px) as f32,
                    offset_y: ((tile_y as f64 - center_tile_y) * tile_px) as f32,
                    size: tile_px as f32,
                };
                tiles.push(tile);
            }
        }

        tiles
    }

    pub fn has_loading_tiles(&self) -> bool {
        lock(&self.tiles).values().any(|state| matches!(state, TileState::Loading))
    }

    pub fn get_error_count(&self) -> usize {
        lock(&self.tiles)
            .values()
            .filter(|state| matches!(state, TileState::Failed))
            .count()
    }
}

fn decode_texture(bytes: &[u8], coord: TileCoord, ctx: &egui::Context) -> Result<TextureHandle, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, &rgba.into_raw());

    Ok(ctx.load_texture(
        format!("tile_{}_{}/{}", coord.zoom, coord.x, coord.y),
        color_image,
        egui::TextureOptions::default(),
    ))
}

fn download_tile(url: &str, cache_path: &Path, coord: TileCoord, ctx: &egui::Context) -> Result<TextureHandle, String> {
    debug!("Downloading tile: {}", url);

    let response = reqwest::blocking::get(url).map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let bytes = response.bytes().map_err(|e| e.to_string())?;

    if let Err(e) = fs::write(cache_path, &bytes) {
        warn!("Failed to save tile to cache: {}", e);
    }

    decode_texture(&bytes, coord, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_template_expansion() {
        let coord = TileCoord::new(3, 2, 4);
        let url = coord.url("https://{s}.tiles.example.org/{z}/{x}/{y}.png?key={key}", Some("k1"));
        assert_eq!(url, "https://b.tiles.example.org/4/3/2.png?key=k1");

        let url = coord.url(event_sync::config::DEFAULT_MAP_STYLE_URL, None);
        assert_eq!(url, "https://b.basemaps.cartocdn.com/rastertiles/voyager/4/3/2.png");
    }

    #[test]
    fn test_projection_round_trip_through_offsets() {
        let center = LngLat::new(2.3522, 48.8566);
        let point = LngLat::new(2.36, 48.86);
        let (dx, dy) = WebMercator::offset_px(point, center, 14.0);
        assert!(dx > 0.0, "east of center is right");
        assert!(dy < 0.0, "north of center is up");

        let back = WebMercator::offset_to_lnglat(center, dx, dy, 14.0);
        assert!((back.lon - point.lon).abs() < 1e-9);
        assert!((back.lat - point.lat).abs() < 1e-9);
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let tiles = TileManager::get_visible_tiles(LngLat::new(0.0, 0.0), 2.0, 512.0, 512.0);
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.coord.zoom == 2 && t.coord.x < 4 && t.coord.y < 4));
        assert!(tiles.iter().all(|t| (t.size - 256.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_fractional_zoom_scales_tiles() {
        let tiles = TileManager::get_visible_tiles(LngLat::new(0.0, 0.0), 3.4, 256.0, 256.0);
        let expected = (256.0 * 2_f64.powf(0.4)) as f32;
        assert!(tiles.iter().all(|t| t.coord.zoom == 3 && (t.size - expected).abs() < 0.01));
    }
}
