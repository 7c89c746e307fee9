//! Shared helpers for overlay integration tests: an in-memory tile origin
//! and a host map whose projection is scripted per test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alert_common::{lonlat_to_web_mercator, BoundingBox, TileCoord, TileGridSpec};
use alert_overlay::{FetchError, MapContext, ScreenPoint, TileSource};
use async_trait::async_trait;
use bytes::Bytes;
use test_utils::web_mercator;
use tokio::sync::Semaphore;

/// What the mock origin serves for one tile.
#[derive(Debug, Clone)]
pub enum MockTile {
    Png(Vec<u8>),
    Status(u16),
    Garbage,
}

/// In-memory tile origin. Unknown tiles are served as 404 unless a
/// fallback is set.
pub struct MockTileSource {
    tiles: HashMap<TileCoord, MockTile>,
    fallback: Option<MockTile>,
    requests: Mutex<Vec<TileCoord>>,
    gate: Option<Arc<Semaphore>>,
    tile_gates: HashMap<TileCoord, Arc<Semaphore>>,
}

impl MockTileSource {
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            gate: None,
            tile_gates: HashMap::new(),
        }
    }

    pub fn with_tile(mut self, coord: TileCoord, tile: MockTile) -> Self {
        self.tiles.insert(coord, tile);
        self
    }

    pub fn with_fallback(mut self, tile: MockTile) -> Self {
        self.fallback = Some(tile);
        self
    }

    /// Hold every fetch until permits are added to the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Hold fetches of one tile until a permit is added to the returned
    /// semaphore.
    pub fn gated_tile(mut self, coord: TileCoord) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.tile_gates.insert(coord, gate.clone());
        (self, gate)
    }

    /// Tiles requested so far, sorted.
    pub fn requested(&self) -> Vec<TileCoord> {
        let mut coords = self.requests.lock().unwrap().clone();
        coords.sort_by_key(|c| (c.z, c.x, c.y));
        coords
    }
}

#[async_trait]
impl TileSource for MockTileSource {
    async fn fetch(&self, coord: &TileCoord) -> Result<Bytes, FetchError> {
        self.requests.lock().unwrap().push(*coord);

        if let Some(gate) = self.tile_gates.get(coord).or(self.gate.as_ref()) {
            gate.acquire()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?
                .forget();
        }

        match self.tiles.get(coord).or(self.fallback.as_ref()) {
            Some(MockTile::Png(bytes)) => Ok(Bytes::from(bytes.clone())),
            Some(MockTile::Status(code)) => Err(FetchError::Status(*code)),
            Some(MockTile::Garbage) => Ok(Bytes::from_static(b"<html>not a tile</html>")),
            None => Err(FetchError::Status(404)),
        }
    }
}

/// Host map with an explicit extent and a linear Web Mercator projection
/// anchored at `screen_origin` (map units shown at screen pixel 0,0).
pub struct ScriptedMap {
    pub extent: BoundingBox,
    pub resolution: f64,
    pub zoom: u32,
    pub viewport: (u32, u32),
    pub screen_origin: (f64, f64),
    /// Points east of this longitude cannot be projected
    pub unprojectable_east_of: Option<f64>,
}

impl ScriptedMap {
    /// A view covering tiles `columns` of `row` at `zoom`, with the first
    /// tile's top-left corner at screen `(offset, offset)`.
    pub fn over_tiles(zoom: u32, columns: (u32, u32), row: u32, offset: f64) -> Self {
        let inset = 1000.0;
        let resolution = web_mercator::zoom_resolution(zoom);
        let (min_x, min_y, _, max_y) = web_mercator::tile_extent(zoom, columns.0, row, inset);
        let (_, _, max_x, _) = web_mercator::tile_extent(zoom, columns.1, row, inset);
        let tile_left = min_x - inset;
        let tile_top = max_y + inset;
        let count = columns.1 - columns.0 + 1;
        Self {
            extent: BoundingBox::new(min_x, min_y, max_x, max_y),
            resolution,
            zoom,
            viewport: (256 * count, 256),
            screen_origin: (tile_left - offset * resolution, tile_top + offset * resolution),
            unprojectable_east_of: None,
        }
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn unprojectable_east_of(mut self, lon: f64) -> Self {
        self.unprojectable_east_of = Some(lon);
        self
    }
}

impl MapContext for ScriptedMap {
    fn extent(&self) -> BoundingBox {
        self.extent
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn zoom(&self) -> u32 {
        self.zoom
    }

    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint> {
        if matches!(self.unprojectable_east_of, Some(limit) if lon > limit) {
            return None;
        }
        let (x, y) = lonlat_to_web_mercator(lon, lat);
        Some(ScreenPoint {
            x: (x - self.screen_origin.0) / self.resolution,
            y: (self.screen_origin.1 - y) / self.resolution,
        })
    }

    fn grid(&self) -> TileGridSpec {
        TileGridSpec::web_mercator()
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }
}
