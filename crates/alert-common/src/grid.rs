//! Tile grid specification supplied by the host map.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{AlertError, AlertResult};

/// Half the Web Mercator world width in meters.
pub const WEB_MERCATOR_MAX_EXTENT: f64 = 20037508.342789244;

/// Web Mercator resolution (meters per pixel) at zoom 0 for 256px tiles.
pub const WEB_MERCATOR_ZOOM0_RESOLUTION: f64 = 156543.03392804097;

/// Top-left corner of the tile grid in map-projection units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridOrigin {
    pub x: f64,
    pub y: f64,
}

/// Tile grid of the host map: origin plus tile size in pixels.
///
/// Rows grow southward from the origin, columns eastward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGridSpec {
    origin: GridOrigin,
    cols: u32,
    rows: u32,
}

impl TileGridSpec {
    /// Create a grid spec. Tile dimensions must be non-zero and the origin finite.
    pub fn new(origin: GridOrigin, cols: u32, rows: u32) -> AlertResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(AlertError::InvalidGrid(format!(
                "tile size must be positive, got {}x{}",
                cols, rows
            )));
        }
        if !origin.x.is_finite() || !origin.y.is_finite() {
            return Err(AlertError::InvalidGrid(format!(
                "origin must be finite, got ({}, {})",
                origin.x, origin.y
            )));
        }
        Ok(Self { origin, cols, rows })
    }

    /// Standard Web Mercator (Google/OSM) grid with 256x256 tiles.
    pub fn web_mercator() -> Self {
        Self {
            origin: GridOrigin {
                x: -WEB_MERCATOR_MAX_EXTENT,
                y: WEB_MERCATOR_MAX_EXTENT,
            },
            cols: 256,
            rows: 256,
        }
    }

    pub fn origin(&self) -> GridOrigin {
        self.origin
    }

    /// Tile width in pixels.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Tile height in pixels.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Width of one tile in map units at the given resolution.
    pub fn tile_span_x(&self, resolution: f64) -> f64 {
        self.cols as f64 * resolution
    }

    /// Height of one tile in map units at the given resolution.
    pub fn tile_span_y(&self, resolution: f64) -> f64 {
        self.rows as f64 * resolution
    }
}

/// Web Mercator resolution (meters per pixel) for a zoom level, 256px tiles.
pub fn web_mercator_resolution(zoom: u32) -> f64 {
    WEB_MERCATOR_ZOOM0_RESOLUTION / 2f64.powi(zoom as i32)
}

/// Project WGS84 lon/lat (degrees) to Web Mercator meters.
pub fn lonlat_to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon.to_radians() * 6378137.0;
    let y = ((PI / 4.0) + (lat.to_radians() / 2.0)).tan().ln() * 6378137.0;
    (x, y)
}

/// Unproject Web Mercator meters to WGS84 lon/lat (degrees).
pub fn web_mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / 6378137.0).to_degrees();
    let lat = (2.0 * (y / 6378137.0).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
