//! Tile addressing: viewport extents to tile coordinates and back.
//!
//! Column/row derivation works in map-projection units against the host's
//! [`TileGridSpec`]; the inverse transforms use the standard slippy-map
//! formulas and return degrees.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{BoundingBox, TileGridSpec};

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// `z/x/y` path fragment, as used in tile URLs and log fields.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Column containing `longitude` (map units) at `resolution` (map units per pixel).
pub fn tile_column(grid: &TileGridSpec, longitude: f64, resolution: f64) -> i64 {
    ((longitude - grid.origin().x) / grid.tile_span_x(resolution)).floor() as i64
}

/// Row containing `latitude` (map units) at `resolution`.
///
/// Rows grow southward, so the viewport's maximum latitude yields the
/// minimum row.
pub fn tile_row(grid: &TileGridSpec, latitude: f64, resolution: f64) -> i64 {
    ((grid.origin().y - latitude) / grid.tile_span_y(resolution)).floor() as i64
}

/// Longitude (degrees) of the western edge of `column` at `zoom`.
pub fn longitude_from_tile(column: u32, zoom: u32) -> f64 {
    column as f64 / 2f64.powi(zoom as i32) * 360.0 - 180.0
}

/// Latitude (degrees) of the northern edge of `row` at `zoom`.
pub fn latitude_from_tile(row: u32, zoom: u32) -> f64 {
    let n = PI - 2.0 * PI * row as f64 / 2f64.powi(zoom as i32);
    (180.0 / PI) * n.sinh().atan()
}

/// Geographic bounds (degrees) of a single tile.
pub fn tile_bounds(coord: &TileCoord) -> BoundingBox {
    BoundingBox::new(
        longitude_from_tile(coord.x, coord.z),
        latitude_from_tile(coord.y + 1, coord.z),
        longitude_from_tile(coord.x + 1, coord.z),
        latitude_from_tile(coord.y, coord.z),
    )
}

/// Largest tile count a single viewport may request.
pub const MAX_RANGE_TILES: u64 = 1 << 16;

/// Number of tiles in inclusive column/row ranges; zero when inverted.
fn rectangle_len(column_min: u32, column_max: u32, row_min: u32, row_max: u32) -> u64 {
    let columns = (column_max as u64 + 1).saturating_sub(column_min as u64);
    let rows = (row_max as u64 + 1).saturating_sub(row_min as u64);
    columns.saturating_mul(rows)
}

/// Every tile in the inclusive column/row ranges, column-major.
///
/// Inverted ranges, and ranges holding more than [`MAX_RANGE_TILES`]
/// tiles, yield an empty rectangle.
pub fn tile_rectangle(
    column_min: u32,
    column_max: u32,
    row_min: u32,
    row_max: u32,
    zoom: u32,
) -> Vec<TileCoord> {
    let count = rectangle_len(column_min, column_max, row_min, row_max);
    if count == 0 || count > MAX_RANGE_TILES {
        return Vec::new();
    }
    let mut tiles = Vec::with_capacity(count as usize);
    for x in column_min..=column_max {
        for y in row_min..=row_max {
            tiles.push(TileCoord { z: zoom, x, y });
        }
    }
    tiles
}

/// Inclusive column/row bounds of the tiles covering a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u32,
    pub column_min: u32,
    pub column_max: u32,
    pub row_min: u32,
    pub row_max: u32,
}

impl TileRange {
    /// Compute the range covering `extent` (map units).
    ///
    /// Returns `None` for a non-positive or non-finite resolution, an invalid
    /// extent, an extent lying entirely west or north of the grid origin, or
    /// one covering more than [`MAX_RANGE_TILES`] tiles. Indices west/north
    /// of the origin are clamped to zero.
    pub fn from_extent(
        grid: &TileGridSpec,
        extent: &BoundingBox,
        resolution: f64,
        zoom: u32,
    ) -> Option<Self> {
        if !resolution.is_finite() || resolution <= 0.0 || extent.validate().is_err() {
            return None;
        }

        let column_min = tile_column(grid, extent.min_x, resolution);
        let column_max = tile_column(grid, extent.max_x, resolution);
        // max latitude -> min row
        let row_min = tile_row(grid, extent.max_y, resolution);
        let row_max = tile_row(grid, extent.min_y, resolution);

        if column_max < 0 || row_max < 0 {
            return None;
        }

        let range = Self {
            zoom,
            column_min: clamp_index(column_min),
            column_max: clamp_index(column_max),
            row_min: clamp_index(row_min),
            row_max: clamp_index(row_max),
        };
        let count = rectangle_len(
            range.column_min,
            range.column_max,
            range.row_min,
            range.row_max,
        );
        (count <= MAX_RANGE_TILES).then_some(range)
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> usize {
        let count = rectangle_len(self.column_min, self.column_max, self.row_min, self.row_max);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into the full tile rectangle.
    pub fn tiles(&self) -> Vec<TileCoord> {
        tile_rectangle(
            self.column_min,
            self.column_max,
            self.row_min,
            self.row_max,
            self.zoom,
        )
    }
}

fn clamp_index(index: i64) -> u32 {
    index.clamp(0, u32::MAX as i64) as u32
}

/// A dispatched fetch for one tile of a viewport batch.
///
/// `origin_column`/`origin_row` are the first column and row of the batch's
/// rectangle; `generation` is the layer generation at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub coord: TileCoord,
    pub origin_column: u32,
    pub origin_row: u32,
    pub generation: u64,
}

impl TileRequest {
    pub fn new(coord: TileCoord, range: &TileRange, generation: u64) -> Self {
        Self {
            coord,
            origin_column: range.column_min,
            origin_row: range.row_min,
            generation,
        }
    }

    /// Position of this tile within the batch rectangle, in whole tiles.
    pub fn offset_in_batch(&self) -> (u32, u32) {
        (
            self.coord.x.saturating_sub(self.origin_column),
            self.coord.y.saturating_sub(self.origin_row),
        )
    }
}
