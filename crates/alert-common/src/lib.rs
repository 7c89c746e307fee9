//! Common types and coordinate math shared across the alert overlay crates.

pub mod bbox;
pub mod date;
pub mod error;
pub mod grid;
pub mod tile;

pub use bbox::BoundingBox;
pub use date::{date_from_date_value, date_value_from_date, parse_date_value};
pub use error::{AlertError, AlertResult};
pub use grid::{
    lonlat_to_web_mercator, web_mercator_resolution, web_mercator_to_lonlat, GridOrigin,
    TileGridSpec, WEB_MERCATOR_MAX_EXTENT,
};
pub use tile::{
    latitude_from_tile, longitude_from_tile, tile_bounds, tile_column, tile_rectangle, tile_row,
    TileCoord, TileRange, TileRequest, MAX_RANGE_TILES,
};
