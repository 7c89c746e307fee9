//! Common test fixtures for alert overlay tests.

/// Web Mercator grid constants and tile extents in meters.
pub mod web_mercator {
    /// Half the world width in meters.
    pub const MAX_EXTENT: f64 = 20037508.342789244;

    /// Meters per pixel at a zoom level for 256px tiles.
    pub fn zoom_resolution(zoom: u32) -> f64 {
        156543.03392804097 / 2f64.powi(zoom as i32)
    }

    /// Extent of tile `(z, x, y)` as (min_x, min_y, max_x, max_y), shrunk
    /// by `inset` meters on every side.
    pub fn tile_extent(z: u32, x: u32, y: u32, inset: f64) -> (f64, f64, f64, f64) {
        let span = 2.0 * MAX_EXTENT / 2f64.powi(z as i32);
        (
            -MAX_EXTENT + x as f64 * span + inset,
            MAX_EXTENT - (y + 1) as f64 * span + inset,
            -MAX_EXTENT + (x + 1) as f64 * span - inset,
            MAX_EXTENT - y as f64 * span - inset,
        )
    }
}

/// Known pixel encodings: (rgba, date, confidence, intensity).
pub mod pixels {
    /// One day after the epoch, provisional, raw intensity 2.
    pub const DAY_ONE: ([u8; 4], u32, u8, u8) = ([0, 1, 102, 255], 15001, 0, 100);

    /// First day of the second encoded year (total days = 365), confirmed.
    pub const YEAR_BOUNDARY: ([u8; 4], u32, u8, u8) = ([1, 110, 203, 255], 16000, 1, 150);

    /// Last day of the first encoded year (total days = 364).
    pub const YEAR_END: ([u8; 4], u32, u8, u8) = ([1, 109, 101, 255], 15364, 0, 50);

    /// Maximum blue code: confirmed, raw intensity 55 saturates at 255.
    pub const SATURATED: ([u8; 4], u32, u8, u8) = ([2, 220, 255, 255], 17000, 1, 255);

    /// Fully transparent background pixel (no detection).
    pub const EMPTY: [u8; 4] = [0, 0, 0, 0];
}

/// Common alert date ranges.
pub mod dates {
    /// 2015-01-01 through 2016-12-31.
    pub const FULL_RANGE: (u32, u32) = (15000, 16365);

    /// Calendar year 2016 only.
    pub const YEAR_2016: (u32, u32) = (16000, 16365);
}
