//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::{AlertError, AlertResult};

/// A geographic or projected bounding box.
///
/// Viewport extents supplied by the host map are in map-projection units
/// (meters for Web Mercator). Tile bounds produced by [`crate::tile_bounds`]
/// are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check that the box is finite and not inverted.
    ///
    /// A zero-area box (a single point) is valid.
    pub fn validate(&self) -> AlertResult<()> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(AlertError::InvalidExtent(format!(
                "non-finite coordinate in {:?}",
                self
            )));
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(AlertError::InvalidExtent(format!(
                "inverted extent {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this bbox intersects another (shared edges do not count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}
