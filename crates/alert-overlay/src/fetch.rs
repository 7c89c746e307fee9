//! Per-tile fetch lifecycle.
//!
//! ```text
//! Requested --fetch ok--> Downloaded --decode ok--> Decoded --composite--> Composited
//!     |                       |                        |
//!     +--fetch err--> Failed  +--decode err--> Failed  +--stale--> Discarded
//! ```
//!
//! Fetch and decode are the only suspension points. The composite step
//! (draw, read back, filter, write back) runs under the surface lock
//! without awaiting, so composites of different tiles never interleave.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use alert_common::{latitude_from_tile, longitude_from_tile, TileCoord, TileRequest};
use alert_renderer::{decode_png, filter_buffer, FilterState, FilterStats, PixelRect, Surface, TileImage};
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::host::{MapContext, ScreenPoint};
use crate::metrics::LayerMetrics;
use crate::source::TileSource;

/// Lifecycle states of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    Requested,
    Downloaded,
    Decoded,
    Composited,
    Failed,
    Discarded,
}

impl TileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileState::Requested => "requested",
            TileState::Downloaded => "downloaded",
            TileState::Decoded => "decoded",
            TileState::Composited => "composited",
            TileState::Failed => "failed",
            TileState::Discarded => "discarded",
        }
    }

    /// Whether the tile has settled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TileState::Composited | TileState::Failed | TileState::Discarded
        )
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a tile's lifecycle ended.
#[derive(Debug)]
pub enum TileOutcome {
    Composited {
        coord: TileCoord,
        /// Surface region written, `None` if the tile was entirely off-screen
        rect: Option<PixelRect>,
        stats: FilterStats,
    },
    Failed {
        coord: TileCoord,
        /// Last state reached before the failure
        stage: TileState,
        error: FetchError,
    },
    Discarded {
        coord: TileCoord,
    },
}

impl TileOutcome {
    pub fn coord(&self) -> TileCoord {
        match self {
            TileOutcome::Composited { coord, .. }
            | TileOutcome::Failed { coord, .. }
            | TileOutcome::Discarded { coord } => *coord,
        }
    }

    pub fn state(&self) -> TileState {
        match self {
            TileOutcome::Composited { .. } => TileState::Composited,
            TileOutcome::Failed { .. } => TileState::Failed,
            TileOutcome::Discarded { .. } => TileState::Discarded,
        }
    }
}

/// Lock the surface, recovering from a poisoned lock.
///
/// Each composite leaves the buffer in a drawable state, so a panic in
/// another holder does not invalidate it.
pub(crate) fn lock_surface(surface: &Mutex<Surface>) -> std::sync::MutexGuard<'_, Surface> {
    surface.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a tile needs to reach the surface, captured at dispatch.
pub(crate) struct Compositor {
    pub surface: Arc<Mutex<Surface>>,
    pub map: Arc<dyn MapContext>,
    pub filter: FilterState,
    pub generation: Arc<AtomicU64>,
    pub discard_stale: bool,
    pub metrics: Arc<LayerMetrics>,
}

impl Compositor {
    /// Screen position of the tile's top-left corner.
    ///
    /// Falls back to the batch origin tile plus whole-tile offsets when the
    /// host cannot project this tile's corner.
    fn screen_position(&self, request: &TileRequest) -> Option<(i64, i64)> {
        let z = request.coord.z;
        if let Some(p) = self.project_corner(request.coord.x, request.coord.y, z) {
            return Some(round_point(p));
        }

        let origin = self.project_corner(request.origin_column, request.origin_row, z)?;
        let grid = self.map.grid();
        let (dx, dy) = request.offset_in_batch();
        debug!(tile = %request.coord.path(), "Placing tile relative to batch origin");
        Some(round_point(ScreenPoint {
            x: origin.x + dx as f64 * grid.cols() as f64,
            y: origin.y + dy as f64 * grid.rows() as f64,
        }))
    }

    fn project_corner(&self, column: u32, row: u32, zoom: u32) -> Option<ScreenPoint> {
        self.map
            .project(longitude_from_tile(column, zoom), latitude_from_tile(row, zoom))
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Draw, read back, filter and write back one decoded tile.
    fn composite(&self, request: &TileRequest, image: &TileImage) -> TileOutcome {
        let coord = request.coord;
        let start = Instant::now();

        let Some((x, y)) = self.screen_position(request) else {
            return self.fail(coord, TileState::Decoded, FetchError::Unprojectable);
        };

        let mut surface = lock_surface(&self.surface);

        if self.discard_stale && self.generation.load(Ordering::SeqCst) != request.generation {
            drop(surface);
            debug!(tile = %coord.path(), generation = request.generation, "Discarding stale tile");
            self.metrics.record_discarded();
            return TileOutcome::Discarded { coord };
        }

        let result = self.draw_filtered(&mut surface, x, y, image);
        drop(surface);

        match result {
            Ok((rect, stats)) => {
                if stats.malformed > 0 {
                    warn!(
                        tile = %coord.path(),
                        malformed = stats.malformed,
                        "Tile contains pixels outside the alert encoding"
                    );
                }
                self.metrics.record_composited(start.elapsed());
                debug!(
                    tile = %coord.path(),
                    visible = stats.visible,
                    hidden = stats.hidden,
                    "Composited tile"
                );
                TileOutcome::Composited { coord, rect, stats }
            }
            Err(e) => self.fail(coord, TileState::Decoded, e),
        }
    }

    fn draw_filtered(
        &self,
        surface: &mut Surface,
        x: i64,
        y: i64,
        image: &TileImage,
    ) -> Result<(Option<PixelRect>, FilterStats), FetchError> {
        let Some(rect) = surface.draw_rgba(x, y, image.width, image.height, &image.pixels)? else {
            return Ok((None, FilterStats::default()));
        };
        let mut region = surface.read_region(rect)?;
        let stats = filter_buffer(&mut region, &self.filter);
        surface.write_region(rect, &region)?;
        Ok((Some(rect), stats))
    }

    fn fail(&self, coord: TileCoord, stage: TileState, error: FetchError) -> TileOutcome {
        debug!(tile = %coord.path(), stage = %stage, error = %error, "Tile dropped");
        self.metrics.record_failed(stage);
        TileOutcome::Failed {
            coord,
            stage,
            error,
        }
    }
}

fn round_point(p: ScreenPoint) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

/// Drive one tile from request to a terminal state.
#[instrument(skip_all, fields(tile = %request.coord.path(), generation = request.generation))]
pub(crate) async fn run_tile(
    request: TileRequest,
    source: Arc<dyn TileSource>,
    compositor: Arc<Compositor>,
) -> TileOutcome {
    let coord = request.coord;

    let bytes = match source.fetch(&coord).await {
        Ok(bytes) => bytes,
        Err(e) => return compositor.fail(coord, TileState::Requested, e),
    };

    let image = match tokio::task::spawn_blocking(move || decode_png(&bytes)).await {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => {
            return compositor.fail(coord, TileState::Downloaded, FetchError::Decode(e.to_string()))
        }
        Err(e) => {
            return compositor.fail(coord, TileState::Downloaded, FetchError::Join(e.to_string()))
        }
    };

    compositor.composite(&request, &image)
}
