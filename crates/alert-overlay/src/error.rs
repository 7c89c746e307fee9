//! Per-tile failure type.

use alert_renderer::SurfaceError;
use thiserror::Error;

/// Why a tile never reached the surface.
///
/// These are recorded on the tile's outcome and logged; the host never
/// sees them.
#[derive(Debug, Error)]
pub enum FetchError {
    // === Fetch Errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Tile origin returned HTTP {0}")]
    Status(u16),

    // === Decode Errors ===
    #[error("Tile image decode failed: {0}")]
    Decode(String),

    #[error("Decode task did not complete: {0}")]
    Join(String),

    // === Composite Errors ===
    #[error("Tile corner could not be projected to screen")]
    Unprojectable,

    #[error("Composite failed: {0}")]
    Composite(#[from] SurfaceError),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}
