//! Forest-change alert overlay.
//!
//! Fetches encoded alert tiles for the host map's viewport, filters every
//! pixel by date and confidence, and composites the result onto a drawing
//! surface the host displays above its base map.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use alert_overlay::{AlertLayer, OverlayConfig, StaticView, TileOverlay};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OverlayConfig::new("https://tiles.example.org/glad/{z}/{x}/{y}.png");
//! let layer = AlertLayer::from_config(&config)?;
//! let surface = layer.attach(Arc::new(StaticView::new(-62.0, -9.5, 7, 768, 512)));
//!
//! if let Some(batch) = layer.update() {
//!     batch.join().await;
//! }
//! let png = surface.to_png()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod host;
pub mod layer;
pub mod metrics;
pub mod source;

pub use config::OverlayConfig;
pub use error::FetchError;
pub use fetch::{TileOutcome, TileState};
pub use host::{MapContext, ScreenPoint, StaticView};
pub use layer::{AlertLayer, SurfaceHandle, TileBatch, TileOverlay};
pub use metrics::{LayerMetrics, MetricsSnapshot};
pub use source::{HttpTileSource, TileSource};
