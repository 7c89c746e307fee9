//! Render one view of an alert tile set to a PNG file.
//!
//! ```text
//! ALERT_TILE_URL=https://tiles.example.org/glad/{z}/{x}/{y}.png \
//!     cargo run -p alert-overlay --example render_snapshot -- --lon -62 --lat -9.5 --zoom 7
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use alert_overlay::{AlertLayer, OverlayConfig, StaticView, TileOutcome, TileOverlay};

/// Alert snapshot renderer
#[derive(Parser, Debug)]
#[command(name = "render_snapshot")]
#[command(about = "Fetch, filter and composite alert tiles for one map view")]
struct Args {
    /// YAML config file (overrides ALERT_* environment variables)
    #[arg(long, env = "ALERT_CONFIG")]
    config: Option<PathBuf>,

    /// View center longitude
    #[arg(long, default_value = "-62.0", allow_hyphen_values = true)]
    lon: f64,

    /// View center latitude
    #[arg(long, default_value = "-9.5", allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, default_value = "7")]
    zoom: u32,

    #[arg(long, default_value = "1024")]
    width: u32,

    #[arg(long, default_value = "768")]
    height: u32,

    /// Output PNG path
    #[arg(short, long, default_value = "alerts.png")]
    output: PathBuf,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(true).init();

    let config = match &args.config {
        Some(path) => OverlayConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => OverlayConfig::from_env().context("loading ALERT_* environment")?,
    };
    info!(
        tile_url = %config.tile_url,
        min_date = config.min_date,
        max_date = config.max_date,
        "Loaded configuration"
    );

    let layer = AlertLayer::from_config(&config)?;
    let view = StaticView::new(args.lon, args.lat, args.zoom, args.width, args.height);
    let surface = layer.attach(Arc::new(view));

    let outcomes = match layer.update() {
        Some(batch) => batch.join().await,
        None => Vec::new(),
    };
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, TileOutcome::Failed { .. }))
        .count();
    info!(tiles = outcomes.len(), failed, "Tiles settled");

    let png = surface.to_png()?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(path = %args.output.display(), bytes = png.len(), "Snapshot written");

    Ok(())
}
