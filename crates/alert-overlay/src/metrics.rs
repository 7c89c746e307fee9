//! Tile lifecycle metrics.
//!
//! Counters are published through the `metrics` facade; the host installs
//! whatever recorder it wants. Local totals are kept as well so a layer can
//! report on itself without a recorder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};

use crate::fetch::TileState;

/// Per-layer tile counters.
#[derive(Debug, Default)]
pub struct LayerMetrics {
    requested: AtomicU64,
    composited: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of [`LayerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requested: u64,
    pub composited: u64,
    pub failed: u64,
    pub discarded: u64,
}

impl MetricsSnapshot {
    /// Tiles dispatched but not yet settled.
    pub fn in_flight(&self) -> u64 {
        self.requested
            .saturating_sub(self.composited + self.failed + self.discarded)
    }
}

impl LayerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched tile fetch
    pub fn record_requested(&self) {
        self.requested.fetch_add(1, Ordering::Relaxed);
        counter!("alert_tiles_requested_total").increment(1);
    }

    /// Record a composited tile and how long the composite took
    pub fn record_composited(&self, elapsed: Duration) {
        self.composited.fetch_add(1, Ordering::Relaxed);
        counter!("alert_tiles_composited_total").increment(1);
        histogram!("alert_tile_composite_seconds").record(elapsed.as_secs_f64());
    }

    /// Record a tile that failed in `stage`
    pub fn record_failed(&self, stage: TileState) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        counter!("alert_tiles_failed_total", "stage" => stage.as_str()).increment(1);
    }

    /// Record a stale tile dropped before drawing
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        counter!("alert_tiles_discarded_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            composited: self.composited.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
