//! The alert layer: viewport orchestration over the shared surface.
//!
//! The host drives the layer through [`TileOverlay`] and the notification
//! methods on [`AlertLayer`]. Every viewport change turns into a fresh
//! batch of tile fetches; nothing is cached between batches.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use alert_common::{
    date_value_from_date, AlertError, AlertResult, TileCoord, TileRange, TileRequest,
};
use alert_renderer::{FilterMode, FilterState, Surface, SurfaceError};
use chrono::NaiveDate;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::error::FetchError;
use crate::fetch::{lock_surface, run_tile, Compositor, TileOutcome, TileState};
use crate::host::MapContext;
use crate::metrics::{LayerMetrics, MetricsSnapshot};
use crate::source::{HttpTileSource, TileSource};

/// What a host needs from any tile overlay.
///
/// Methods that dispatch tiles spawn onto the current tokio runtime and
/// must be called from within one.
pub trait TileOverlay: Send + Sync {
    /// Bind to a host map and size the surface to its viewport.
    fn attach(&self, map: Arc<dyn MapContext>) -> SurfaceHandle;

    /// Unbind from the host map and clear the surface.
    fn detach(&self);

    /// Make the layer visible and redraw it from scratch.
    fn show(&self) -> Option<TileBatch>;

    /// Clear the surface and ignore viewport changes until shown again.
    fn hide(&self);

    /// Dispatch tiles for the current viewport.
    fn update(&self) -> Option<TileBatch>;
}

/// Shared, read-mostly access to a layer's drawing surface.
#[derive(Clone)]
pub struct SurfaceHandle {
    surface: Arc<Mutex<Surface>>,
}

impl SurfaceHandle {
    /// Copy of the surface as it is right now.
    pub fn snapshot(&self) -> Surface {
        lock_surface(&self.surface).clone()
    }

    pub fn size(&self) -> (u32, u32) {
        let surface = lock_surface(&self.surface);
        (surface.width(), surface.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        lock_surface(&self.surface).pixel(x, y)
    }

    pub fn is_blank(&self) -> bool {
        lock_surface(&self.surface).is_blank()
    }

    /// Encode the current surface as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, SurfaceError> {
        lock_surface(&self.surface).to_png()
    }
}

/// The tiles dispatched for one viewport.
///
/// Dropping a batch does not cancel its tiles; they still run to a
/// terminal state.
pub struct TileBatch {
    generation: u64,
    range: TileRange,
    tasks: Vec<(TileCoord, JoinHandle<TileOutcome>)>,
}

impl TileBatch {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn range(&self) -> TileRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn coords(&self) -> Vec<TileCoord> {
        self.tasks.iter().map(|(coord, _)| *coord).collect()
    }

    /// Wait for every tile to settle.
    pub async fn join(self) -> Vec<TileOutcome> {
        let (coords, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(coords)
            .map(|(result, coord)| match result {
                Ok(outcome) => outcome,
                Err(e) => TileOutcome::Failed {
                    coord,
                    stage: TileState::Requested,
                    error: FetchError::Join(e.to_string()),
                },
            })
            .collect()
    }
}

/// A forest-change alert layer.
pub struct AlertLayer {
    source: Arc<dyn TileSource>,
    surface: Arc<Mutex<Surface>>,
    map: RwLock<Option<Arc<dyn MapContext>>>,
    filter: RwLock<FilterState>,
    visible: AtomicBool,
    generation: Arc<AtomicU64>,
    discard_stale: bool,
    metrics: Arc<LayerMetrics>,
}

impl AlertLayer {
    /// A visible, unattached layer reading tiles from `source`.
    pub fn new(source: Arc<dyn TileSource>, filter: FilterState) -> Self {
        Self {
            source,
            surface: Arc::new(Mutex::new(Surface::new(0, 0))),
            map: RwLock::new(None),
            filter: RwLock::new(filter),
            visible: AtomicBool::new(true),
            generation: Arc::new(AtomicU64::new(0)),
            discard_stale: false,
            metrics: Arc::new(LayerMetrics::new()),
        }
    }

    /// Build a layer fetching over HTTP as configured.
    pub fn from_config(config: &OverlayConfig) -> AlertResult<Self> {
        config.validate()?;
        let source = HttpTileSource::new(config.tile_url.clone(), config.request_timeout())?;
        Ok(Self::new(Arc::new(source), config.filter_state())
            .with_discard_stale_tiles(config.discard_stale_tiles))
    }

    /// Drop tile results whose viewport has since changed.
    pub fn with_discard_stale_tiles(mut self, discard: bool) -> Self {
        self.discard_stale = discard;
        self
    }

    // === Host notifications ===

    /// The host finished a pan or zoom.
    pub fn on_viewport_changed(&self) -> Option<TileBatch> {
        self.update()
    }

    /// The host started a pan or zoom: the surface no longer matches the map.
    ///
    /// In-flight tiles are not cancelled.
    pub fn on_pan_or_zoom_started(&self) {
        self.clear();
    }

    /// Clear and redraw with the current filter.
    pub fn force_redraw(&self) -> Option<TileBatch> {
        self.clear();
        self.update()
    }

    // === Filter configuration ===

    pub fn set_min_date(&self, min_date: u32) {
        self.write_filter(|f| f.min_date = min_date);
    }

    pub fn set_max_date(&self, max_date: u32) {
        self.write_filter(|f| f.max_date = max_date);
    }

    /// Set both bounds at once, rejecting an inverted range.
    pub fn set_date_range(&self, min_date: u32, max_date: u32) -> AlertResult<()> {
        if min_date > max_date {
            return Err(AlertError::InvertedDateRange {
                min: min_date,
                max: max_date,
            });
        }
        self.write_filter(|f| {
            f.min_date = min_date;
            f.max_date = max_date;
        });
        Ok(())
    }

    /// Set both bounds from calendar dates.
    pub fn set_date_range_from_dates(&self, min: NaiveDate, max: NaiveDate) -> AlertResult<()> {
        self.set_date_range(date_value_from_date(min)?, date_value_from_date(max)?)
    }

    pub fn set_confirmed_only(&self, confirmed_only: bool) {
        self.write_filter(|f| f.confirmed_only = confirmed_only);
    }

    pub fn set_filter_mode(&self, mode: FilterMode) {
        self.write_filter(|f| f.mode = mode);
    }

    pub fn filter(&self) -> FilterState {
        *self.filter.read().unwrap_or_else(PoisonError::into_inner)
    }

    // === Inspection ===

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Current generation; bumped on every clear and every dispatch.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn surface(&self) -> SurfaceHandle {
        SurfaceHandle {
            surface: self.surface.clone(),
        }
    }

    fn write_filter(&self, f: impl FnOnce(&mut FilterState)) {
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut filter);
        debug!(
            min_date = filter.min_date,
            max_date = filter.max_date,
            confirmed_only = filter.confirmed_only,
            "Filter updated"
        );
    }

    fn attached_map(&self) -> Option<Arc<dyn MapContext>> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the surface and advance the generation as one step.
    ///
    /// The generation moves while the surface lock is held, so a composite
    /// that takes the lock afterwards always sees the new generation.
    fn clear(&self) {
        let mut surface = lock_surface(&self.surface);
        self.generation.fetch_add(1, Ordering::SeqCst);
        surface.clear();
    }

    fn dispatch(&self, map: Arc<dyn MapContext>) -> Option<TileBatch> {
        let (width, height) = map.viewport_size();
        {
            let mut surface = lock_surface(&self.surface);
            if surface.width() != width || surface.height() != height {
                self.generation.fetch_add(1, Ordering::SeqCst);
                surface.resize(width, height);
            }
        }

        let zoom = map.zoom();
        let resolution = map.resolution();
        let extent = map.extent();
        let Some(range) = TileRange::from_extent(&map.grid(), &extent, resolution, zoom) else {
            warn!(zoom, resolution, "Viewport does not map to a drawable tile range");
            return None;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let compositor = Arc::new(Compositor {
            surface: self.surface.clone(),
            map,
            filter: self.filter(),
            generation: self.generation.clone(),
            discard_stale: self.discard_stale,
            metrics: self.metrics.clone(),
        });

        let tiles = range.tiles();
        info!(
            zoom,
            tiles = tiles.len(),
            columns = %format!("{}..={}", range.column_min, range.column_max),
            rows = %format!("{}..={}", range.row_min, range.row_max),
            generation,
            "Dispatching alert tiles"
        );

        let tasks = tiles
            .into_iter()
            .map(|coord| {
                let request = TileRequest::new(coord, &range, generation);
                self.metrics.record_requested();
                let handle = tokio::spawn(run_tile(
                    request,
                    self.source.clone(),
                    compositor.clone(),
                ));
                (coord, handle)
            })
            .collect();

        Some(TileBatch {
            generation,
            range,
            tasks,
        })
    }
}

impl TileOverlay for AlertLayer {
    fn attach(&self, map: Arc<dyn MapContext>) -> SurfaceHandle {
        let (width, height) = map.viewport_size();
        {
            let mut surface = lock_surface(&self.surface);
            self.generation.fetch_add(1, Ordering::SeqCst);
            surface.resize(width, height);
        }
        *self.map.write().unwrap_or_else(PoisonError::into_inner) = Some(map);
        debug!(width, height, "Layer attached");
        self.surface()
    }

    fn detach(&self) {
        *self.map.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.clear();
        debug!("Layer detached");
    }

    fn show(&self) -> Option<TileBatch> {
        self.visible.store(true, Ordering::SeqCst);
        self.force_redraw()
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
        self.clear();
    }

    fn update(&self) -> Option<TileBatch> {
        if !self.is_visible() {
            return None;
        }
        let map = self.attached_map()?;
        self.dispatch(map)
    }
}
