//! The host map as seen by the overlay.
//!
//! The overlay never owns the map widget. It reads the current view and
//! projects geographic points through [`MapContext`], and is notified of
//! view changes by the host calling into the layer.

use std::sync::{PoisonError, RwLock};

use alert_common::{
    lonlat_to_web_mercator, web_mercator_resolution, BoundingBox, TileGridSpec,
};

/// A position on the drawing surface, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Read-only view of the host map.
pub trait MapContext: Send + Sync {
    /// Visible extent in map-projection units.
    fn extent(&self) -> BoundingBox;

    /// Map units per screen pixel.
    fn resolution(&self) -> f64;

    fn zoom(&self) -> u32;

    /// Screen position of a WGS84 point, or `None` if the host cannot
    /// project it.
    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint>;

    fn grid(&self) -> TileGridSpec;

    /// Viewport size in pixels (width, height).
    fn viewport_size(&self) -> (u32, u32);
}

#[derive(Debug, Clone, Copy)]
struct ViewState {
    center_x: f64,
    center_y: f64,
    zoom: u32,
    width: u32,
    height: u32,
}

/// A headless Web Mercator map with a fixed-size viewport.
///
/// Used for snapshot rendering without a real map widget. The view can be
/// moved between redraws.
#[derive(Debug)]
pub struct StaticView {
    state: RwLock<ViewState>,
}

impl StaticView {
    /// A view centered on `(lon, lat)` at `zoom`.
    pub fn new(lon: f64, lat: f64, zoom: u32, width: u32, height: u32) -> Self {
        let (center_x, center_y) = lonlat_to_web_mercator(lon, lat);
        Self {
            state: RwLock::new(ViewState {
                center_x,
                center_y,
                zoom,
                width,
                height,
            }),
        }
    }

    pub fn set_center(&self, lon: f64, lat: f64) {
        let (x, y) = lonlat_to_web_mercator(lon, lat);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.center_x = x;
        state.center_y = y;
    }

    pub fn set_zoom(&self, zoom: u32) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .zoom = zoom;
    }

    fn view(&self) -> ViewState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MapContext for StaticView {
    fn extent(&self) -> BoundingBox {
        let view = self.view();
        let res = web_mercator_resolution(view.zoom);
        let half_w = view.width as f64 / 2.0 * res;
        let half_h = view.height as f64 / 2.0 * res;
        BoundingBox::new(
            view.center_x - half_w,
            view.center_y - half_h,
            view.center_x + half_w,
            view.center_y + half_h,
        )
    }

    fn resolution(&self) -> f64 {
        web_mercator_resolution(self.view().zoom)
    }

    fn zoom(&self) -> u32 {
        self.view().zoom
    }

    fn project(&self, lon: f64, lat: f64) -> Option<ScreenPoint> {
        let view = self.view();
        let res = web_mercator_resolution(view.zoom);
        let (x, y) = lonlat_to_web_mercator(lon, lat);
        let point = ScreenPoint {
            x: (x - view.center_x) / res + view.width as f64 / 2.0,
            y: (view.center_y - y) / res + view.height as f64 / 2.0,
        };
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }

    fn grid(&self) -> TileGridSpec {
        TileGridSpec::web_mercator()
    }

    fn viewport_size(&self) -> (u32, u32) {
        let view = self.view();
        (view.width, view.height)
    }
}
