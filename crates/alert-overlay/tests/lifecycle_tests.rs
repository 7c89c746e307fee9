//! End-to-end tests for the alert layer: viewport to tiles to surface.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alert_common::{BoundingBox, TileCoord};
use alert_overlay::{
    AlertLayer, FetchError, StaticView, TileOutcome, TileOverlay, TileState,
};
use alert_renderer::FilterState;
use common::{MockTile, MockTileSource, ScriptedMap};
use test_utils::{alert_pixel, dates, pixels, png_tile, rgba_buffer, total_days_for, uniform_buffer};

/// 2x2 tile: top-left in 2015-2016, top-right in 2017, bottom row empty.
fn mixed_tile() -> Vec<u8> {
    let in_range = alert_pixel(total_days_for(15300), 203);
    let out_of_range = alert_pixel(total_days_for(17000), 203);
    png_tile(
        2,
        2,
        &rgba_buffer(&[in_range, out_of_range, pixels::EMPTY, pixels::EMPTY]),
    )
}

fn solid_tile(size: u32) -> Vec<u8> {
    png_tile(
        size,
        size,
        &uniform_buffer(size as usize, size as usize, pixels::DAY_ONE.0),
    )
}

fn full_range() -> FilterState {
    FilterState::new(dates::FULL_RANGE.0, dates::FULL_RANGE.1)
}

fn layer_with(source: MockTileSource) -> (AlertLayer, Arc<MockTileSource>) {
    let source = Arc::new(source);
    let layer = AlertLayer::new(source.clone(), full_range());
    (layer, source)
}

// ============================================================================
// Single tile at zoom 5
// ============================================================================

#[tokio::test]
async fn test_single_tile_end_to_end() {
    let coord = TileCoord::new(5, 11, 16);
    let (layer, source) =
        layer_with(MockTileSource::new().with_tile(coord, MockTile::Png(mixed_tile())));
    let map = ScriptedMap::over_tiles(5, (11, 11), 16, 2.0).with_viewport(8, 8);
    let surface = layer.attach(Arc::new(map));

    let batch = layer.update().expect("attached visible layer dispatches");
    assert_eq!(batch.coords(), vec![coord]);

    let outcomes = batch.join().await;
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        TileOutcome::Composited { rect, stats, .. } => {
            let rect = rect.expect("tile lands on the surface");
            assert_eq!((rect.x, rect.y, rect.width, rect.height), (2, 2, 2, 2));
            assert_eq!(stats.visible, 1);
            assert_eq!(stats.hidden, 1);
            assert_eq!(stats.empty, 2);
        }
        other => panic!("expected composite, got {:?}", other),
    }

    let inside = surface.pixel(2, 2).unwrap();
    let outside = surface.pixel(3, 2).unwrap();
    assert!(inside[3] > 0, "in-range pixel must be visible");
    assert_eq!(inside[3], 150);
    assert_eq!(&inside[..3], &alert_pixel(total_days_for(15300), 203)[..3]);
    assert_eq!(outside[3], 0, "out-of-range pixel must be hidden");
    assert_eq!(surface.pixel(0, 0).unwrap()[3], 0);

    assert_eq!(source.requested(), vec![coord]);
    let metrics = layer.metrics();
    assert_eq!(metrics.requested, 1);
    assert_eq!(metrics.composited, 1);
    assert_eq!(metrics.in_flight(), 0);
}

#[tokio::test]
async fn test_force_redraw_applies_new_dates() {
    let coord = TileCoord::new(5, 11, 16);
    let (layer, _source) =
        layer_with(MockTileSource::new().with_tile(coord, MockTile::Png(mixed_tile())));
    let surface = layer.attach(Arc::new(
        ScriptedMap::over_tiles(5, (11, 11), 16, 2.0).with_viewport(8, 8),
    ));

    layer.update().unwrap().join().await;
    assert_eq!(surface.pixel(2, 2).unwrap()[3], 150);

    layer.set_max_date(15299);
    layer.force_redraw().unwrap().join().await;
    assert_eq!(surface.pixel(2, 2).unwrap()[3], 0);

    layer.set_max_date(17000);
    layer.force_redraw().unwrap().join().await;
    assert_eq!(surface.pixel(2, 2).unwrap()[3], 150);
    assert_eq!(surface.pixel(3, 2).unwrap()[3], 150);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_failed_tiles_leave_region_blank() {
    let (layer, _source) = layer_with(
        MockTileSource::new()
            .with_tile(TileCoord::new(5, 10, 16), MockTile::Png(solid_tile(2)))
            .with_tile(TileCoord::new(5, 11, 16), MockTile::Status(404))
            .with_tile(TileCoord::new(5, 12, 16), MockTile::Garbage),
    );
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 12), 16, 0.0)));

    let mut outcomes = layer.update().unwrap().join().await;
    outcomes.sort_by_key(|o| o.coord().x);

    assert_eq!(outcomes[0].state(), TileState::Composited);
    assert!(matches!(
        outcomes[1],
        TileOutcome::Failed {
            stage: TileState::Requested,
            error: FetchError::Status(404),
            ..
        }
    ));
    assert!(matches!(
        outcomes[2],
        TileOutcome::Failed {
            stage: TileState::Downloaded,
            error: FetchError::Decode(_),
            ..
        }
    ));

    assert_eq!(surface.pixel(0, 0).unwrap()[3], 100);
    assert_eq!(surface.pixel(256, 0).unwrap(), [0, 0, 0, 0]);
    assert_eq!(surface.pixel(512, 0).unwrap(), [0, 0, 0, 0]);

    let metrics = layer.metrics();
    assert_eq!(metrics.requested, 3);
    assert_eq!(metrics.composited, 1);
    assert_eq!(metrics.failed, 2);
}

#[tokio::test]
async fn test_unprojectable_tile_uses_batch_origin() {
    let (layer, _source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let map = ScriptedMap::over_tiles(5, (10, 12), 16, 0.0).unprojectable_east_of(-60.0);
    let surface = layer.attach(Arc::new(map));

    let outcomes = layer.update().unwrap().join().await;

    assert!(outcomes.iter().all(|o| o.state() == TileState::Composited));
    for x in [0, 256, 512] {
        assert_eq!(surface.pixel(x, 0).unwrap()[3], 100, "tile at x={}", x);
    }
}

#[tokio::test]
async fn test_nothing_projects_fails_tile() {
    let (layer, _source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let map = ScriptedMap::over_tiles(5, (10, 11), 16, 0.0).unprojectable_east_of(-180.0);
    let surface = layer.attach(Arc::new(map));

    let outcomes = layer.update().unwrap().join().await;

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(matches!(
            outcome,
            TileOutcome::Failed {
                stage: TileState::Decoded,
                error: FetchError::Unprojectable,
                ..
            }
        ));
    }
    assert!(surface.is_blank());
}

// ============================================================================
// Viewport coverage
// ============================================================================

#[tokio::test]
async fn test_oversized_viewport_dispatches_nothing() {
    let (layer, source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let mut map = ScriptedMap::over_tiles(5, (10, 10), 16, 0.0);
    // Straddles the grid origin at a vanishing resolution
    map.extent = BoundingBox::new(-3e7, -1000.0, 1000.0, 1000.0);
    map.resolution = 1e-9;
    let surface = layer.attach(Arc::new(map));

    assert!(layer.update().is_none());
    assert!(source.requested().is_empty());
    assert!(surface.is_blank());
}

#[tokio::test]
async fn test_tiles_cover_whole_viewport() {
    let (layer, source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(256))));
    let surface = layer.attach(Arc::new(StaticView::new(-60.0, -5.0, 4, 300, 200)));

    let batch = layer.update().unwrap();
    let mut expected = batch.range().tiles();
    expected.sort_by_key(|c| (c.z, c.x, c.y));
    let outcomes = batch.join().await;

    assert!(outcomes.iter().all(|o| o.state() == TileState::Composited));
    assert_eq!(source.requested(), expected);

    let snapshot = surface.snapshot();
    assert_eq!((snapshot.width(), snapshot.height()), (300, 200));
    assert!(
        snapshot.pixels().chunks_exact(4).all(|px| px[3] == 100),
        "every surface pixel is covered by some tile"
    );
}

// ============================================================================
// Visibility and clearing
// ============================================================================

#[tokio::test]
async fn test_hidden_layer_does_nothing() {
    let (layer, source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 10), 16, 0.0)));

    layer.update().unwrap().join().await;
    assert!(!surface.is_blank());

    layer.hide();
    assert!(surface.is_blank());
    assert!(layer.on_viewport_changed().is_none());
    assert!(layer.force_redraw().is_none());
    assert_eq!(source.requested().len(), 1);

    layer.show().unwrap().join().await;
    assert!(!surface.is_blank());
}

#[tokio::test]
async fn test_pan_start_clears_surface() {
    let (layer, _source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 10), 16, 0.0)));

    layer.update().unwrap().join().await;
    assert!(!surface.is_blank());

    layer.on_pan_or_zoom_started();
    assert!(surface.is_blank());
}

#[tokio::test]
async fn test_detach_clears_and_stops_updates() {
    let (layer, _source) =
        layer_with(MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2))));
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 10), 16, 0.0)));
    layer.update().unwrap().join().await;

    layer.detach();
    assert!(surface.is_blank());
    assert!(layer.update().is_none());
}

// ============================================================================
// Late tiles
// ============================================================================

#[tokio::test]
async fn test_late_tile_still_composites_by_default() {
    let (source, gate) = MockTileSource::new()
        .with_fallback(MockTile::Png(solid_tile(2)))
        .gated();
    let (layer, _source) = layer_with(source);
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 10), 16, 0.0)));

    let batch = layer.update().unwrap();
    layer.on_pan_or_zoom_started();
    gate.add_permits(batch.len());
    let outcomes = batch.join().await;

    assert_eq!(outcomes[0].state(), TileState::Composited);
    assert!(!surface.is_blank());
}

#[tokio::test]
async fn test_late_tile_discarded_when_enabled() {
    let (source, gate) = MockTileSource::new()
        .with_fallback(MockTile::Png(solid_tile(2)))
        .gated();
    let source = Arc::new(source);
    let layer = AlertLayer::new(source.clone(), full_range()).with_discard_stale_tiles(true);
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 10), 16, 0.0)));

    let batch = layer.update().unwrap();
    layer.on_pan_or_zoom_started();
    gate.add_permits(batch.len());
    let outcomes = batch.join().await;

    assert_eq!(outcomes[0].state(), TileState::Discarded);
    assert!(surface.is_blank());
    assert_eq!(layer.metrics().discarded, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_guard_never_draws_after_clear() {
    for _ in 0..50 {
        let source = MockTileSource::new().with_fallback(MockTile::Png(solid_tile(2)));
        let layer = AlertLayer::new(Arc::new(source), full_range()).with_discard_stale_tiles(true);
        let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 12), 16, 0.0)));

        let batch = layer.update().unwrap();
        tokio::task::yield_now().await;
        layer.on_pan_or_zoom_started();
        batch.join().await;

        // Tiles composited before the clear were wiped; later ones were stale
        assert!(surface.is_blank());
    }
}

// ============================================================================
// Completion order
// ============================================================================

#[tokio::test]
async fn test_tiles_complete_out_of_order() {
    let west = TileCoord::new(5, 10, 16);
    let east = TileCoord::new(5, 11, 16);
    let (source, west_gate) = MockTileSource::new()
        .with_tile(west, MockTile::Png(solid_tile(2)))
        .with_tile(east, MockTile::Png(mixed_tile()))
        .gated_tile(west);
    let (source, east_gate) = source.gated_tile(east);
    let (layer, _source) = layer_with(source);
    let surface = layer.attach(Arc::new(ScriptedMap::over_tiles(5, (10, 11), 16, 0.0)));

    let batch = layer.update().unwrap();

    // Later tile in the batch settles first
    east_gate.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), async {
        while layer.metrics().composited < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("east tile composites while west is still pending");
    assert_eq!(surface.pixel(256, 0).unwrap()[3], 150);
    assert_eq!(surface.pixel(0, 0).unwrap()[3], 0);

    west_gate.add_permits(1);
    let outcomes = batch.join().await;

    assert!(outcomes.iter().all(|o| o.state() == TileState::Composited));
    assert_eq!(surface.pixel(0, 0).unwrap()[3], 100);
    assert_eq!(surface.pixel(256, 0).unwrap()[3], 150);
    assert_eq!(surface.pixel(257, 0).unwrap()[3], 0);
}
