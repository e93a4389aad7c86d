#![allow(clippy::float_cmp)]

use super::*;
use crate::consts::{MAX_HEX_CELLS, MAX_SQUARE_LINES};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// =============================================================
// GridConfig
// =============================================================

#[test]
fn kind_none_has_no_cell_size() {
    let grid = GridConfig { kind: GridKind::None, cell_size: 50.0, color: "#fff".into() };
    assert_eq!(grid.effective_cell_size(), None);
}

#[test]
fn non_positive_or_nan_size_has_no_cell_size() {
    for size in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let grid = GridConfig { kind: GridKind::Square, cell_size: size, color: "#fff".into() };
        assert_eq!(grid.effective_cell_size(), None, "size {size}");
    }
}

#[test]
fn hex_with_positive_size_is_drawn() {
    let grid = GridConfig { kind: GridKind::Hex, cell_size: 32.0, color: "#fff".into() };
    assert_eq!(grid.effective_cell_size(), Some(32.0));
}

#[test]
fn kind_serde_names_and_graph_alias() {
    assert_eq!(serde_json::to_string(&GridKind::Square).unwrap(), "\"square\"");
    assert_eq!(serde_json::to_string(&GridKind::Hex).unwrap(), "\"hex\"");
    let legacy: GridKind = serde_json::from_str("\"graph\"").unwrap();
    assert_eq!(legacy, GridKind::Square);
    let none: GridKind = serde_json::from_str("\"none\"").unwrap();
    assert_eq!(none, GridKind::None);
}

#[test]
fn drawable_size_rejects_dense_square_grid() {
    let grid = GridConfig { kind: GridKind::Square, cell_size: 0.0005, color: "#fff".into() };
    let visible = Rect::new(0.0, 0.0, 800.0, 600.0);
    assert_eq!(grid.drawable_cell_size(visible, 800.0, 600.0), None);

    let grid = GridConfig { cell_size: 50.0, ..grid };
    assert_eq!(grid.drawable_cell_size(visible, 800.0, 600.0), Some(50.0));
}

#[test]
fn drawable_size_rejects_dense_hex_grid() {
    let visible = Rect::new(0.0, 0.0, 800.0, 600.0);
    let grid = GridConfig { kind: GridKind::Hex, cell_size: 0.2, color: "#fff".into() };
    assert_eq!(grid.drawable_cell_size(visible, 800.0, 600.0), None);

    let grid = GridConfig { cell_size: 50.0, ..grid };
    assert_eq!(grid.drawable_cell_size(visible, 800.0, 600.0), Some(50.0));
}

#[test]
fn drawable_size_of_kind_none_is_none() {
    let grid = GridConfig::default();
    assert_eq!(grid.drawable_cell_size(Rect::new(0.0, 0.0, 800.0, 600.0), 800.0, 600.0), None);
}

// =============================================================
// Square lines
// =============================================================

#[test]
fn square_lines_identity_800x600() {
    let lines = square_lines(Rect::new(0.0, 0.0, 800.0, 600.0), 50.0);
    let expected_x: Vec<f64> = (0..=16).map(|k| f64::from(k) * 50.0).collect();
    let expected_y: Vec<f64> = (0..=12).map(|k| f64::from(k) * 50.0).collect();
    assert_eq!(lines.vertical, expected_x);
    assert_eq!(lines.horizontal, expected_y);
}

#[test]
fn square_lines_start_at_floor_of_negative_edge() {
    let lines = square_lines(Rect::new(-75.0, -10.0, 100.0, 20.0), 50.0);
    assert_eq!(lines.vertical, vec![-100.0, -50.0, 0.0]);
    assert_eq!(lines.horizontal, vec![-50.0, 0.0]);
}

#[test]
fn square_lines_bounds_is_visible_rect() {
    let visible = Rect::new(3.0, 4.0, 10.0, 10.0);
    assert_eq!(square_lines(visible, 5.0).bounds, visible);
}

#[test]
fn square_lines_degenerate_size_is_empty() {
    let lines = square_lines(Rect::new(0.0, 0.0, 100.0, 100.0), 0.0);
    assert!(lines.vertical.is_empty());
    assert!(lines.horizontal.is_empty());
}

#[test]
fn square_line_count_matches_generated_lines() {
    let visible = Rect::new(-30.0, 10.0, 800.0, 600.0);
    let lines = square_lines(visible, 50.0);
    let generated = lines.vertical.len() + lines.horizontal.len();
    assert!(approx_eq(square_line_count(visible, 50.0), f64::from(u32::try_from(generated).unwrap())));
}

#[test]
fn square_lines_over_limit_are_empty() {
    let visible = Rect::new(0.0, 0.0, 800.0, 600.0);
    assert!(square_line_count(visible, 0.0005) > f64::from(MAX_SQUARE_LINES));
    let lines = square_lines(visible, 0.0005);
    assert!(lines.vertical.is_empty());
    assert!(lines.horizontal.is_empty());
}

// =============================================================
// Hex geometry
// =============================================================

#[test]
fn hex_origin_is_world_origin() {
    assert_eq!(hex_to_pixel(Axial::new(0, 0), 50.0), Point::new(0.0, 0.0));
}

#[test]
fn hex_to_pixel_axial_layout() {
    let p = hex_to_pixel(Axial::new(1, 0), 10.0);
    assert!(approx_eq(p.x, 10.0 * 3.0_f64.sqrt()));
    assert!(approx_eq(p.y, 0.0));

    let p = hex_to_pixel(Axial::new(0, 2), 10.0);
    assert!(approx_eq(p.x, 20.0 * 3.0_f64.sqrt() / 2.0));
    assert!(approx_eq(p.y, 30.0));
}

#[test]
fn hex_corner_zero_is_at_30_degrees() {
    let c = hex_corner(Point::new(0.0, 0.0), 10.0, 0);
    assert!(approx_eq(c.x, 10.0 * 30.0_f64.to_radians().cos()));
    assert!(approx_eq(c.y, 5.0));
}

#[test]
fn hex_corners_are_all_at_radius() {
    let center = Point::new(7.0, -3.0);
    for corner in hex_corners(center, 12.0) {
        assert!(approx_eq(corner.distance(center), 12.0));
    }
}

#[test]
fn neighbouring_cells_share_corners() {
    let size = 20.0;
    let a = hex_corners(hex_to_pixel(Axial::new(0, 0), size), size);
    let b = hex_corners(hex_to_pixel(Axial::new(1, 0), size), size);
    let shared = a
        .iter()
        .filter(|p| b.iter().any(|q| p.distance(*q) < 1e-6))
        .count();
    assert_eq!(shared, 2);
}

// =============================================================
// Hex cache
// =============================================================

#[test]
fn hex_cell_count_matches_generated_cells() {
    let mut cache = HexGridCache::new();
    cache.regenerate(37.0, 1280.0, 720.0);
    let generated = u32::try_from(cache.len()).unwrap();
    assert!(approx_eq(hex_cell_count(37.0, 1280.0, 720.0), f64::from(generated)));
}

#[test]
fn dense_hex_cache_stays_empty_but_keyed() {
    let mut cache = HexGridCache::new();
    assert!(hex_cell_count(0.2, 800.0, 600.0) > f64::from(MAX_HEX_CELLS));
    cache.regenerate(0.2, 800.0, 600.0);
    assert!(cache.is_empty());
    assert_eq!(cache.key(), Some(HexCacheKey::new(0.2, 800.0, 600.0)));
    assert!(!cache.ensure(0.2, 800.0, 600.0));
}

#[test]
fn new_cache_is_empty_and_unkeyed() {
    let cache = HexGridCache::new();
    assert!(cache.is_empty());
    assert!(cache.key().is_none());
    assert_eq!(cache.regenerations(), 0);
}

#[test]
fn ensure_generates_padded_box() {
    let mut cache = HexGridCache::new();
    assert!(cache.ensure(50.0, 800.0, 600.0));
    // rows = ceil(600 / 75) + 2 = 10, cols = ceil(800 / 86.6) + 2 = 12
    assert_eq!(cache.len(), 120);
    assert!(cache.contains(Axial::new(0, 0)));
    assert!(cache.contains(Axial::new(-6, -5)));
    assert!(cache.contains(Axial::new(5, 4)));
    assert!(!cache.contains(Axial::new(6, 0)));
    assert!(!cache.contains(Axial::new(0, 5)));
}

#[test]
fn ensure_same_key_does_not_regenerate() {
    let mut cache = HexGridCache::new();
    assert!(cache.ensure(50.0, 800.0, 600.0));
    assert!(!cache.ensure(50.0, 800.0, 600.0));
    assert!(!cache.ensure(50.0, 800.0, 600.0));
    assert_eq!(cache.regenerations(), 1);
}

#[test]
fn ensure_regenerates_on_size_or_resize() {
    let mut cache = HexGridCache::new();
    cache.ensure(50.0, 800.0, 600.0);
    assert!(cache.ensure(40.0, 800.0, 600.0));
    assert!(cache.ensure(40.0, 1024.0, 600.0));
    assert!(cache.ensure(40.0, 1024.0, 768.0));
    assert_eq!(cache.regenerations(), 4);
}

#[test]
fn regeneration_is_deterministic() {
    let mut a = HexGridCache::new();
    let mut b = HexGridCache::new();
    a.regenerate(37.0, 913.0, 411.0);
    b.regenerate(37.0, 913.0, 411.0);
    a.regenerate(37.0, 913.0, 411.0);
    assert_eq!(a.cells().collect::<Vec<_>>(), b.cells().collect::<Vec<_>>());
}

#[test]
fn non_positive_size_yields_no_cells_but_keys_cache() {
    let mut cache = HexGridCache::new();
    cache.ensure(0.0, 800.0, 600.0);
    assert!(cache.is_empty());
    assert!(cache.key().is_some());
    assert!(!cache.ensure(0.0, 800.0, 600.0));
}

#[test]
fn invalidate_forces_rebuild() {
    let mut cache = HexGridCache::new();
    cache.ensure(50.0, 800.0, 600.0);
    cache.invalidate();
    assert!(cache.is_empty());
    assert!(cache.ensure(50.0, 800.0, 600.0));
}

#[test]
fn visible_centers_culls_far_cells() {
    let mut cache = HexGridCache::new();
    cache.ensure(50.0, 800.0, 600.0);
    let all = cache.visible_centers(Rect::new(-10_000.0, -10_000.0, 20_000.0, 20_000.0));
    assert_eq!(all.len(), cache.len());

    let visible = Rect::new(0.0, 0.0, 100.0, 100.0);
    let some = cache.visible_centers(visible);
    assert!(!some.is_empty());
    assert!(some.len() < cache.len());
    let culled = visible.expand(100.0);
    assert!(some.iter().all(|c| culled.contains(*c)));
}

#[test]
fn visible_centers_of_unkeyed_cache_is_empty() {
    let cache = HexGridCache::new();
    assert!(cache.visible_centers(Rect::new(0.0, 0.0, 100.0, 100.0)).is_empty());
}
