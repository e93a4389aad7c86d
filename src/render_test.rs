#![allow(clippy::float_cmp)]

use super::*;
use crate::scene::{NewText, NewToken};
use crate::surface::{DrawOp, RecordingSurface};

struct Fixture {
    scene: SceneStore,
    viewport: Viewport,
    grid: GridConfig,
    config: TableConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            scene: SceneStore::new(),
            viewport: Viewport::default(),
            grid: GridConfig::default(),
            config: TableConfig::default(),
        }
    }

    fn frame(&self) -> Frame<'_> {
        Frame {
            scene: &self.scene,
            viewport: &self.viewport,
            grid: &self.grid,
            config: &self.config,
            width: 800.0,
            height: 600.0,
            dpr: 1.0,
        }
    }

    fn draw(&self, renderer: &mut Renderer, surface: &mut RecordingSurface) {
        renderer.draw(surface, &self.frame()).unwrap();
    }
}

fn position(ops: &[DrawOp], pred: impl Fn(&DrawOp) -> bool) -> usize {
    ops.iter().position(pred).unwrap()
}

// =============================================================
// Frame setup
// =============================================================

#[test]
fn frame_starts_with_dpr_clear_and_viewport_transform() {
    let mut fx = Fixture::new();
    fx.viewport = Viewport::default().at(2.0, 100.0, 50.0);
    let frame = Frame { dpr: 2.0, ..fx.frame() };
    let mut surface = RecordingSurface::new();
    Renderer::new().draw(&mut surface, &frame).unwrap();

    assert_eq!(
        &surface.ops()[..5],
        &[
            DrawOp::ResetTransform { dpr: 2.0 },
            DrawOp::Clear { width: 800.0, height: 600.0 },
            DrawOp::Save,
            DrawOp::Translate { x: 100.0, y: 50.0 },
            DrawOp::Scale { sx: 2.0, sy: 2.0 },
        ]
    );
    assert_eq!(surface.ops().last(), Some(&DrawOp::Restore));
}

#[test]
fn empty_scene_draws_nothing_but_setup() {
    let fx = Fixture::new();
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);
    assert_eq!(surface.ops().len(), 6);
}

// =============================================================
// Grid
// =============================================================

#[test]
fn square_grid_lines_cover_canvas() {
    let mut fx = Fixture::new();
    fx.grid = GridConfig { kind: GridKind::Square, cell_size: 50.0, color: "#333".into() };
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    let moves: Vec<Point> = surface
        .ops()
        .iter()
        .filter_map(|op| match op {
            DrawOp::MoveTo(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(moves.len(), 17 + 13);
    assert_eq!(moves[0], Point::new(0.0, 0.0));
    assert_eq!(moves[16], Point::new(800.0, 0.0));
    assert_eq!(moves[29], Point::new(0.0, 600.0));
    assert!(surface.ops().contains(&DrawOp::GlobalAlpha(0.5)));
    assert!(surface.ops().contains(&DrawOp::StrokeColor("#333".into())));
}

#[test]
fn grid_line_width_is_zoom_compensated() {
    let mut fx = Fixture::new();
    fx.grid.kind = GridKind::Square;
    fx.viewport = Viewport::default().at(4.0, 0.0, 0.0);
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);
    assert!(surface.ops().contains(&DrawOp::LineWidth(0.25)));
}

#[test]
fn invalid_cell_size_draws_no_grid() {
    let mut fx = Fixture::new();
    fx.grid = GridConfig { kind: GridKind::Square, cell_size: 0.0, ..GridConfig::default() };
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::GlobalAlpha(_))), 0);

    fx.grid.cell_size = f64::NAN;
    surface.clear_ops();
    fx.draw(&mut Renderer::new(), &mut surface);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::GlobalAlpha(_))), 0);
}

#[test]
fn too_dense_grid_draws_nothing() {
    let mut fx = Fixture::new();
    let mut renderer = Renderer::new();
    let mut surface = RecordingSurface::new();
    for grid in [
        GridConfig { kind: GridKind::Square, cell_size: 0.0005, ..GridConfig::default() },
        GridConfig { kind: GridKind::Hex, cell_size: 0.2, ..GridConfig::default() },
    ] {
        fx.grid = grid;
        surface.clear_ops();
        fx.draw(&mut renderer, &mut surface);
        assert_eq!(surface.count(|op| matches!(op, DrawOp::GlobalAlpha(_))), 0);
        assert_eq!(surface.count(|op| matches!(op, DrawOp::LineTo(_))), 0);
    }
    assert!(renderer.hex_cache().is_empty());
}

#[test]
fn hex_grid_strokes_closed_cells() {
    let mut fx = Fixture::new();
    fx.grid = GridConfig { kind: GridKind::Hex, cell_size: 50.0, ..GridConfig::default() };
    let mut surface = RecordingSurface::new();
    let mut renderer = Renderer::new();
    fx.draw(&mut renderer, &mut surface);

    let cells = surface.count(|op| *op == DrawOp::ClosePath);
    assert!(cells > 0);
    assert!(cells <= renderer.hex_cache().len());
    assert_eq!(surface.count(|op| matches!(op, DrawOp::LineTo(_))), cells * 5);
}

#[test]
fn hex_cache_survives_pan_and_zoom() {
    let mut fx = Fixture::new();
    fx.grid = GridConfig { kind: GridKind::Hex, cell_size: 40.0, ..GridConfig::default() };
    let mut renderer = Renderer::new();
    let mut surface = RecordingSurface::new();

    fx.draw(&mut renderer, &mut surface);
    fx.viewport.pan_by(Point::new(120.0, -40.0));
    fx.draw(&mut renderer, &mut surface);
    fx.viewport.zoom_at(Point::new(400.0, 300.0), 2.0);
    fx.draw(&mut renderer, &mut surface);
    assert_eq!(renderer.hex_cache().regenerations(), 1);

    fx.grid.cell_size = 60.0;
    fx.draw(&mut renderer, &mut surface);
    assert_eq!(renderer.hex_cache().regenerations(), 2);
}

// =============================================================
// Tokens and text
// =============================================================

#[test]
fn shape_token_draws_circle_outline_and_label() {
    let mut fx = Fixture::new();
    fx.viewport = Viewport::default().at(2.0, 0.0, 0.0);
    fx.scene.add_token(
        NewToken { name: "Elf".into(), color: "#00ff00".into(), ..Default::default() },
        Point::new(10.0, 20.0),
        30.0,
    );
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    let ops = surface.ops();
    assert!(ops.contains(&DrawOp::Arc { center: Point::new(10.0, 20.0), radius: 30.0 }));
    assert!(ops.contains(&DrawOp::FillColor("#00ff00".into())));
    assert!(ops.contains(&DrawOp::Font("8px Inter".into())));

    let label_at = Point::new(10.0, 20.0 + 30.0 + 10.0);
    let stroke = position(ops, |op| *op == DrawOp::StrokeText { text: "Elf".into(), at: label_at });
    let fill = position(ops, |op| *op == DrawOp::FillText { text: "Elf".into(), at: label_at });
    assert!(stroke < fill);
}

#[test]
fn text_is_stroked_then_filled_at_top_left() {
    let mut fx = Fixture::new();
    fx.scene.add_text(NewText { content: "Here be dragons".into() }, Point::new(5.0, 6.0));
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    let ops = surface.ops();
    let at = Point::new(5.0, 6.0);
    let stroke = position(ops, |op| matches!(op, DrawOp::StrokeText { at: p, .. } if *p == at));
    let fill = position(ops, |op| matches!(op, DrawOp::FillText { at: p, .. } if *p == at));
    assert!(stroke < fill);
    assert!(ops.contains(&DrawOp::TextBaseline(TextBaseline::Top)));
    assert!(ops.contains(&DrawOp::LineWidth(4.0)));
    assert!(ops.contains(&DrawOp::Font("24px Inter".into())));
}

#[test]
fn image_token_skipped_while_loading_then_drawn() {
    let mut fx = Fixture::new();
    let sprite = AssetRef::new("orc.png");
    fx.scene.add_token(
        NewToken { image: Some(sprite.clone()), ..Default::default() },
        Point::new(100.0, 100.0),
        30.0,
    );
    let mut renderer = Renderer::new();
    let mut surface = RecordingSurface::new();

    fx.draw(&mut renderer, &mut surface);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::DrawImage { .. })), 0);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::Arc { .. })), 0);

    surface.set_image_state(sprite.clone(), ImageState::Ready { width: 256.0, height: 256.0 });
    surface.clear_ops();
    fx.draw(&mut renderer, &mut surface);
    assert!(surface.ops().contains(&DrawOp::DrawImage { image: sprite, dest: Rect::new(70.0, 70.0, 60.0, 60.0) }));
}

#[test]
fn failed_image_token_is_skipped() {
    let mut fx = Fixture::new();
    let sprite = AssetRef::new("missing.png");
    fx.scene.add_token(NewToken { image: Some(sprite.clone()), ..Default::default() }, Point::default(), 30.0);
    let mut surface = RecordingSurface::new();
    surface.set_image_state(sprite, ImageState::Failed);
    let mut renderer = Renderer::new();
    fx.draw(&mut renderer, &mut surface);
    fx.draw(&mut renderer, &mut surface);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::DrawImage { .. })), 0);
}

#[test]
fn retain_assets_forgets_dropped_failures() {
    let mut fx = Fixture::new();
    let sprite = AssetRef::new("missing.png");
    fx.scene.add_token(NewToken { image: Some(sprite.clone()), ..Default::default() }, Point::default(), 30.0);
    let mut surface = RecordingSurface::new();
    surface.set_image_state(sprite.clone(), ImageState::Failed);
    let mut renderer = Renderer::new();
    fx.draw(&mut renderer, &mut surface);
    assert!(renderer.has_failed(&sprite));

    renderer.retain_assets(&fx.scene.referenced_assets());
    assert!(renderer.has_failed(&sprite));

    renderer.retain_assets(&HashSet::new());
    assert!(!renderer.has_failed(&sprite));
}

#[test]
fn image_kind_without_reference_draws_shape() {
    let mut fx = Fixture::new();
    let id = fx.scene.add_token(NewToken::default(), Point::default(), 30.0).id;
    fx.scene.select(Some(EntityRef::Token(id)));
    fx.scene.update_selected(&crate::scene::EntityPatch { kind: Some(TokenKind::Image), ..Default::default() });
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);
    assert_eq!(surface.count(|op| matches!(op, DrawOp::Arc { .. })), 1);
}

// =============================================================
// Background
// =============================================================

#[test]
fn background_fits_visible_size_at_world_origin() {
    let mut fx = Fixture::new();
    let map = AssetRef::new("map.png");
    fx.scene.set_background(Some(map.clone()));
    fx.viewport = Viewport::default().at(2.0, 100.0, 50.0);
    let mut surface = RecordingSurface::new();
    surface.set_image_state(map.clone(), ImageState::Ready { width: 1024.0, height: 768.0 });
    fx.draw(&mut Renderer::new(), &mut surface);

    let expected = Rect::new(0.0, 0.0, 400.0, 300.0);
    assert!(surface.ops().contains(&DrawOp::DrawImage { image: map, dest: expected }));
}

#[test]
fn background_moves_on_screen_when_panned() {
    let mut fx = Fixture::new();
    let map = AssetRef::new("map.png");
    fx.scene.set_background(Some(map.clone()));
    let mut surface = RecordingSurface::new();
    surface.set_image_state(map.clone(), ImageState::Ready { width: 100.0, height: 100.0 });
    let mut renderer = Renderer::new();

    let drawn_origin = |surface: &RecordingSurface, viewport: &Viewport| {
        surface
            .ops()
            .iter()
            .find_map(|op| match op {
                DrawOp::DrawImage { dest, .. } => Some(viewport.world_to_screen(Point::new(dest.x, dest.y))),
                _ => None,
            })
            .unwrap()
    };

    fx.draw(&mut renderer, &mut surface);
    let before = drawn_origin(&surface, &fx.viewport);

    fx.viewport.pan_by(Point::new(100.0, 0.0));
    surface.clear_ops();
    fx.draw(&mut renderer, &mut surface);
    let after = drawn_origin(&surface, &fx.viewport);

    assert_eq!(before, Point::new(0.0, 0.0));
    assert_eq!(after, Point::new(100.0, 0.0));
}

#[test]
fn background_natural_size_at_origin() {
    let mut fx = Fixture::new();
    let map = AssetRef::new("map.png");
    fx.scene.set_background(Some(map.clone()));
    fx.config.map_scaling = MapScaling::Natural;
    let mut surface = RecordingSurface::new();
    surface.set_image_state(map.clone(), ImageState::Ready { width: 1024.0, height: 768.0 });
    fx.draw(&mut Renderer::new(), &mut surface);
    assert!(surface.ops().contains(&DrawOp::DrawImage { image: map, dest: Rect::new(0.0, 0.0, 1024.0, 768.0) }));
}

#[test]
fn layers_draw_in_fixed_order() {
    let mut fx = Fixture::new();
    let map = AssetRef::new("map.png");
    fx.scene.set_background(Some(map.clone()));
    fx.grid.kind = GridKind::Square;
    let token = fx.scene.add_token(NewToken::default(), Point::new(50.0, 50.0), 30.0).id;
    fx.scene.add_text(NewText { content: "note".into() }, Point::new(60.0, 60.0));
    fx.scene.select(Some(EntityRef::Token(token)));
    let mut surface = RecordingSurface::new();
    surface.set_image_state(map, ImageState::Ready { width: 10.0, height: 10.0 });
    fx.draw(&mut Renderer::new(), &mut surface);

    let ops = surface.ops();
    let background = position(ops, |op| matches!(op, DrawOp::DrawImage { .. }));
    let grid = position(ops, |op| matches!(op, DrawOp::GlobalAlpha(_)));
    let token = position(ops, |op| matches!(op, DrawOp::Arc { .. }));
    let text = position(ops, |op| matches!(op, DrawOp::FillText { text, .. } if text == "note"));
    let selection = position(ops, |op| matches!(op, DrawOp::StrokeRect(_)));
    assert!(background < grid);
    assert!(grid < token);
    assert!(token < text);
    assert!(text < selection);
}

// =============================================================
// Selection
// =============================================================

#[test]
fn token_selection_is_padded_dashed_square() {
    let mut fx = Fixture::new();
    let id = fx.scene.add_token(NewToken::default(), Point::new(0.0, 0.0), 30.0).id;
    fx.scene.select(Some(EntityRef::Token(id)));
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    let ops = surface.ops();
    assert!(ops.contains(&DrawOp::StrokeRect(Rect::new(-35.0, -35.0, 70.0, 70.0))));
    assert!(ops.contains(&DrawOp::LineDash(vec![10.0, 5.0])));
    assert!(ops.contains(&DrawOp::LineDash(vec![])));
    assert!(ops.contains(&DrawOp::LineWidth(3.0)));
}

#[test]
fn selection_dash_scales_with_zoom() {
    let mut fx = Fixture::new();
    fx.viewport = Viewport::default().at(2.0, 0.0, 0.0);
    let id = fx.scene.add_token(NewToken::default(), Point::new(0.0, 0.0), 30.0).id;
    fx.scene.select(Some(EntityRef::Token(id)));
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    let ops = surface.ops();
    assert!(ops.contains(&DrawOp::LineDash(vec![5.0, 2.5])));
    assert!(ops.contains(&DrawOp::StrokeRect(Rect::new(-32.5, -32.5, 65.0, 65.0))));
}

#[test]
fn text_selection_uses_measured_bounds() {
    let mut fx = Fixture::new();
    let id = fx.scene.add_text(NewText { content: "abcd".into() }, Point::new(10.0, 10.0)).id;
    fx.scene.select(Some(EntityRef::Text(id)));
    let mut surface = RecordingSurface::new();
    fx.draw(&mut Renderer::new(), &mut surface);

    // 4 chars at 24px: 57.6 wide, 24 tall, padded by 5.
    let rect = surface
        .ops()
        .iter()
        .find_map(|op| match op {
            DrawOp::StrokeRect(r) => Some(*r),
            _ => None,
        })
        .unwrap();
    assert!((rect.x - 5.0).abs() < 1e-9);
    assert!((rect.y - 5.0).abs() < 1e-9);
    assert!((rect.width - 67.6).abs() < 1e-9);
    assert!((rect.height - 34.0).abs() < 1e-9);
}

#[test]
fn draw_is_idempotent() {
    let mut fx = Fixture::new();
    fx.grid.kind = GridKind::Hex;
    fx.scene.add_token(NewToken::default(), Point::new(10.0, 10.0), 30.0);
    let mut renderer = Renderer::new();
    let mut first = RecordingSurface::new();
    let mut second = RecordingSurface::new();
    fx.draw(&mut renderer, &mut first);
    fx.draw(&mut renderer, &mut second);
    assert_eq!(first.ops(), second.ops());
}
