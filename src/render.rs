//! Rendering: paints the layered scene onto a [`Surface`].
//!
//! Layer order is fixed: background map, grid, tokens, text annotations,
//! selection outline. The viewport transform is applied once at the start of
//! the frame, so every layer draws in world units. Sizes defined in screen
//! pixels (line widths, fonts, dash lengths) are divided by the zoom factor
//! before use so they look the same at every zoom level.
//!
//! Drawing only reads scene state. The renderer's own state is the hex cell
//! cache and the set of image assets already reported as failed.
//!
//! All fallible surface calls propagate via `Result<(), SurfaceError>`; the
//! caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::HashSet;
use std::f64::consts::TAU;

use crate::config::{MapScaling, TableConfig};
use crate::consts::{
    GRID_LINE_PX, INK_COLOR, LABEL_GAP_PX, LABEL_STROKE_PX, PAPER_COLOR, SELECTION_COLOR, SELECTION_DASH_PX,
    SELECTION_LINE_PX, SELECTION_PAD_PX, TEXT_STROKE_PX, TOKEN_OUTLINE_PX,
};
use crate::error::SurfaceError;
use crate::grid::{self, GridConfig, GridKind, HexGridCache};
use crate::hit;
use crate::scene::{AssetRef, EntityRef, SceneStore, TextAnnotation, Token, TokenKind};
use crate::surface::{ImageState, Surface, TextAlign, TextBaseline};
use crate::viewport::{Point, Rect, Viewport};

/// Everything one frame is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub scene: &'a SceneStore,
    pub viewport: &'a Viewport,
    pub grid: &'a GridConfig,
    pub config: &'a TableConfig,
    /// Canvas size in CSS pixels.
    pub width: f64,
    pub height: f64,
    /// Device pixel ratio.
    pub dpr: f64,
}

impl Frame<'_> {
    fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    /// A screen-pixel length in world units.
    fn px(&self, screen_px: f64) -> f64 {
        self.viewport.screen_dist_to_world(screen_px)
    }
}

/// Draws frames and owns the caches that survive between them.
#[derive(Debug, Default)]
pub struct Renderer {
    hex: HexGridCache,
    failed_assets: HashSet<AssetRef>,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The hex cell cache, for inspection.
    #[must_use]
    pub fn hex_cache(&self) -> &HexGridCache {
        &self.hex
    }

    /// Whether `asset` has been reported as failed.
    #[must_use]
    pub fn has_failed(&self, asset: &AssetRef) -> bool {
        self.failed_assets.contains(asset)
    }

    /// Forget failures of assets not in `live`, so a reference that comes
    /// back later is warned about again.
    pub fn retain_assets(&mut self, live: &HashSet<AssetRef>) {
        self.failed_assets.retain(|asset| live.contains(asset));
    }

    /// Draw the full scene.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any surface call fails.
    pub fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: &Frame<'_>) -> Result<(), SurfaceError> {
        let offset = frame.viewport.offset();
        let zoom = frame.zoom();

        surface.reset_transform(frame.dpr)?;
        surface.clear(frame.width, frame.height);
        surface.save();
        surface.translate(offset.x, offset.y)?;
        surface.scale(zoom, zoom)?;

        let visible = frame.viewport.visible_world_rect(frame.width, frame.height);

        self.draw_background(surface, frame, visible)?;
        self.draw_grid(surface, frame, visible);
        for token in frame.scene.tokens() {
            self.draw_token(surface, frame, token)?;
        }
        for text in frame.scene.texts() {
            draw_text(surface, frame, text)?;
        }
        if let Some(selected) = frame.scene.selection() {
            draw_selection(surface, frame, selected)?;
        }

        surface.restore();
        Ok(())
    }

    // =============================================================
    // Layers
    // =============================================================

    fn draw_background<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &Frame<'_>,
        visible: Rect,
    ) -> Result<(), SurfaceError> {
        let Some(asset) = frame.scene.background() else {
            return Ok(());
        };
        let Some((width, height)) = self.ready_image(surface, asset) else {
            return Ok(());
        };
        // Anchored at the world origin so the map pans and zooms with the scene.
        let dest = match frame.config.map_scaling {
            MapScaling::FitView => Rect::new(0.0, 0.0, visible.width, visible.height),
            MapScaling::Natural => Rect::new(0.0, 0.0, width, height),
        };
        surface.draw_image(asset, dest)
    }

    fn draw_grid<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: &Frame<'_>, visible: Rect) {
        let Some(size) = frame.grid.drawable_cell_size(visible, frame.width, frame.height) else {
            return;
        };

        surface.save();
        surface.set_stroke_color(&frame.grid.color);
        surface.set_line_width(frame.px(GRID_LINE_PX));
        surface.set_global_alpha(frame.config.grid_alpha);
        surface.begin_path();

        match frame.grid.kind {
            GridKind::Square => {
                let lines = grid::square_lines(visible, size);
                for &x in &lines.vertical {
                    surface.move_to(Point::new(x, lines.bounds.y));
                    surface.line_to(Point::new(x, lines.bounds.bottom()));
                }
                for &y in &lines.horizontal {
                    surface.move_to(Point::new(lines.bounds.x, y));
                    surface.line_to(Point::new(lines.bounds.right(), y));
                }
            }
            GridKind::Hex => {
                self.hex.ensure(size, frame.width, frame.height);
                for center in self.hex.visible_centers(visible) {
                    let [first, rest @ ..] = grid::hex_corners(center, size);
                    surface.move_to(first);
                    for corner in rest {
                        surface.line_to(corner);
                    }
                    surface.close_path();
                }
            }
            GridKind::None => {}
        }

        surface.stroke();
        surface.restore();
    }

    fn draw_token<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &Frame<'_>,
        token: &Token,
    ) -> Result<(), SurfaceError> {
        match (token.kind, &token.image) {
            (TokenKind::Image, Some(asset)) => {
                if self.ready_image(surface, asset).is_some() {
                    let side = token.radius * 2.0;
                    let dest = Rect::new(token.x - token.radius, token.y - token.radius, side, side);
                    surface.draw_image(asset, dest)?;
                }
                Ok(())
            }
            // An image token without a sprite reference falls back to a shape.
            _ => draw_shape_token(surface, frame, token),
        }
    }

    /// Natural size of `asset` if it is ready to draw. Failures are logged
    /// once per asset.
    fn ready_image<S: Surface + ?Sized>(&mut self, surface: &mut S, asset: &AssetRef) -> Option<(f64, f64)> {
        match surface.image_state(asset) {
            ImageState::Ready { width, height } => Some((width, height)),
            ImageState::Loading => None,
            ImageState::Failed => {
                if self.failed_assets.insert(asset.clone()) {
                    tracing::warn!(asset = asset.as_str(), "image asset failed to load; skipping");
                }
                None
            }
        }
    }
}

// =============================================================
// Entity renderers
// =============================================================

fn draw_shape_token<S: Surface + ?Sized>(surface: &mut S, frame: &Frame<'_>, token: &Token) -> Result<(), SurfaceError> {
    let center = token.position();

    surface.begin_path();
    surface.arc(center, token.radius, 0.0, TAU)?;
    surface.set_fill_color(&token.color);
    surface.fill();
    surface.set_stroke_color(INK_COLOR);
    surface.set_line_width(frame.px(TOKEN_OUTLINE_PX));
    surface.stroke();

    let label_at = Point::new(token.x, token.y + token.radius + frame.px(LABEL_GAP_PX));
    surface.set_font(&frame.config.label_style().at_zoom(frame.zoom()));
    surface.set_text_align(TextAlign::Center);
    surface.set_text_baseline(TextBaseline::Alphabetic);
    surface.set_stroke_color(INK_COLOR);
    surface.set_line_width(frame.px(LABEL_STROKE_PX));
    surface.stroke_text(&token.name, label_at)?;
    surface.set_fill_color(PAPER_COLOR);
    surface.fill_text(&token.name, label_at)
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, frame: &Frame<'_>, text: &TextAnnotation) -> Result<(), SurfaceError> {
    let at = text.position();
    surface.set_font(&frame.config.text_style().at_zoom(frame.zoom()));
    surface.set_text_align(TextAlign::Left);
    surface.set_text_baseline(TextBaseline::Top);
    surface.set_stroke_color(INK_COLOR);
    surface.set_line_width(frame.px(TEXT_STROKE_PX));
    surface.stroke_text(&text.content, at)?;
    surface.set_fill_color(PAPER_COLOR);
    surface.fill_text(&text.content, at)
}

fn draw_selection<S: Surface + ?Sized>(
    surface: &mut S,
    frame: &Frame<'_>,
    selected: EntityRef,
) -> Result<(), SurfaceError> {
    let Some(outline) = selection_outline(surface, frame, selected) else {
        return Ok(());
    };
    let dash = SELECTION_DASH_PX.map(|d| frame.px(d));

    surface.save();
    surface.set_stroke_color(SELECTION_COLOR);
    surface.set_line_width(frame.px(SELECTION_LINE_PX));
    surface.set_line_dash(&dash)?;
    surface.stroke_rect(outline);
    surface.set_line_dash(&[])?;
    surface.restore();
    Ok(())
}

/// World-space outline around the selected entity: a padded square around a
/// token, or the padded measured box of a text annotation.
fn selection_outline<S: Surface + ?Sized>(surface: &S, frame: &Frame<'_>, selected: EntityRef) -> Option<Rect> {
    let pad = frame.px(SELECTION_PAD_PX);
    match selected {
        EntityRef::Token(id) => {
            let token = frame.scene.token(&id)?;
            let r = token.radius + pad;
            Some(Rect::new(token.x - r, token.y - r, r * 2.0, r * 2.0))
        }
        EntityRef::Text(id) => {
            let text = frame.scene.text(&id)?;
            let bounds = hit::text_bounds(text, frame.zoom(), &frame.config.text_style(), surface);
            Some(bounds.expand(pad))
        }
    }
}
