//! Hit-testing against the scene.
//!
//! Text annotations sit above tokens, and within a layer later entities sit
//! above earlier ones, so the search walks texts newest-first and then tokens
//! newest-first. The first match wins.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::scene::{EntityRef, SceneStore, TextAnnotation, TextBoundsKey, Token};
use crate::surface::{TextMeasure, TextStyle};
use crate::viewport::{Point, Rect};

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub target: EntityRef,
    /// The entity's origin (token center or text top-left) at hit time.
    pub origin: Point,
}

/// Strictly inside the token circle; a point exactly on the rim misses.
#[must_use]
pub fn token_contains(token: &Token, world_pt: Point) -> bool {
    world_pt.distance(token.position()) < token.radius
}

/// World-space `(width, height)` of a text annotation at `zoom`.
///
/// Measurements are cached on the annotation, keyed by zoom and font size,
/// so repeated hit tests at a fixed zoom measure once.
pub fn text_size<M: TextMeasure + ?Sized>(
    text: &TextAnnotation,
    zoom: f64,
    style: &TextStyle,
    measure: &M,
) -> (f64, f64) {
    let key = TextBoundsKey::new(zoom, style.font_px);
    if let Some(size) = text.cached_bounds(key) {
        return size;
    }
    let metrics = measure.measure_text(&text.content, &style.at_zoom(zoom));
    let size = (metrics.width, metrics.height());
    text.store_bounds(key, size.0, size.1);
    size
}

/// World-space rectangle covered by a text annotation.
pub fn text_bounds<M: TextMeasure + ?Sized>(
    text: &TextAnnotation,
    zoom: f64,
    style: &TextStyle,
    measure: &M,
) -> Rect {
    let (width, height) = text_size(text, zoom, style, measure);
    Rect::new(text.x, text.y, width, height)
}

/// Topmost entity under `world_pt`, or `None` for empty space.
pub fn hit_test<M: TextMeasure + ?Sized>(
    world_pt: Point,
    scene: &SceneStore,
    zoom: f64,
    style: &TextStyle,
    measure: &M,
) -> Option<Hit> {
    let text_hit = scene
        .texts()
        .iter()
        .rev()
        .find(|t| text_bounds(t, zoom, style, measure).contains(world_pt))
        .map(|t| Hit { target: EntityRef::Text(t.id), origin: t.position() });
    if text_hit.is_some() {
        return text_hit;
    }

    scene
        .tokens()
        .iter()
        .rev()
        .find(|t| token_contains(t, world_pt))
        .map(|t| Hit { target: EntityRef::Token(t.id), origin: t.position() })
}
