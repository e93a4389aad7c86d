#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `pt` lies inside or on the edge of the rectangle.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// Grow the rectangle by `amount` on every side.
    #[must_use]
    pub fn expand(&self, amount: f64) -> Rect {
        Rect {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }
}

/// Pan/zoom state of the tabletop.
///
/// `offset_x` / `offset_y` are in CSS pixels and unconstrained.
/// `zoom` is a scale factor (1.0 = no zoom), always inside `[min_zoom, max_zoom]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    offset_x: f64,
    offset_y: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, offset_x: 0.0, offset_y: 0.0, min_zoom: MIN_ZOOM, max_zoom: MAX_ZOOM }
    }
}

impl Viewport {
    /// A viewport with the given zoom bounds, at identity.
    ///
    /// Bounds that are not finite, not positive, or inverted fall back to
    /// [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    #[must_use]
    pub fn with_bounds(min_zoom: f64, max_zoom: f64) -> Self {
        let usable = min_zoom.is_finite() && max_zoom.is_finite() && min_zoom > 0.0 && min_zoom <= max_zoom;
        let (min_zoom, max_zoom) = if usable { (min_zoom, max_zoom) } else { (MIN_ZOOM, MAX_ZOOM) };
        Self { min_zoom, max_zoom, zoom: 1.0_f64.clamp(min_zoom, max_zoom), ..Self::default() }
    }

    /// Set zoom and offset directly. Zoom is clamped to the bounds.
    #[must_use]
    pub fn at(mut self, zoom: f64, offset_x: f64, offset_y: f64) -> Self {
        self.zoom = self.clamp_zoom(zoom);
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn offset(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }

    #[must_use]
    pub fn zoom_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.offset_x) / self.zoom,
            y: (screen.y - self.offset_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.offset_x,
            y: world.y * self.zoom + self.offset_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Multiply zoom by `zoom_delta`, keeping the world point under
    /// `screen_anchor` fixed on screen.
    pub fn zoom_at(&mut self, screen_anchor: Point, zoom_delta: f64) {
        let world = self.screen_to_world(screen_anchor);
        let new_zoom = self.clamp_zoom(self.zoom * zoom_delta);
        self.offset_x = screen_anchor.x - world.x * new_zoom;
        self.offset_y = screen_anchor.y - world.y * new_zoom;
        self.zoom = new_zoom;
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by(&mut self, delta_screen: Point) {
        self.offset_x += delta_screen.x;
        self.offset_y += delta_screen.y;
    }

    /// World-space rectangle covered by a canvas of the given CSS-pixel size.
    #[must_use]
    pub fn visible_world_rect(&self, width: f64, height: f64) -> Rect {
        let top_left = self.screen_to_world(Point::new(0.0, 0.0));
        Rect::new(top_left.x, top_left.y, width / self.zoom, height / self.zoom)
    }

    /// World-space point at the center of a canvas of the given CSS-pixel size.
    #[must_use]
    pub fn world_center(&self, width: f64, height: f64) -> Point {
        self.screen_to_world(Point::new(width / 2.0, height / 2.0))
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
