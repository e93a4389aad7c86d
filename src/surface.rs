//! Drawing-surface port.
//!
//! The renderer never talks to a browser API directly; it draws onto any
//! [`Surface`]. The browser implementation lives in [`crate::web`]. The
//! [`RecordingSurface`] here captures every call as a [`DrawOp`] so the
//! render pass and hit-testing can run headless.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use crate::error::SurfaceError;
use crate::scene::AssetRef;
use crate::viewport::{Point, Rect};

/// Measured extent of a run of text, in the units of the font size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f64,
    /// Distance from the top baseline down to the glyph tops is zero, so
    /// `ascent + descent` is the drawn height.
    pub ascent: f64,
    pub descent: f64,
}

impl TextMetrics {
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// A concrete font: size in the current drawing units plus family.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub size: f64,
    pub family: String,
}

impl Font {
    #[must_use]
    pub fn new(size: f64, family: impl Into<String>) -> Self {
        Self { size, family: family.into() }
    }

    /// CSS shorthand, e.g. `"12px Inter"`.
    #[must_use]
    pub fn css(&self) -> String {
        format!("{}px {}", self.size, self.family)
    }
}

/// A font defined in screen pixels; [`TextStyle::at_zoom`] converts it to
/// world units so text keeps a constant on-screen size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_px: f64,
    pub family: String,
}

impl TextStyle {
    #[must_use]
    pub fn new(font_px: f64, family: impl Into<String>) -> Self {
        Self { font_px, family: family.into() }
    }

    #[must_use]
    pub fn at_zoom(&self, zoom: f64) -> Font {
        Font::new(self.font_px / zoom, self.family.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Alphabetic,
}

/// Load state of an image asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageState {
    /// Requested but not decoded yet; skip it this frame.
    Loading,
    /// Decoded; natural size in pixels.
    Ready { width: f64, height: f64 },
    /// The asset could not be loaded; skip it until the reference changes.
    Failed,
}

/// Text measurement, split out so hit-testing can run without a full surface.
pub trait TextMeasure {
    fn measure_text(&self, text: &str, font: &Font) -> TextMetrics;
}

/// A 2D drawing surface with canvas-style path and state calls.
///
/// Calls the browser can reject return `Result`; the rest are infallible.
pub trait Surface: TextMeasure {
    /// Reset to the base transform for a device pixel ratio.
    fn reset_transform(&mut self, dpr: f64) -> Result<(), SurfaceError>;
    fn clear(&mut self, width: f64, height: f64);
    fn translate(&mut self, x: f64, y: f64) -> Result<(), SurfaceError>;
    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), SurfaceError>;
    fn save(&mut self);
    fn restore(&mut self);

    fn set_fill_color(&mut self, color: &str);
    fn set_stroke_color(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), SurfaceError>;
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_font(&mut self, font: &Font);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    fn begin_path(&mut self);
    fn move_to(&mut self, pt: Point);
    fn line_to(&mut self, pt: Point);
    fn close_path(&mut self);
    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) -> Result<(), SurfaceError>;
    fn fill(&mut self);
    fn stroke(&mut self);
    fn stroke_rect(&mut self, rect: Rect);
    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError>;
    fn stroke_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError>;

    /// Current load state of `image`, starting a load on first sight.
    fn image_state(&mut self, image: &AssetRef) -> ImageState;
    /// Draw a ready image stretched over `dest`.
    fn draw_image(&mut self, image: &AssetRef, dest: Rect) -> Result<(), SurfaceError>;

    /// Release loaded images not in `live`. Surfaces without an image cache
    /// keep the default no-op.
    fn retain_images(&mut self, _live: &HashSet<AssetRef>) {}
}

// =============================================================
// Headless implementations
// =============================================================

/// Fixed-advance text metrics: every char is `0.6·size` wide, ascent is
/// `0.8·size`, descent `0.2·size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceMeasure;

impl TextMeasure for MonospaceMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn measure_text(&self, text: &str, font: &Font) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * font.size * 0.6,
            ascent: font.size * 0.8,
            descent: font.size * 0.2,
        }
    }
}

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    ResetTransform { dpr: f64 },
    Clear { width: f64, height: f64 },
    Translate { x: f64, y: f64 },
    Scale { sx: f64, sy: f64 },
    Save,
    Restore,
    FillColor(String),
    StrokeColor(String),
    LineWidth(f64),
    LineDash(Vec<f64>),
    GlobalAlpha(f64),
    Font(String),
    TextAlign(TextAlign),
    TextBaseline(TextBaseline),
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    ClosePath,
    Arc { center: Point, radius: f64 },
    Fill,
    Stroke,
    StrokeRect(Rect),
    FillText { text: String, at: Point },
    StrokeText { text: String, at: Point },
    DrawImage { image: AssetRef, dest: Rect },
}

/// A [`Surface`] that records calls instead of drawing.
///
/// Images are [`ImageState::Loading`] unless set with
/// [`RecordingSurface::set_image_state`]. Text is measured with
/// [`MonospaceMeasure`].
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    images: HashMap<AssetRef, ImageState>,
    measure_calls: Cell<usize>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of recorded ops matching `pred`.
    pub fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn set_image_state(&mut self, image: AssetRef, state: ImageState) {
        self.images.insert(image, state);
    }

    /// Whether `image` has a known load state.
    #[must_use]
    pub fn knows_image(&self, image: &AssetRef) -> bool {
        self.images.contains_key(image)
    }

    /// How many times text has been measured.
    #[must_use]
    pub fn measure_calls(&self) -> usize {
        self.measure_calls.get()
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&self, text: &str, font: &Font) -> TextMetrics {
        self.measure_calls.set(self.measure_calls.get() + 1);
        MonospaceMeasure.measure_text(text, font)
    }
}

impl Surface for RecordingSurface {
    fn reset_transform(&mut self, dpr: f64) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::ResetTransform { dpr });
        Ok(())
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::Clear { width, height });
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::Translate { x, y });
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::Scale { sx, sy });
        Ok(())
    }

    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn set_fill_color(&mut self, color: &str) {
        self.ops.push(DrawOp::FillColor(color.to_owned()));
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.ops.push(DrawOp::StrokeColor(color.to_owned()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::LineWidth(width));
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::LineDash(segments.to_vec()));
        Ok(())
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(DrawOp::GlobalAlpha(alpha));
    }

    fn set_font(&mut self, font: &Font) {
        self.ops.push(DrawOp::Font(font.css()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ops.push(DrawOp::TextAlign(align));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ops.push(DrawOp::TextBaseline(baseline));
    }

    fn begin_path(&mut self) {
        self.ops.push(DrawOp::BeginPath);
    }

    fn move_to(&mut self, pt: Point) {
        self.ops.push(DrawOp::MoveTo(pt));
    }

    fn line_to(&mut self, pt: Point) {
        self.ops.push(DrawOp::LineTo(pt));
    }

    fn close_path(&mut self) {
        self.ops.push(DrawOp::ClosePath);
    }

    fn arc(&mut self, center: Point, radius: f64, _start: f64, _end: f64) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::Arc { center, radius });
        Ok(())
    }

    fn fill(&mut self) {
        self.ops.push(DrawOp::Fill);
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::StrokeRect(rect));
    }

    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::FillText { text: text.to_owned(), at });
        Ok(())
    }

    fn stroke_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::StrokeText { text: text.to_owned(), at });
        Ok(())
    }

    fn image_state(&mut self, image: &AssetRef) -> ImageState {
        *self.images.entry(image.clone()).or_insert(ImageState::Loading)
    }

    fn draw_image(&mut self, image: &AssetRef, dest: Rect) -> Result<(), SurfaceError> {
        self.ops.push(DrawOp::DrawImage { image: image.clone(), dest });
        Ok(())
    }

    fn retain_images(&mut self, live: &HashSet<AssetRef>) {
        self.images.retain(|image, _| live.contains(image));
    }
}
