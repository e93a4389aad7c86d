//! Browser drawing surface.
//!
//! This module is the only place that touches
//! [`web_sys::CanvasRenderingContext2d`]. Images are loaded through
//! `HtmlImageElement`s kept in a per-surface cache keyed by asset
//! reference. A load in flight reports [`ImageState::Loading`]; once it
//! settles (either way) the host's callback is invoked so it can schedule a
//! redraw.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::error::SurfaceError;
use crate::scene::AssetRef;
use crate::surface::{Font, ImageState, Surface, TextAlign, TextBaseline, TextMeasure, TextMetrics};
use crate::viewport::{Point, Rect};

type SettledCallback = Rc<RefCell<Option<js_sys::Function>>>;

struct CachedImage {
    element: HtmlImageElement,
    failed: Rc<Cell<bool>>,
    // Held so the JS handlers stay alive as long as the element.
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut()>,
}

impl CachedImage {
    fn state(&self) -> ImageState {
        if self.failed.get() {
            return ImageState::Failed;
        }
        let width = self.element.natural_width();
        if self.element.complete() && width > 0 {
            ImageState::Ready { width: f64::from(width), height: f64::from(self.element.natural_height()) }
        } else {
            ImageState::Loading
        }
    }
}

/// [`Surface`] backed by a canvas 2D context.
pub struct WebSurface {
    ctx: CanvasRenderingContext2d,
    images: HashMap<AssetRef, CachedImage>,
    on_settled: SettledCallback,
}

impl WebSurface {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ContextUnavailable`] if the canvas has no 2D
    /// context, or [`SurfaceError::Js`] if the lookup itself threw.
    pub fn for_canvas(canvas: &HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or(SurfaceError::ContextUnavailable)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError::ContextUnavailable)?;
        Ok(Self { ctx, images: HashMap::new(), on_settled: Rc::new(RefCell::new(None)) })
    }

    /// Function invoked whenever an image load completes or fails.
    pub fn set_on_settled(&mut self, callback: Option<js_sys::Function>) {
        *self.on_settled.borrow_mut() = callback;
    }

    fn load(&self, asset: &AssetRef) -> Result<CachedImage, JsValue> {
        let element = HtmlImageElement::new()?;
        let failed = Rc::new(Cell::new(false));

        let settled = Rc::clone(&self.on_settled);
        let onload = Closure::<dyn FnMut()>::new(move || notify(&settled));

        let settled = Rc::clone(&self.on_settled);
        let failed_flag = Rc::clone(&failed);
        let onerror = Closure::<dyn FnMut()>::new(move || {
            failed_flag.set(true);
            notify(&settled);
        });

        element.set_onload(Some(onload.as_ref().unchecked_ref()));
        element.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        element.set_src(asset.as_str());

        Ok(CachedImage { element, failed, _onload: onload, _onerror: onerror })
    }
}

fn notify(callback: &SettledCallback) {
    if let Some(function) = callback.borrow().as_ref() {
        if let Err(err) = function.call0(&JsValue::NULL) {
            tracing::warn!(error = ?err, "asset settled callback threw");
        }
    }
}

fn align_str(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
    }
}

fn baseline_str(baseline: TextBaseline) -> &'static str {
    match baseline {
        TextBaseline::Top => "top",
        TextBaseline::Alphabetic => "alphabetic",
    }
}

impl TextMeasure for WebSurface {
    fn measure_text(&self, text: &str, font: &Font) -> TextMetrics {
        self.ctx.save();
        self.ctx.set_font(&font.css());
        let metrics = match self.ctx.measure_text(text) {
            Ok(m) => TextMetrics {
                width: m.width(),
                ascent: m.actual_bounding_box_ascent(),
                descent: m.actual_bounding_box_descent(),
            },
            Err(err) => {
                tracing::debug!(error = ?err, "measure_text failed; treating text as empty");
                TextMetrics::default()
            }
        };
        self.ctx.restore();
        metrics
    }
}

impl Surface for WebSurface {
    fn reset_transform(&mut self, dpr: f64) -> Result<(), SurfaceError> {
        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).map_err(SurfaceError::from)
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.ctx.clear_rect(0.0, 0.0, width, height);
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.ctx.translate(x, y).map_err(SurfaceError::from)
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), SurfaceError> {
        self.ctx.scale(sx, sy).map_err(SurfaceError::from)
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn set_fill_color(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), SurfaceError> {
        let dash = js_sys::Array::new();
        for &segment in segments {
            dash.push(&JsValue::from_f64(segment));
        }
        self.ctx.set_line_dash(&dash).map_err(SurfaceError::from)
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_font(&mut self, font: &Font) {
        self.ctx.set_font(&font.css());
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ctx.set_text_align(align_str(align));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ctx.set_text_baseline(baseline_str(baseline));
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, pt: Point) {
        self.ctx.move_to(pt.x, pt.y);
    }

    fn line_to(&mut self, pt: Point) {
        self.ctx.line_to(pt.x, pt.y);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64) -> Result<(), SurfaceError> {
        self.ctx.arc(center.x, center.y, radius, start, end).map_err(SurfaceError::from)
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError> {
        self.ctx.fill_text(text, at.x, at.y).map_err(SurfaceError::from)
    }

    fn stroke_text(&mut self, text: &str, at: Point) -> Result<(), SurfaceError> {
        self.ctx.stroke_text(text, at.x, at.y).map_err(SurfaceError::from)
    }

    fn image_state(&mut self, image: &AssetRef) -> ImageState {
        if let Some(cached) = self.images.get(image) {
            return cached.state();
        }
        match self.load(image) {
            Ok(cached) => {
                let state = cached.state();
                self.images.insert(image.clone(), cached);
                state
            }
            Err(err) => {
                tracing::debug!(asset = image.as_str(), error = ?err, "could not create image element");
                ImageState::Failed
            }
        }
    }

    fn draw_image(&mut self, image: &AssetRef, dest: Rect) -> Result<(), SurfaceError> {
        let Some(cached) = self.images.get(image) else {
            return Ok(());
        };
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(&cached.element, dest.x, dest.y, dest.width, dest.height)
            .map_err(SurfaceError::from)
    }

    fn retain_images(&mut self, live: &HashSet<AssetRef>) {
        let before = self.images.len();
        self.images.retain(|asset, _| live.contains(asset));
        let released = before - self.images.len();
        if released > 0 {
            tracing::debug!(released, "released unused images");
        }
    }
}
