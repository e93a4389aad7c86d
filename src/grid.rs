//! Grid generation: square lines and pointy-top hexagonal cells.
//!
//! Square lines are cheap (one line per visible column/row) and are
//! recomputed from the visible rectangle every frame. Hex cells are kept in a
//! [`HexGridCache`] whose contents depend only on `(cell_size, canvas size)`;
//! pan and zoom only change which cached cells survive culling.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::{HEX_CULL_BUFFER_CELLS, HEX_MARGIN_CELLS, MAX_HEX_CELLS, MAX_SQUARE_LINES};
use crate::viewport::{Point, Rect};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Which grid to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    #[default]
    None,
    #[serde(alias = "graph")]
    Square,
    Hex,
}

/// Grid settings read from the host's control surface on every draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub kind: GridKind,
    /// Square side, or hex center-to-corner radius, in world units.
    pub cell_size: f64,
    /// CSS color string for grid lines.
    pub color: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { kind: GridKind::None, cell_size: 50.0, color: "#ffffff".to_owned() }
    }
}

impl GridConfig {
    /// The cell size to draw with, or `None` when nothing should be drawn
    /// (kind `none`, or a missing/non-positive size).
    #[must_use]
    pub fn effective_cell_size(&self) -> Option<f64> {
        if self.kind == GridKind::None || !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return None;
        }
        Some(self.cell_size)
    }

    /// [`GridConfig::effective_cell_size`], further rejecting sizes so small
    /// that the grid would exceed [`MAX_SQUARE_LINES`] or [`MAX_HEX_CELLS`]
    /// for this frame. `width`/`height` are the canvas size in CSS pixels.
    #[must_use]
    pub fn drawable_cell_size(&self, visible: Rect, width: f64, height: f64) -> Option<f64> {
        let size = self.effective_cell_size()?;
        let fits = match self.kind {
            GridKind::None => false,
            GridKind::Square => square_line_count(visible, size) <= f64::from(MAX_SQUARE_LINES),
            GridKind::Hex => hex_cell_count(size, width, height) <= f64::from(MAX_HEX_CELLS),
        };
        if !fits {
            tracing::trace!(kind = ?self.kind, cell_size = size, "grid too dense; not drawn");
        }
        fits.then_some(size)
    }
}

// =============================================================
// Square grid
// =============================================================

/// World-space line positions for a square grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareLines {
    /// X coordinates of vertical lines, ascending.
    pub vertical: Vec<f64>,
    /// Y coordinates of horizontal lines, ascending.
    pub horizontal: Vec<f64>,
    /// The rectangle the lines span.
    pub bounds: Rect,
}

/// Lines at every multiple of `cell_size` from the floor of each leading edge
/// of `visible` through its trailing edge. Empty when that would be more than
/// [`MAX_SQUARE_LINES`] lines.
#[must_use]
pub fn square_lines(visible: Rect, cell_size: f64) -> SquareLines {
    if square_line_count(visible, cell_size) > f64::from(MAX_SQUARE_LINES) {
        return SquareLines { vertical: Vec::new(), horizontal: Vec::new(), bounds: visible };
    }
    SquareLines {
        vertical: multiples_between(visible.x, visible.right(), cell_size),
        horizontal: multiples_between(visible.y, visible.bottom(), cell_size),
        bounds: visible,
    }
}

/// How many lines [`square_lines`] would produce, counted without building
/// them. Infinite for degenerate sizes.
#[must_use]
pub fn square_line_count(visible: Rect, cell_size: f64) -> f64 {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return f64::INFINITY;
    }
    let along = |start: f64, end: f64| {
        if end < start { 0.0 } else { (end / cell_size).floor() - (start / cell_size).floor() + 1.0 }
    };
    along(visible.x, visible.right()) + along(visible.y, visible.bottom())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn multiples_between(start: f64, end: f64, step: f64) -> Vec<f64> {
    if !(start.is_finite() && end.is_finite() && step.is_finite()) || step <= 0.0 || end < start {
        return Vec::new();
    }
    let first = (start / step).floor() as i64;
    let last = (end / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

// =============================================================
// Hex geometry
// =============================================================

/// Axial coordinate of a hex cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    #[must_use]
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }
}

/// World-space center of a pointy-top hex cell.
#[must_use]
pub fn hex_to_pixel(cell: Axial, size: f64) -> Point {
    let q = f64::from(cell.q);
    let r = f64::from(cell.r);
    Point {
        x: size * (SQRT_3 * q + SQRT_3 / 2.0 * r),
        y: size * (1.5 * r),
    }
}

/// Corner `i` (0..6) of the cell centered at `center`, at `60·i + 30` degrees.
#[must_use]
pub fn hex_corner(center: Point, size: f64, i: u8) -> Point {
    let angle = (60.0 * f64::from(i) + 30.0).to_radians();
    Point {
        x: center.x + size * angle.cos(),
        y: center.y + size * angle.sin(),
    }
}

/// All six corners of a cell, in drawing order.
#[must_use]
pub fn hex_corners(center: Point, size: f64) -> [Point; 6] {
    [0, 1, 2, 3, 4, 5].map(|i| hex_corner(center, size, i))
}

// =============================================================
// Hex cache
// =============================================================

/// The inputs a [`HexGridCache`] was generated from. The cache is reused as
/// long as the key is unchanged; pan and zoom are deliberately not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexCacheKey {
    cell_size: u64,
    width: u64,
    height: u64,
}

impl HexCacheKey {
    /// `width` / `height` are the canvas size in CSS pixels.
    #[must_use]
    pub fn new(cell_size: f64, width: f64, height: f64) -> Self {
        Self { cell_size: cell_size.to_bits(), width: width.to_bits(), height: height.to_bits() }
    }

    #[must_use]
    pub fn cell_size(&self) -> f64 {
        f64::from_bits(self.cell_size)
    }
}

/// Set of defined hex cells covering a padded box around the canvas.
#[derive(Debug, Clone, Default)]
pub struct HexGridCache {
    key: Option<HexCacheKey>,
    cells: BTreeSet<Axial>,
    regenerations: u64,
}

impl HexGridCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the current contents, `None` before the first generation.
    #[must_use]
    pub fn key(&self) -> Option<HexCacheKey> {
        self.key
    }

    /// Number of times the cell set has been rebuilt.
    #[must_use]
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Make the cache match `(cell_size, width, height)`, rebuilding only if
    /// the key changed. Returns `true` when a rebuild happened.
    pub fn ensure(&mut self, cell_size: f64, width: f64, height: f64) -> bool {
        let key = HexCacheKey::new(cell_size, width, height);
        if self.key == Some(key) {
            return false;
        }
        self.regenerate(cell_size, width, height);
        true
    }

    /// Drop the cached cells; the next [`HexGridCache::ensure`] rebuilds.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.cells.clear();
    }

    /// Unconditionally rebuild the cell set.
    pub fn regenerate(&mut self, cell_size: f64, width: f64, height: f64) {
        self.key = Some(HexCacheKey::new(cell_size, width, height));
        self.cells.clear();
        self.regenerations += 1;

        if !cell_size.is_finite() || cell_size <= 0.0 {
            return;
        }
        let count = hex_cell_count(cell_size, width, height);
        if count > f64::from(MAX_HEX_CELLS) {
            tracing::debug!(cell_size, width, height, count, "hex grid too dense; cache left empty");
            return;
        }

        let hex_width = SQRT_3 * cell_size;
        let hex_height = 2.0 * cell_size;
        let rows = span(height, hex_height * 0.75) + HEX_MARGIN_CELLS;
        let cols = span(width, hex_width) + HEX_MARGIN_CELLS;

        for r in -(rows / 2)..(rows + 1) / 2 {
            for q in -(cols / 2)..(cols + 1) / 2 {
                self.cells.insert(Axial::new(q, r));
            }
        }

        tracing::debug!(cell_size, width, height, cells = self.cells.len(), "hex grid cache regenerated");
    }

    #[must_use]
    pub fn contains(&self, cell: Axial) -> bool {
        self.cells.contains(&cell)
    }

    /// Cached cells in axial order.
    pub fn cells(&self) -> impl Iterator<Item = Axial> + '_ {
        self.cells.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Centers of cached cells within `visible` expanded by a buffer of
    /// two cell sizes, so partially visible edge cells are still stroked.
    #[must_use]
    pub fn visible_centers(&self, visible: Rect) -> Vec<Point> {
        let Some(key) = self.key else {
            return Vec::new();
        };
        let size = key.cell_size();
        let culled = visible.expand(size * HEX_CULL_BUFFER_CELLS);
        self.cells
            .iter()
            .map(|&cell| hex_to_pixel(cell, size))
            .filter(|center| culled.contains(*center))
            .collect()
    }
}

/// Cells a [`HexGridCache`] would hold for these inputs, counted without
/// building them. Infinite for degenerate sizes.
#[must_use]
pub fn hex_cell_count(cell_size: f64, width: f64, height: f64) -> f64 {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return f64::INFINITY;
    }
    let axis = |extent: f64, step: f64| {
        let cells = if extent.is_finite() && extent > 0.0 { (extent / step).ceil() } else { 0.0 };
        cells + f64::from(HEX_MARGIN_CELLS)
    };
    axis(height, 1.5 * cell_size) * axis(width, SQRT_3 * cell_size)
}

/// `ceil(extent / step)` as a cell count, zero for degenerate input.
#[allow(clippy::cast_possible_truncation)]
fn span(extent: f64, step: f64) -> i32 {
    if !extent.is_finite() || extent <= 0.0 || step <= 0.0 {
        return 0;
    }
    (extent / step).ceil().min(f64::from(i32::MAX / 4)) as i32
}
