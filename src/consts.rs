//! Shared numeric constants for the tabletop crate.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom multiplier applied for one wheel notch towards the user (delta < 0).
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Zoom multiplier applied for one wheel notch away from the user (delta > 0).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

// ── Scene ───────────────────────────────────────────────────────

/// Radius in world units given to newly added tokens.
pub const DEFAULT_TOKEN_RADIUS: f64 = 30.0;

/// Name given to a token added without one.
pub const DEFAULT_TOKEN_NAME: &str = "Token";

/// Content given to a text annotation added without any.
pub const DEFAULT_TEXT_CONTENT: &str = "Text";

// ── Rendering (screen pixels, divided by zoom at draw time) ────

/// Font family for labels and annotations.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Text annotation font size.
pub const TEXT_FONT_PX: f64 = 24.0;

/// Token name label font size.
pub const LABEL_FONT_PX: f64 = 16.0;

/// Distance from the token rim down to the label baseline.
pub const LABEL_GAP_PX: f64 = 20.0;

/// Token circle outline width.
pub const TOKEN_OUTLINE_PX: f64 = 2.0;

/// Halo stroke width behind token labels.
pub const LABEL_STROKE_PX: f64 = 3.0;

/// Halo stroke width behind text annotations.
pub const TEXT_STROKE_PX: f64 = 4.0;

/// Grid line width.
pub const GRID_LINE_PX: f64 = 1.0;

/// Grid opacity.
pub const GRID_ALPHA: f64 = 0.5;

/// Selection outline width.
pub const SELECTION_LINE_PX: f64 = 3.0;

/// Selection dash pattern: dash length, gap length.
pub const SELECTION_DASH_PX: [f64; 2] = [10.0, 5.0];

/// Padding between an entity and its selection outline.
pub const SELECTION_PAD_PX: f64 = 5.0;

// ── Hex grid ────────────────────────────────────────────────────

/// Extra rows/columns added on each axis when sizing the hex cache.
pub const HEX_MARGIN_CELLS: i32 = 2;

/// Cull buffer around the visible rectangle, in multiples of the cell size.
pub const HEX_CULL_BUFFER_CELLS: f64 = 2.0;

/// Most hex cells a cache may hold. Smaller cell sizes draw no grid.
pub const MAX_HEX_CELLS: u32 = 50_000;

/// Most square grid lines (both axes together) drawn per frame.
pub const MAX_SQUARE_LINES: u32 = 10_000;

// ── Colors ──────────────────────────────────────────────────────

/// Token outline and text halo color.
pub const INK_COLOR: &str = "#000000";

/// Label and text fill color.
pub const PAPER_COLOR: &str = "#ffffff";

/// Selection outline color.
pub const SELECTION_COLOR: &str = "#ffffff";
