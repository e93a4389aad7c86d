//! Error types.
//!
//! The core recovers from bad input by defaulting (no grid, no hit, skipped
//! asset), so the only failures that reach the host are a broken drawing
//! surface, an invalid configuration, or an unparseable scene snapshot.

/// A drawing-surface call failed.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The browser rejected a `Canvas2D` call; carries the stringified `JsValue`.
    #[error("canvas call failed: {0}")]
    Js(String),
    /// The canvas element has no 2D context.
    #[error("2d rendering context unavailable")]
    ContextUnavailable,
}

impl From<wasm_bindgen::JsValue> for SurfaceError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

/// Returned by [`crate::config::TableConfig::from_json`] and
/// [`crate::config::TableConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration JSON was malformed.
    #[error("failed to parse table config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value outside its allowed range.
    #[error("invalid table config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Returned by [`crate::scene::SceneSnapshot::from_json`] and
/// [`crate::scene::SceneSnapshot::to_json`].
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot JSON did not match the scene shape.
    #[error("invalid scene snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned when constructing a browser [`crate::engine::Engine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
