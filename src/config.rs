//! Host-supplied tunables for the tabletop engine.
//!
//! Every field has a default, so the host may pass `{}` or only the keys it
//! wants to override.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FONT_FAMILY, DEFAULT_TOKEN_RADIUS, GRID_ALPHA, LABEL_FONT_PX, MAX_ZOOM, MIN_ZOOM, TEXT_FONT_PX,
    WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::error::ConfigError;
use crate::surface::TextStyle;

/// How the background map is fitted into the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapScaling {
    /// Draw the map at the world origin, sized to the canvas in world units
    /// (canvas size / zoom) for the current frame.
    #[default]
    FitView,
    /// Draw the map at the world origin in its natural pixel size.
    Natural,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom multiplier for a wheel event with negative `dy`.
    pub wheel_zoom_in: f64,
    /// Zoom multiplier for a wheel event with positive `dy`.
    pub wheel_zoom_out: f64,
    /// Radius in world units given to newly added tokens.
    pub token_radius: f64,
    pub font_family: String,
    /// Text annotation font size in screen pixels.
    pub text_font_px: f64,
    /// Token label font size in screen pixels.
    pub label_font_px: f64,
    pub grid_alpha: f64,
    pub map_scaling: MapScaling,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            wheel_zoom_in: WHEEL_ZOOM_IN,
            wheel_zoom_out: WHEEL_ZOOM_OUT,
            token_radius: DEFAULT_TOKEN_RADIUS,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            text_font_px: TEXT_FONT_PX,
            label_font_px: LABEL_FONT_PX,
            grid_alpha: GRID_ALPHA,
            map_scaling: MapScaling::default(),
        }
    }
}

impl TableConfig {
    /// Parse and validate a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is inside its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("min_zoom", self.min_zoom)?;
        positive("max_zoom", self.max_zoom)?;
        if self.min_zoom > self.max_zoom {
            return Err(invalid("max_zoom", format!("must be >= min_zoom ({})", self.min_zoom)));
        }
        if !(self.wheel_zoom_in.is_finite() && self.wheel_zoom_in > 1.0) {
            return Err(invalid("wheel_zoom_in", format!("must be > 1, got {}", self.wheel_zoom_in)));
        }
        if !(self.wheel_zoom_out > 0.0 && self.wheel_zoom_out < 1.0) {
            return Err(invalid("wheel_zoom_out", format!("must be in (0, 1), got {}", self.wheel_zoom_out)));
        }
        positive("token_radius", self.token_radius)?;
        positive("text_font_px", self.text_font_px)?;
        positive("label_font_px", self.label_font_px)?;
        if !(0.0..=1.0).contains(&self.grid_alpha) {
            return Err(invalid("grid_alpha", format!("must be in [0, 1], got {}", self.grid_alpha)));
        }
        if self.font_family.trim().is_empty() {
            return Err(invalid("font_family", "must not be empty".to_owned()));
        }
        Ok(())
    }

    /// Font for text annotations.
    #[must_use]
    pub fn text_style(&self) -> TextStyle {
        TextStyle::new(self.text_font_px, self.font_family.clone())
    }

    /// Font for token name labels.
    #[must_use]
    pub fn label_style(&self) -> TextStyle {
        TextStyle::new(self.label_font_px, self.font_family.clone())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a positive number, got {value}")))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
