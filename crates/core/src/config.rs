use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Height of one depth row, in pixels.
pub const NODE_HEIGHT: f64 = 20.0;
/// Nodes narrower than this are folded into merged rectangles.
pub const MIN_PIXEL_DISPLAYED: f64 = 3.0;
pub const LABEL_PADDING_PX: f64 = 5.0;
pub const LABEL_MIN_WIDTH_FOR_TEXT_PX: f64 = 5.0;
/// Average advance of one label character at `FONT_SIZE`.
pub const LABEL_CHAR_WIDTH_PX: f64 = 7.0;
pub const FONT_SIZE: f64 = 12.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Geometry and typography shared by layout and the canvas renderer.
///
/// Every field is optional in the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlamegraphConfig {
    pub node_height: f64,
    pub min_pixel_displayed: f64,
    pub label_padding: f64,
    pub label_min_width: f64,
    pub label_char_width: f64,
    pub font_size: f64,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            node_height: NODE_HEIGHT,
            min_pixel_displayed: MIN_PIXEL_DISPLAYED,
            label_padding: LABEL_PADDING_PX,
            label_min_width: LABEL_MIN_WIDTH_FOR_TEXT_PX,
            label_char_width: LABEL_CHAR_WIDTH_PX,
            font_size: FONT_SIZE,
        }
    }
}

impl FlamegraphConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("node_height", self.node_height),
            ("min_pixel_displayed", self.min_pixel_displayed),
            ("label_char_width", self.label_char_width),
            ("font_size", self.font_size),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}
