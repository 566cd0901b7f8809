use serde::{Deserialize, Serialize};

use crate::error::RoofsError;

pub const DEFAULT_OPEN_ALPHA: f32 = 0.2;
pub const DEFAULT_CLOSED_ALPHA: f32 = 1.0;
pub const ALPHA_SLIDER_MIN: f32 = 0.0;
pub const ALPHA_SLIDER_MAX: f32 = 1.0;
pub const ALPHA_SLIDER_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoofSettings {
    pub default_open: f32,
    pub default_closed: f32,
    /// Hide non-observer tokens standing under closed roofs.
    pub auto_hide: bool,
    /// Let the GM preview the open alpha while hovering a roof.
    pub quick_peek: bool,
}

impl Default for RoofSettings {
    fn default() -> Self {
        Self {
            default_open: DEFAULT_OPEN_ALPHA,
            default_closed: DEFAULT_CLOSED_ALPHA,
            auto_hide: true,
            quick_peek: true,
        }
    }
}

impl RoofSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, RoofsError> {
        serde_json::from_str(raw).map_err(RoofsError::Settings)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoofsConfig {
    pub settings: RoofSettings,
    pub debug: bool,
}

/// Clamps a slider input into the alpha range. Non-finite input yields
/// `fallback`.
pub fn clamp_alpha(value: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(ALPHA_SLIDER_MIN, ALPHA_SLIDER_MAX)
}
