//! Tool configuration
//!
//! Thresholds that shape how raw pointer input becomes measurements. Hosts
//! can build one in code or load it from JSON.

use std::time::Duration;

/// Tunables for the measuring tools
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Two clicks within this many milliseconds count as a double-click
    pub double_click_ms: u64,

    /// Eraser reach in pixels
    pub erase_radius_px: f64,

    /// Finished measurements shorter than this (real units) are dropped
    pub min_real_length: f64,

    /// Calibration points closer than this (pixels) count as coincident
    pub min_reference_px: f64,

    /// Unit offered before the user calibrates
    pub default_unit: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            double_click_ms: 300,
            erase_radius_px: 10.0,
            min_real_length: 0.1,
            min_reference_px: 1e-9,
            default_unit: "ft".to_string(),
        }
    }
}

impl ToolConfig {
    /// Sets the double-click window in milliseconds.
    pub fn with_double_click_ms(mut self, ms: u64) -> Self {
        self.double_click_ms = ms;
        self
    }

    /// Sets the eraser radius in pixels.
    pub fn with_erase_radius(mut self, px: f64) -> Self {
        self.erase_radius_px = px;
        self
    }

    /// Sets the minimum real length kept on finish.
    pub fn with_min_real_length(mut self, length: f64) -> Self {
        self.min_real_length = length;
        self
    }

    /// Sets the unit used before calibration.
    pub fn with_default_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_unit = unit.into();
        self
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    /// Parse a configuration from JSON; missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
