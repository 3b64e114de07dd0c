//! Stack-wide tuning as data.
//!
//! [`LayerStackConfig`] replaces process-wide constants: every stack receives
//! its own immutable copy, so independent stacks can coexist with different
//! tuning. With the `policy-config` feature the config can be loaded from TOML
//! or JSON; missing keys fall back to the defaults below.
//!
//! ```toml
//! standard_distance = 48.0
//! snapping_velocity_threshold = 120.0
//! ```

#[cfg(feature = "policy-config")]
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::item::{
    DEFAULT_RESIZE_PRIORITY, DEFAULT_RIGHT_MARGIN_PRIORITY, DEFAULT_SNAPPING_PRIORITY,
    LayerItem, NextItemDistance, SnappingPoint,
};

/// Distance between compressed layers when an item sets no distance.
pub const STANDARD_DISTANCE: f64 = 64.0;

/// Width of a standard layer.
pub const STANDARD_WIDTH: f64 = 400.0;

/// Minimum width of a standard expandable layer.
pub const STANDARD_MINIMUM_WIDTH: f64 = 400.0;

/// Release velocity (points per second) above which a drag snaps by direction
/// instead of by distance.
pub const SNAPPING_VELOCITY_THRESHOLD: f64 = 100.0;

/// Default tolerance for geometry comparisons.
pub const GEOMETRY_EPSILON: f64 = 1e-4;

/// Immutable tuning for one [`LayerStack`](crate::LayerStack).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStackConfig {
    /// Gap used for items whose next-item distance is unset.
    pub standard_distance: f64,
    pub standard_width: f64,
    pub standard_minimum_width: f64,
    /// Points per second.
    pub snapping_velocity_threshold: f64,
    pub default_resize_priority: i32,
    pub default_right_margin_priority: i32,
    pub default_snapping_priority: i32,
    /// Geometry comparison tolerance (fixed-point checks, operation filtering).
    pub epsilon: f64,
}

impl Default for LayerStackConfig {
    fn default() -> Self {
        Self {
            standard_distance: STANDARD_DISTANCE,
            standard_width: STANDARD_WIDTH,
            standard_minimum_width: STANDARD_MINIMUM_WIDTH,
            snapping_velocity_threshold: SNAPPING_VELOCITY_THRESHOLD,
            default_resize_priority: DEFAULT_RESIZE_PRIORITY,
            default_right_margin_priority: DEFAULT_RIGHT_MARGIN_PRIORITY,
            default_snapping_priority: DEFAULT_SNAPPING_PRIORITY,
            epsilon: GEOMETRY_EPSILON,
        }
    }
}

impl LayerStackConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("standard_distance", self.standard_distance),
            ("standard_width", self.standard_width),
            ("standard_minimum_width", self.standard_minimum_width),
            ("snapping_velocity_threshold", self.snapping_velocity_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{field} must be finite and >= 0, got {value}"));
            }
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            errors.push(format!("epsilon must be finite and > 0, got {}", self.epsilon));
        }

        errors
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Effective gap for an item's next-item distance.
    #[must_use]
    pub fn gap_for(&self, distance: NextItemDistance) -> f64 {
        distance.resolve(self.standard_distance)
    }

    /// A layer of `width` carrying this config's default priorities.
    #[must_use]
    pub fn item(&self, width: f64) -> LayerItem {
        LayerItem::new(width)
            .with_resize_priority(self.default_resize_priority)
            .with_right_margin_priority(self.default_right_margin_priority)
    }

    /// A layer of [`standard_width`](Self::standard_width).
    #[must_use]
    pub fn standard_item(&self) -> LayerItem {
        self.item(self.standard_width)
    }

    /// An expandable layer whose minimum width is
    /// [`standard_minimum_width`](Self::standard_minimum_width).
    #[must_use]
    pub fn expandable_item(&self) -> LayerItem {
        self.item(self.standard_minimum_width).with_expandable(true)
    }

    /// A snapping point at `offset` with the default snapping priority.
    #[must_use]
    pub fn snapping_point(&self, offset: f64) -> SnappingPoint {
        SnappingPoint::new(offset, self.default_snapping_priority)
    }
}

/// Errors that can occur when loading a stack configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
