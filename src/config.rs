//! Toolkit configuration module.
//!
//! Handles loading, validating, and merging `config.toml` files. Stock
//! defaults are the base layer; a user config file only needs the keys it
//! wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [selection]
//! initial_fraction = 0.6    # Share of each container dimension for a new selection
//! min_size = 20.0           # Size floor in display pixels
//! snap_threshold = 8.0      # Edge snapping distance in display pixels
//!
//! [interaction]
//! handle_tolerance = 10.0      # Hit radius of resize handles
//! rotate_handle_offset = 24.0  # Distance of the rotate knob above the box
//!
//! [export]
//! jpeg_quality = 92              # Lossy encoding quality (1-100)
//! max_canvas_pixels = 100000000  # Largest output surface allowed
//!
//! [watermark]
//! text = "Explore More"
//! font_size = 64.0          # Display pixels
//! opacity = 50              # Percent
//! color = "#FFFFFF"
//! blend_mode = "overlay"    # normal | multiply | screen | overlay | lighten
//! logo_size = 200.0         # Initial logo box edge, display pixels
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only change the watermark text
//! [watermark]
//! text = "© Studio North"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{BlendMode, Color, Quality};
use crate::interaction::HandleMetrics;
use crate::selection::SelectionLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Toolkit configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    pub selection: SelectionConfig,
    pub interaction: InteractionConfig,
    pub export: ExportConfig,
    pub watermark: WatermarkConfig,
}

impl ToolkitConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.selection;
        if !(s.initial_fraction > 0.0 && s.initial_fraction <= 1.0) {
            return Err(ConfigError::Validation(
                "selection.initial_fraction must be in (0, 1]".into(),
            ));
        }
        if !(s.min_size > 0.0) || !s.min_size.is_finite() {
            return Err(ConfigError::Validation(
                "selection.min_size must be positive".into(),
            ));
        }
        if !(s.snap_threshold >= 0.0) {
            return Err(ConfigError::Validation(
                "selection.snap_threshold must not be negative".into(),
            ));
        }
        let i = &self.interaction;
        if !(i.handle_tolerance > 0.0) || !(i.rotate_handle_offset >= 0.0) {
            return Err(ConfigError::Validation(
                "interaction distances must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.export.max_canvas_pixels == 0 {
            return Err(ConfigError::Validation(
                "export.max_canvas_pixels must be non-zero".into(),
            ));
        }
        let w = &self.watermark;
        if w.opacity > 100 {
            return Err(ConfigError::Validation(
                "watermark.opacity must be 0-100".into(),
            ));
        }
        if !(w.font_size > 0.0) || !(w.logo_size > 0.0) {
            return Err(ConfigError::Validation(
                "watermark.font_size and watermark.logo_size must be positive".into(),
            ));
        }
        w.color
            .parse::<Color>()
            .map_err(|e| ConfigError::Validation(format!("watermark.color: {e}")))?;
        w.blend_mode
            .parse::<BlendMode>()
            .map_err(|e| ConfigError::Validation(format!("watermark.blend_mode: {e}")))?;
        Ok(())
    }
}

/// Selection sizing and snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    pub initial_fraction: f64,
    pub min_size: f64,
    pub snap_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let limits = SelectionLimits::default();
        Self {
            initial_fraction: limits.initial_fraction,
            min_size: limits.min_size,
            snap_threshold: limits.snap_threshold,
        }
    }
}

impl SelectionConfig {
    pub fn limits(&self) -> SelectionLimits {
        SelectionLimits {
            initial_fraction: self.initial_fraction,
            min_size: self.min_size,
            snap_threshold: self.snap_threshold,
        }
    }
}

/// Pointer hit-test distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractionConfig {
    pub handle_tolerance: f64,
    pub rotate_handle_offset: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        let metrics = HandleMetrics::default();
        Self {
            handle_tolerance: metrics.handle_tolerance,
            rotate_handle_offset: metrics.rotate_handle_offset,
        }
    }
}

impl InteractionConfig {
    pub fn metrics(&self) -> HandleMetrics {
        HandleMetrics {
            handle_tolerance: self.handle_tolerance,
            rotate_handle_offset: self.rotate_handle_offset,
        }
    }
}

/// Encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub jpeg_quality: u8,
    /// Largest output surface, in pixels, before an export is refused.
    pub max_canvas_pixels: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default().value(),
            max_canvas_pixels: crate::imaging::rust_backend::DEFAULT_MAX_CANVAS_PIXELS,
        }
    }
}

impl ExportConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

/// Defaults for newly added watermark layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_size: f64,
    /// Percent, 0-100.
    pub opacity: u8,
    pub color: String,
    pub blend_mode: String,
    pub logo_size: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "Explore More".to_string(),
            font_size: 64.0,
            opacity: 50,
            color: "#FFFFFF".to_string(),
            blend_mode: "overlay".to_string(),
            logo_size: 200.0,
        }
    }
}

impl WatermarkConfig {
    /// Parsed colour; invalid values fall back to white.
    pub fn color(&self) -> Color {
        self.color.parse().unwrap_or(Color::WHITE)
    }

    pub fn blend(&self) -> BlendMode {
        self.blend_mode.parse().unwrap_or_default()
    }

    pub fn opacity_fraction(&self) -> f32 {
        f32::from(self.opacity.min(100)) / 100.0
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolkitConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolkitConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolkitConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an optional file path.
///
/// `None` yields the validated stock defaults. A missing file is an error:
/// the path was asked for explicitly.
pub fn load_config(path: Option<&Path>) -> Result<ToolkitConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Toolkit Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with `image-toolkit --config config.toml <command>`.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Selection rectangle
# ---------------------------------------------------------------------------
[selection]
# Share of each container dimension covered by a freshly created selection.
initial_fraction = 0.6

# Smallest width and height a selection can be resized to (display pixels).
min_size = 20.0

# Edges within this distance of the container edge snap onto it.
snap_threshold = 8.0

# ---------------------------------------------------------------------------
# Pointer interaction
# ---------------------------------------------------------------------------
[interaction]
# Hit radius around resize handles (display pixels).
handle_tolerance = 10.0

# Distance of the rotate knob above a watermark box (display pixels).
rotate_handle_offset = 24.0

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Quality for lossy formats (1 = worst, 100 = best).
jpeg_quality = 92

# Exports whose output surface would exceed this many pixels are refused.
max_canvas_pixels = 100000000

# ---------------------------------------------------------------------------
# Watermark layer defaults
# ---------------------------------------------------------------------------
[watermark]
text = "Explore More"

# Glyph height in display pixels.
font_size = 64.0

# Layer opacity in percent.
opacity = 50

# Text colour as #RRGGBB or #RRGGBBAA.
color = "#FFFFFF"

# normal, multiply, screen, overlay or lighten.
blend_mode = "overlay"

# Edge length of a newly added logo box (display pixels).
logo_size = 200.0
"##
}
