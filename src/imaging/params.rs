//! Parameter types for export operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module (which turns
//! a job snapshot into concrete pixel rectangles and placements) and the
//! [`backend`](super::backend) (which decodes, composites and encodes). A mock
//! backend can stand in for the real one without touching operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 92). Clamped on construction.
//! - [`OutputFormat`]: encodable formats, derived from the source filename.
//! - [`Color`]: RGBA colour parsed from `#RRGGBB` / `#RRGGBBAA`.
//! - [`BlendMode`]: how a watermark layer combines with the pixels below it.
//! - [`LayerSpec`]: one watermark layer, fully relative to its container.
//! - [`CropParams`] / [`WatermarkParams`]: full specification of one export.

use super::calculations::Placement;
use crate::geometry::PixelRect;
use crate::types::SourceImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Formats the renderer can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
    Tiff,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// Encodable format matching a filename's extension, if any.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match image::ImageFormat::from_path(name).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    /// Output format for a crop of `name`: the source's own format when it
    /// can be encoded, PNG otherwise.
    pub fn for_source(name: &str) -> Self {
        Self::from_file_name(name).unwrap_or(Self::Png)
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::WebP => image::ImageFormat::WebP,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Gif => image::ImageFormat::Gif,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    pub fn mime(self) -> &'static str {
        self.image_format().to_mime_type()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid colour `{0}`: expected #RRGGBB or #RRGGBBAA")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(input.to_string());
        let hex = input.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Color {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if hex.len() == 8 { byte(6)? } else { 255 },
        })
    }
}

/// How a layer's colour combines with the base pixel before alpha blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Lighten,
}

impl BlendMode {
    pub const ALL: [BlendMode; 5] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Lighten,
    ];

    /// Blend one channel. Inputs and output are in `0.0..=1.0`.
    pub fn apply(self, base: f32, layer: f32) -> f32 {
        match self {
            BlendMode::Normal => layer,
            BlendMode::Multiply => base * layer,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - layer),
            BlendMode::Overlay => {
                if base < 0.5 {
                    2.0 * base * layer
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - layer)
                }
            }
            BlendMode::Lighten => base.max(layer),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Lighten => "lighten",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown blend mode `{0}` (expected normal, multiply, screen, overlay or lighten)")]
pub struct ParseBlendModeError(pub String);

impl FromStr for BlendMode {
    type Err = ParseBlendModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ParseBlendModeError(s.to_string()))
    }
}

/// Text watermark content. The font size is relative so the same layer
/// renders proportionally on images of any size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    /// Glyph height as a fraction of the container height.
    pub font_fraction: f64,
    pub color: Color,
    pub bold: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Text(TextSpec),
    /// Encoded logo image, resized into the layer box at render time.
    Logo { name: String, bytes: Arc<[u8]> },
}

/// One watermark layer, independent of any particular image size.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub content: LayerContent,
    pub placement: Placement,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Parameters for a crop export.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: SourceImage,
    /// Region to copy, in the source's natural pixels.
    pub rect: PixelRect,
    pub output_name: String,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a watermark export. Output is always PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub source: SourceImage,
    pub layers: Vec<LayerSpec>,
    pub output_name: String,
}
