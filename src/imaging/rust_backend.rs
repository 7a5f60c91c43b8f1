//! Pure Rust export backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Crop | `image::DynamicImage::crop_imm` (one-to-one copy) |
//! | Logo resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Text | `font8x8` glyphs, nearest-neighbour upscale, shrunk into the layer box ([`compose`](super::compose)) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → others | `DynamicImage::write_to` |
//!
//! Output surfaces are checked against a pixel budget before anything is
//! allocated; a zero-sized or oversized surface is an [`ExportError::Canvas`].

use super::backend::{ExportBackend, ExportError};
use super::calculations::{check_canvas, glyph_scale, text_metrics};
use super::compose::{composite, fit_text, render_logo, render_text};
use super::params::{CropParams, LayerContent, OutputFormat, Quality, WatermarkParams};
use crate::geometry::Dimensions;
use crate::types::{ExportedImage, SourceImage};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Default ceiling on output surface size (100 megapixels).
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone)]
pub struct RustBackend {
    max_canvas_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
        }
    }

    pub fn with_max_canvas_pixels(max_canvas_pixels: u64) -> Self {
        Self { max_canvas_pixels }
    }

    pub fn max_canvas_pixels(&self) -> u64 {
        self.max_canvas_pixels
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader<'a>(name: &str, bytes: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>, ExportError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ExportError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn decode_bytes(name: &str, bytes: &[u8]) -> Result<DynamicImage, ExportError> {
    reader(name, bytes)?
        .decode()
        .map_err(|e| ExportError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn decode(source: &SourceImage) -> Result<DynamicImage, ExportError> {
    if !source.is_image() {
        return Err(ExportError::UnsupportedInput {
            name: source.name().to_string(),
            mime: source.mime().to_string(),
        });
    }
    decode_bytes(source.name(), source.bytes())
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, ExportError> {
    let encode_err = |e: image::ImageError| ExportError::Encode {
        format: format.to_string(),
        reason: e.to_string(),
    };
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.value());
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
        }
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), format.image_format())
                .map_err(encode_err)?;
        }
        _ => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), format.image_format())
                .map_err(encode_err)?;
        }
    }
    Ok(buf)
}

impl ExportBackend for RustBackend {
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, ExportError> {
        let (width, height) = reader(source.name(), source.bytes())?
            .into_dimensions()
            .map_err(|e| ExportError::Decode {
                name: source.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Dimensions::new(width, height))
    }

    fn crop(&self, params: &CropParams) -> Result<ExportedImage, ExportError> {
        check_canvas(params.rect.width, params.rect.height, self.max_canvas_pixels)?;
        let img = decode(&params.source)?;
        let rect = params
            .rect
            .clamp_to(Dimensions::new(img.width(), img.height()));
        let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
        let bytes = encode(&cropped, params.format, params.quality)?;
        Ok(ExportedImage {
            file_name: params.output_name.clone(),
            source_name: params.source.name().to_string(),
            bytes,
            width: rect.width,
            height: rect.height,
            format: params.format,
        })
    }

    fn watermark(&self, params: &WatermarkParams) -> Result<ExportedImage, ExportError> {
        let img = decode(&params.source)?;
        let (width, height) = (img.width(), img.height());
        check_canvas(width, height, self.max_canvas_pixels)?;
        let natural = Dimensions::new(width, height);
        let mut canvas = img.to_rgba8();

        for layer in &params.layers {
            let placed = layer.placement.resolve_natural(natural);
            let raster = match &layer.content {
                LayerContent::Text(spec) => {
                    let font_px = spec.font_fraction * height as f64 * placed.scale;
                    let m = text_metrics(
                        spec.text.chars().count(),
                        glyph_scale(font_px),
                        spec.bold,
                        spec.underline,
                    );
                    check_canvas(m.width, m.height, self.max_canvas_pixels)?;
                    fit_text(render_text(spec, font_px), placed.width, placed.height)
                }
                LayerContent::Logo { name, bytes } => {
                    let (lw, lh) = (
                        placed.width.round().max(1.0) as u32,
                        placed.height.round().max(1.0) as u32,
                    );
                    check_canvas(lw, lh, self.max_canvas_pixels)?;
                    render_logo(&decode_bytes(name, bytes)?, lw, lh)
                }
            };
            composite(
                &mut canvas,
                &raster,
                placed.center,
                placed.rotation,
                layer.opacity,
                layer.blend,
            );
        }

        let bytes = encode(
            &DynamicImage::ImageRgba8(canvas),
            OutputFormat::Png,
            Quality::default(),
        )?;
        Ok(ExportedImage {
            file_name: params.output_name.clone(),
            source_name: params.source.name().to_string(),
            bytes,
            width,
            height,
            format: OutputFormat::Png,
        })
    }
}
