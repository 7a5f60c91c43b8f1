//! Shared test utilities for the image-toolkit test suite.
//!
//! Synthetic sources are generated in memory, so no fixture files are needed:
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let source = png_source("a.png", 64, 48);
//! let out = backend.crop(&params_for(source)).unwrap();
//! assert_eq!(decode_output(&out).get_pixel(0, 0), gradient_pixel(10, 5));
//! ```

use crate::geometry::Size;
use crate::selection::Selection;
use crate::types::{ExportedImage, SourceImage};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// Colour of the test gradient at `(x, y)`. Unique per pixel up to 256×256.
pub fn gradient_pixel(x: u32, y: u32) -> Rgba<u8> {
    Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
}

pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, gradient_pixel)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(gradient(width, height)), ImageFormat::Png)
}

/// PNG-encoded gradient wrapped as a queued source.
pub fn png_source(name: &str, width: u32, height: u32) -> SourceImage {
    SourceImage::new(name, "image/png", png_bytes(width, height))
}

pub fn solid_png_source(name: &str, width: u32, height: u32, color: Rgba<u8>) -> SourceImage {
    let img = RgbaImage::from_pixel(width, height, color);
    SourceImage::new(
        name,
        "image/png",
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png),
    )
}

pub fn jpeg_source(name: &str, width: u32, height: u32) -> SourceImage {
    let rgb = DynamicImage::ImageRgba8(gradient(width, height)).to_rgb8();
    SourceImage::new(
        name,
        "image/jpeg",
        encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Jpeg),
    )
}

/// A source that claims to be a PNG but cannot be decoded.
pub fn corrupt_source(name: &str) -> SourceImage {
    SourceImage::new(name, "image/png", b"\x89PNG\r\n\x1a\nnot really".to_vec())
}

pub fn decode_output(out: &ExportedImage) -> DynamicImage {
    image::load_from_memory(&out.bytes).unwrap()
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of pixels that differ from
/// `background`, inclusive. `None` when nothing was drawn.
pub fn ink_bounds(img: &RgbaImage, background: Rgba<u8>) -> Option<(u32, u32, u32, u32)> {
    img.enumerate_pixels()
        .filter(|(_, _, p)| **p != background)
        .fold(None, |acc, (x, y, _)| {
            Some(match acc {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            })
        })
}

// =========================================================================
// Selection assertions
// =========================================================================

/// Assert the selection lies inside its container (with float slack).
pub fn assert_in_bounds(selection: &Selection) {
    let r = selection.rect();
    let c: Size = selection.container();
    assert!(
        r.is_within(c, 1e-6),
        "selection {r:?} escapes container {c:?}"
    );
    assert!(r.width > 0.0 && r.height > 0.0, "degenerate selection {r:?}");
}

/// Assert `width / height` matches `ratio` within 1e-3.
pub fn assert_ratio(selection: &Selection, ratio: f64) {
    let r = selection.rect();
    let actual = r.width / r.height;
    assert!(
        (actual - ratio).abs() < 1e-3,
        "ratio {actual} != {ratio} for {r:?}"
    );
}
