//! Raster work for watermark layers: bitmap text, logo resizing and the
//! rotated, blended blit onto the base image.
//!
//! ## Text
//!
//! Glyphs come from the 8×8 `font8x8` tables and are upscaled by an integer
//! factor with nearest-neighbour sampling, so the output stays crisp at any
//! size. Bold smears each lit pixel to the right; underline adds a bar below
//! the baseline. A rendered line wider or taller than its layer box is shrunk
//! to fit ([`fit_text`]), so the ink never leaves the box.
//!
//! ## Compositing
//!
//! [`composite`] walks every base pixel under the layer's rotated footprint,
//! maps it back into layer space (inverse rotation about the layer center)
//! and samples the nearest layer pixel. The layer colour is first combined
//! with the base through the [`BlendMode`], then mixed in by
//! `layer alpha × opacity`.

use super::calculations::{fit_within, glyph_scale, text_metrics};
use super::params::{BlendMode, TextSpec};
use crate::geometry::{Point, Rect, rotated_bounds};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

fn glyph_for(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn fill(img: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(width).min(img.width());
    let y_end = y.saturating_add(height).min(img.height());
    for yy in y..y_end {
        for xx in x..x_end {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// Render one line of text with glyphs `font_px` pixels tall.
///
/// Unlit pixels are fully transparent.
pub fn render_text(spec: &TextSpec, font_px: f64) -> RgbaImage {
    let scale = glyph_scale(font_px);
    let chars: Vec<char> = spec.text.chars().collect();
    let m = text_metrics(chars.len(), scale, spec.bold, spec.underline);
    let ink = spec.color.to_rgba();

    let mut img = RgbaImage::new(m.width, m.height);
    for (i, ch) in chars.iter().enumerate() {
        let origin_x = i as u32 * m.advance;
        for (row, bits) in glyph_for(*ch).iter().enumerate() {
            for col in 0..8u32 {
                // bit 0 is the leftmost column
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                fill(
                    &mut img,
                    origin_x + col * scale,
                    row as u32 * scale,
                    scale + m.bold_offset,
                    scale,
                    ink,
                );
            }
        }
    }
    if let Some(y) = m.underline_y {
        fill(&mut img, 0, y, m.width, m.underline_thickness, ink);
    }
    img
}

/// Shrink a text raster to fit a `max_width × max_height` box, nearest
/// neighbour so glyph edges stay hard.
pub fn fit_text(raster: RgbaImage, max_width: f64, max_height: f64) -> RgbaImage {
    let (w, h) = fit_within(raster.width(), raster.height(), max_width, max_height);
    if (w, h) == raster.dimensions() {
        return raster;
    }
    image::imageops::resize(&raster, w, h, FilterType::Nearest)
}

/// Resize a decoded logo to exactly `width × height` (Lanczos3).
pub fn render_logo(logo: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    logo.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3)
        .to_rgba8()
}

/// Mix `src` over `dst` with the given effective alpha and blend mode.
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, alpha: f32, mode: BlendMode) -> Rgba<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let base = dst[c] as f32 / 255.0;
        let layer = src[c] as f32 / 255.0;
        let mixed = mode.apply(base, layer);
        out[c] = ((base + (mixed - base) * alpha) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    let base_alpha = dst[3] as f32 / 255.0;
    out[3] = ((alpha + base_alpha * (1.0 - alpha)) * 255.0)
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Draw `layer` centered on `center`, rotated by `rotation` radians.
pub fn composite(
    base: &mut RgbaImage,
    layer: &RgbaImage,
    center: Point,
    rotation: f64,
    opacity: f32,
    blend: BlendMode,
) {
    let (lw, lh) = layer.dimensions();
    let opacity = opacity.clamp(0.0, 1.0);
    if lw == 0 || lh == 0 || opacity == 0.0 {
        return;
    }

    let footprint = rotated_bounds(&Rect::from_center(center, lw as f64, lh as f64), rotation);
    let clip = |v: f64, max: u32| v.clamp(0.0, max as f64) as u32;
    let x0 = clip(footprint.x.floor(), base.width());
    let y0 = clip(footprint.y.floor(), base.height());
    let x1 = clip(footprint.right().ceil(), base.width());
    let y1 = clip(footprint.bottom().ceil(), base.height());

    let (sin, cos) = (-rotation).sin_cos();
    let (half_w, half_h) = (lw as f64 / 2.0, lh as f64 / 2.0);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - center.x;
            let dy = y as f64 + 0.5 - center.y;
            let lx = dx * cos - dy * sin + half_w;
            let ly = dx * sin + dy * cos + half_h;
            if lx < 0.0 || ly < 0.0 || lx >= lw as f64 || ly >= lh as f64 {
                continue;
            }
            let src = *layer.get_pixel(lx as u32, ly as u32);
            let alpha = src[3] as f32 / 255.0 * opacity;
            if alpha <= 0.0 {
                continue;
            }
            let dst = base.get_pixel_mut(x, y);
            *dst = blend_pixel(*dst, src, alpha, blend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Color;
    use std::f64::consts::FRAC_PI_2;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn text(s: &str, bold: bool, underline: bool) -> TextSpec {
        TextSpec {
            text: s.to_string(),
            font_fraction: 0.1,
            color: Color::WHITE,
            bold,
            underline,
        }
    }

    fn lit(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p[3] > 0).count()
    }

    // =========================================================================
    // Text
    // =========================================================================

    #[test]
    fn text_raster_matches_metrics() {
        let img = render_text(&text("AB", false, false), 16.0);
        assert_eq!(img.dimensions(), (2 * 16 + 2, 16));
        assert!(lit(&img) > 0);
        // the gap column between glyphs is empty
        assert!((0..16).all(|y| img.get_pixel(16, y)[3] == 0));
    }

    #[test]
    fn bold_lights_more_pixels() {
        let plain = render_text(&text("H", false, false), 32.0);
        let bold = render_text(&text("H", true, false), 32.0);
        assert!(lit(&bold) > lit(&plain));
    }

    #[test]
    fn underline_draws_full_width_bar() {
        let img = render_text(&text("i", false, true), 8.0);
        let y = img.height() - 1;
        assert!((0..img.width()).all(|x| img.get_pixel(x, y)[3] == 255));
    }

    #[test]
    fn unknown_glyphs_fall_back() {
        let img = render_text(&text("\u{1F600}", false, false), 8.0);
        assert_eq!(img.dimensions(), (8, 8));
        assert!(lit(&img) > 0);
    }

    // =========================================================================
    // Blending
    // =========================================================================

    #[test]
    fn blend_pixel_respects_alpha() {
        let half = blend_pixel(BLACK, Rgba([255, 255, 255, 255]), 0.5, BlendMode::Normal);
        assert_eq!(half, Rgba([128, 128, 128, 255]));

        let none = blend_pixel(BLACK, RED, 0.0, BlendMode::Normal);
        assert_eq!(none, BLACK);
    }

    #[test]
    fn multiply_on_black_stays_black() {
        let out = blend_pixel(BLACK, RED, 1.0, BlendMode::Multiply);
        assert_eq!(out, BLACK);
        let out = blend_pixel(BLACK, RED, 1.0, BlendMode::Screen);
        assert_eq!(out, RED);
    }

    #[test]
    fn transparent_base_gains_layer_alpha() {
        let out = blend_pixel(Rgba([0, 0, 0, 0]), RED, 0.5, BlendMode::Normal);
        assert_eq!(out[3], 128);
    }

    // =========================================================================
    // Compositing
    // =========================================================================

    #[test]
    fn composite_places_layer_around_center() {
        let mut base = RgbaImage::from_pixel(10, 10, BLACK);
        let layer = RgbaImage::from_pixel(2, 2, RED);
        composite(&mut base, &layer, Point::new(5.0, 5.0), 0.0, 1.0, BlendMode::Normal);

        for (x, y) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert_eq!(*base.get_pixel(x, y), RED, "({x},{y})");
        }
        assert_eq!(*base.get_pixel(3, 3), BLACK);
        assert_eq!(*base.get_pixel(6, 6), BLACK);
    }

    #[test]
    fn composite_rotates_footprint() {
        let mut base = RgbaImage::from_pixel(10, 10, BLACK);
        let layer = RgbaImage::from_pixel(4, 2, RED);
        composite(&mut base, &layer, Point::new(5.0, 5.0), FRAC_PI_2, 1.0, BlendMode::Normal);

        let painted = base.pixels().filter(|p| **p == RED).count();
        assert_eq!(painted, 8);
        assert_eq!(*base.get_pixel(4, 3), RED);
        assert_eq!(*base.get_pixel(4, 6), RED);
        assert_eq!(*base.get_pixel(3, 5), BLACK);
    }

    #[test]
    fn composite_clips_at_image_edges() {
        let mut base = RgbaImage::from_pixel(4, 4, BLACK);
        let layer = RgbaImage::from_pixel(4, 4, RED);
        composite(&mut base, &layer, Point::new(0.0, 0.0), 0.3, 1.0, BlendMode::Normal);
        assert_eq!(*base.get_pixel(0, 0), RED);
        assert_eq!(*base.get_pixel(3, 3), BLACK);
    }

    #[test]
    fn zero_opacity_is_a_no_op() {
        let mut base = RgbaImage::from_pixel(4, 4, BLACK);
        let layer = RgbaImage::from_pixel(4, 4, RED);
        composite(&mut base, &layer, Point::new(2.0, 2.0), 0.0, 0.0, BlendMode::Normal);
        assert!(base.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn wide_text_is_shrunk_into_its_box() {
        let img = render_text(&text("Explore More", false, false), 64.0);
        assert_eq!(img.dimensions(), (856, 64));

        let fitted = fit_text(img, 428.0, 74.0);
        assert_eq!(fitted.dimensions(), (428, 32));
        assert!(lit(&fitted) > 0);
    }

    #[test]
    fn text_that_fits_is_left_alone() {
        let img = render_text(&text("AB", false, false), 16.0);
        assert_eq!(fit_text(img.clone(), 100.0, 100.0), img);
    }

    #[test]
    fn logo_is_resized_to_box() {
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, RED));
        let out = render_logo(&logo, 30, 12);
        assert_eq!(out.dimensions(), (30, 12));
    }
}
