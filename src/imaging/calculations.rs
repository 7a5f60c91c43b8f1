//! Pure calculation functions for export geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::ExportError;
use crate::geometry::{Dimensions, Point, Rect, Size};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Where a watermark layer sits, relative to its container.
///
/// Center and size are fractions of the container (0.0–1.0), so the same
/// placement resolves to the preview in display pixels and to the export in
/// natural pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Radians, clockwise on screen.
    pub rotation: f64,
    pub scale: f64,
}

/// A [`Placement`] resolved against a concrete image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPlacement {
    pub center: Point,
    /// Box size with the placement's scale already applied.
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl Placement {
    /// Capture a selection relative to its container.
    pub fn from_selection(selection: &Selection) -> Self {
        let container = selection.container();
        let rect = selection.rect();
        let (cw, ch) = if container.is_empty() {
            (1.0, 1.0)
        } else {
            (container.width, container.height)
        };
        Self {
            center_x: rect.center().x / cw,
            center_y: rect.center().y / ch,
            width: rect.width / cw,
            height: rect.height / ch,
            rotation: selection.rotation(),
            scale: selection.scale(),
        }
    }

    /// Resolve into pixel space of an image `size` wide and high.
    pub fn resolve(&self, size: Size) -> ResolvedPlacement {
        ResolvedPlacement {
            center: Point::new(self.center_x * size.width, self.center_y * size.height),
            width: self.width * size.width * self.scale,
            height: self.height * size.height * self.scale,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    pub fn resolve_natural(&self, natural: Dimensions) -> ResolvedPlacement {
        self.resolve(Size::new(natural.width as f64, natural.height as f64))
    }
}

impl ResolvedPlacement {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.center, self.width, self.height)
    }
}

/// Integer upscale factor for the 8×8 bitmap font at a glyph height of `font_px`.
///
/// ```
/// # use image_toolkit::imaging::calculations::glyph_scale;
/// assert_eq!(glyph_scale(64.0), 8);
/// assert_eq!(glyph_scale(3.0), 1);
/// ```
pub fn glyph_scale(font_px: f64) -> u32 {
    let scale = (font_px / 8.0).round();
    if scale.is_finite() && scale >= 1.0 {
        scale.min(u16::MAX as f64) as u32
    } else {
        1
    }
}

/// Layout of a rendered line of bitmap text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    /// Horizontal advance per glyph (glyph width plus gap).
    pub advance: u32,
    /// Extra horizontal smear applied for bold.
    pub bold_offset: u32,
    /// Top row of the underline, if any.
    pub underline_y: Option<u32>,
    pub underline_thickness: u32,
}

/// Measure `chars` glyphs at `scale`: glyphs are `8·scale` square with a
/// `scale`-wide gap between them and no trailing gap.
///
/// A line too wide for `u32` saturates, so [`check_canvas`] refuses it.
pub fn text_metrics(chars: usize, scale: u32, bold: bool, underline: bool) -> TextMetrics {
    let scale = scale.clamp(1, u16::MAX as u32);
    let glyph = 8 * scale;
    let gap = scale;
    let count = chars.max(1) as u64;
    let bold_offset = if bold { (scale / 2).max(1) } else { 0 };
    let width = count
        .saturating_mul(glyph as u64)
        .saturating_add((count - 1).saturating_mul(gap as u64))
        .saturating_add(bold_offset as u64);
    let width = u32::try_from(width).unwrap_or(u32::MAX);

    let thickness = (scale / 2).max(1);
    let (height, underline_y) = if underline {
        (glyph + gap + thickness, Some(glyph + gap))
    } else {
        (glyph, None)
    };

    TextMetrics {
        width,
        height,
        advance: glyph + gap,
        bold_offset,
        underline_y,
        underline_thickness: thickness,
    }
}

/// Shrink `width × height` to fit inside `max_width × max_height`, keeping
/// its proportions. Sizes that already fit are returned unchanged.
///
/// ```
/// # use image_toolkit::imaging::calculations::fit_within;
/// assert_eq!(fit_within(200, 50, 100.0, 100.0), (100, 25));
/// assert_eq!(fit_within(40, 10, 100.0, 100.0), (40, 10));
/// ```
pub fn fit_within(width: u32, height: u32, max_width: f64, max_height: f64) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let factor = (max_width / width as f64)
        .min(max_height / height as f64)
        .min(1.0);
    if !(factor > 0.0) {
        return (1, 1);
    }
    (
        ((width as f64 * factor).floor() as u32).max(1),
        ((height as f64 * factor).floor() as u32).max(1),
    )
}

/// Refuse output surfaces that are empty or exceed the pixel budget.
pub fn check_canvas(width: u32, height: u32, max_pixels: u64) -> Result<(), ExportError> {
    let pixels = width as u64 * height as u64;
    if pixels == 0 {
        return Err(ExportError::Canvas {
            width,
            height,
            reason: "surface has no pixels".to_string(),
        });
    }
    if pixels > max_pixels {
        return Err(ExportError::Canvas {
            width,
            height,
            reason: format!("{pixels} pixels exceeds the limit of {max_pixels}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionLimits;

    // =========================================================================
    // Placement
    // =========================================================================

    #[test]
    fn placement_captures_fractions_of_container() {
        let mut sel = Selection::from_rect(
            Rect::new(100.0, 100.0, 200.0, 50.0),
            Size::new(800.0, 400.0),
            SelectionLimits::default(),
        );
        sel.rotate(0.5);
        sel.set_scale(2.0);

        let p = Placement::from_selection(&sel);
        assert_eq!(p.center_x, 0.25);
        assert_eq!(p.center_y, 0.3125);
        assert_eq!(p.width, 0.25);
        assert_eq!(p.height, 0.125);
        assert_eq!(p.rotation, 0.5);
        assert_eq!(p.scale, 2.0);
    }

    #[test]
    fn placement_resolves_at_natural_size_with_scale() {
        let p = Placement {
            center_x: 0.5,
            center_y: 0.25,
            width: 0.1,
            height: 0.2,
            rotation: 0.0,
            scale: 1.5,
        };
        let r = p.resolve_natural(Dimensions::new(2000, 1000));
        assert_eq!(r.center, Point::new(1000.0, 250.0));
        assert!((r.width - 300.0).abs() < 1e-9);
        assert!((r.height - 300.0).abs() < 1e-9);
    }

    #[test]
    fn preview_and_export_agree_proportionally() {
        let sel = Selection::from_rect(
            Rect::new(40.0, 30.0, 120.0, 60.0),
            Size::new(400.0, 300.0),
            SelectionLimits::default(),
        );
        let p = Placement::from_selection(&sel);
        let preview = p.resolve(Size::new(400.0, 300.0)).rect();
        let export = p.resolve_natural(Dimensions::new(4000, 3000)).rect();
        assert!((export.x - preview.x * 10.0).abs() < 1e-9);
        assert!((export.width - preview.width * 10.0).abs() < 1e-9);
        assert!((export.bottom() - preview.bottom() * 10.0).abs() < 1e-9);
    }

    // =========================================================================
    // Text layout
    // =========================================================================

    #[test]
    fn glyph_scale_has_floor_of_one() {
        assert_eq!(glyph_scale(0.0), 1);
        assert_eq!(glyph_scale(-5.0), 1);
        assert_eq!(glyph_scale(f64::NAN), 1);
        assert_eq!(glyph_scale(20.0), 3);
    }

    #[test]
    fn text_metrics_without_trailing_gap() {
        let m = text_metrics(3, 2, false, false);
        assert_eq!(m.width, 3 * 16 + 2 * 2);
        assert_eq!(m.height, 16);
        assert_eq!(m.advance, 18);
        assert_eq!(m.underline_y, None);
    }

    #[test]
    fn bold_and_underline_extend_the_box() {
        let m = text_metrics(1, 4, true, true);
        assert_eq!(m.bold_offset, 2);
        assert_eq!(m.width, 32 + 2);
        assert_eq!(m.underline_y, Some(36));
        assert_eq!(m.underline_thickness, 2);
        assert_eq!(m.height, 38);
    }

    #[test]
    fn huge_text_saturates_and_is_refused() {
        let m = text_metrics(50_000_000, 1_000, true, false);
        assert_eq!(m.width, u32::MAX);
        assert!(matches!(
            check_canvas(m.width, m.height, 100_000_000),
            Err(ExportError::Canvas { .. })
        ));
    }

    #[test]
    fn fit_within_keeps_proportions() {
        assert_eq!(fit_within(800, 64, 400.0, 100.0), (400, 32));
        assert_eq!(fit_within(100, 200, 1_000.0, 50.0), (25, 50));
        assert_eq!(fit_within(10, 10, 0.0, 10.0), (1, 1));
    }

    #[test]
    fn empty_text_still_measures_one_cell() {
        let m = text_metrics(0, 1, false, false);
        assert_eq!((m.width, m.height), (8, 8));
    }

    // =========================================================================
    // Canvas budget
    // =========================================================================

    #[test]
    fn canvas_check_rejects_empty_and_oversized() {
        assert!(check_canvas(100, 100, 10_000).is_ok());
        assert!(matches!(
            check_canvas(0, 100, 10_000),
            Err(ExportError::Canvas { width: 0, .. })
        ));
        assert!(matches!(
            check_canvas(101, 100, 10_000),
            Err(ExportError::Canvas { height: 100, .. })
        ));
    }
}
