//! Geometry mapper: display space ↔ natural pixel space, plus the rotation
//! math used by hit testing and watermark placement.
//!
//! Two coordinate spaces exist for every image on screen:
//!
//! ```text
//! display space   CSS-like pixels of the rendered preview (f64, never rounded)
//! natural space   pixels of the decoded source image (u32, rounded once)
//! ```
//!
//! All interactive math runs in display space in floating point so handles
//! do not jitter. Rounding happens exactly once, in [`to_natural`], when a
//! rectangle crosses into natural space for export.
//!
//! Everything in this module is a pure function and testable without a
//! rendering surface.

use serde::{Deserialize, Serialize};

/// A point in display space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Size of a container or rendered image in display space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative or not a number.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle in display space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `center`.
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether the rectangle lies fully inside `[0, size.width] × [0, size.height]`,
    /// allowing `epsilon` of floating point slack.
    pub fn is_within(&self, size: Size, epsilon: f64) -> bool {
        self.x >= -epsilon
            && self.y >= -epsilon
            && self.right() <= size.width + epsilon
            && self.bottom() <= size.height + epsilon
    }
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Integer rectangle in natural (source image) pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink the rectangle so it fits inside `bounds`.
    ///
    /// The origin is pulled in to the last valid pixel first; width and height
    /// are then reduced, never below 1.
    pub fn clamp_to(self, bounds: Dimensions) -> Self {
        let max_x = bounds.width.saturating_sub(1);
        let max_y = bounds.height.saturating_sub(1);
        let x = self.x.min(max_x);
        let y = self.y.min(max_y);
        let width = self.width.clamp(1, bounds.width.saturating_sub(x).max(1));
        let height = self.height.clamp(1, bounds.height.saturating_sub(y).max(1));
        Self::new(x, y, width, height)
    }
}

/// Natural vs. displayed size of one image.
///
/// `scale_x`/`scale_y` are derived, never stored, so they cannot go stale
/// when the display size changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMeta {
    pub natural: Dimensions,
    pub display: Size,
}

impl ImageMeta {
    pub fn new(natural: Dimensions, display: Size) -> Self {
        Self { natural, display }
    }

    /// The same image rendered at a different size.
    pub fn with_display(self, display: Size) -> Self {
        Self { display, ..self }
    }

    pub fn scale_x(&self) -> f64 {
        if self.display.width > 0.0 {
            self.natural.width as f64 / self.display.width
        } else {
            1.0
        }
    }

    pub fn scale_y(&self) -> f64 {
        if self.display.height > 0.0 {
            self.natural.height as f64 / self.display.height
        } else {
            1.0
        }
    }
}

fn round_clamped(value: f64, min: u32, max: u32) -> u32 {
    let rounded = value.round();
    if rounded.is_nan() {
        return min;
    }
    rounded.clamp(min as f64, max as f64) as u32
}

/// Map a display-space rectangle into natural pixel space.
///
/// Each coordinate is scaled and rounded to the nearest pixel. Out-of-bounds
/// results are fixed by reducing width/height, not by shifting the origin.
///
/// ```
/// # use image_toolkit::geometry::*;
/// let meta = ImageMeta::new(Dimensions::new(1600, 1200), Size::new(800.0, 600.0));
/// let natural = to_natural(&Rect::new(160.0, 120.0, 480.0, 360.0), &meta);
/// assert_eq!(natural, PixelRect::new(320, 240, 960, 720));
/// ```
pub fn to_natural(rect: &Rect, meta: &ImageMeta) -> PixelRect {
    let nw = meta.natural.width.max(1);
    let nh = meta.natural.height.max(1);
    let (sx, sy) = (meta.scale_x(), meta.scale_y());

    let x = round_clamped(rect.x * sx, 0, nw - 1);
    let y = round_clamped(rect.y * sy, 0, nh - 1);
    let width = round_clamped(rect.width * sx, 1, nw - x);
    let height = round_clamped(rect.height * sy, 1, nh - y);

    PixelRect::new(x, y, width, height)
}

/// Map a natural pixel rectangle back into display space (no rounding).
pub fn to_display(rect: &PixelRect, meta: &ImageMeta) -> Rect {
    let (sx, sy) = (meta.scale_x(), meta.scale_y());
    Rect::new(
        rect.x as f64 / sx,
        rect.y as f64 / sy,
        rect.width as f64 / sx,
        rect.height as f64 / sy,
    )
}

/// A rectangle expressed as fractions of its container (0.0–1.0 on each axis).
///
/// Batch export re-derives each image's crop from the reference image's
/// relative rectangle, so images of different sizes get the same relative
/// region instead of the same absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeRect {
    pub fn from_pixels(rect: &PixelRect, natural: Dimensions) -> Self {
        let nw = natural.width.max(1) as f64;
        let nh = natural.height.max(1) as f64;
        Self {
            x: rect.x as f64 / nw,
            y: rect.y as f64 / nh,
            width: rect.width as f64 / nw,
            height: rect.height as f64 / nh,
        }
    }

    pub fn from_display(rect: &Rect, container: Size) -> Self {
        if container.is_empty() {
            return Self {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
            };
        }
        Self {
            x: rect.x / container.width,
            y: rect.y / container.height,
            width: rect.width / container.width,
            height: rect.height / container.height,
        }
    }

    /// Resolve against another image's natural size, rounded and kept in bounds.
    pub fn to_pixels(&self, natural: Dimensions) -> PixelRect {
        let nw = natural.width as f64;
        let nh = natural.height as f64;
        let rect = PixelRect::new(
            round_clamped(self.x * nw, 0, u32::MAX),
            round_clamped(self.y * nh, 0, u32::MAX),
            round_clamped(self.width * nw, 1, u32::MAX),
            round_clamped(self.height * nh, 1, u32::MAX),
        );
        rect.clamp_to(natural)
    }

    pub fn to_display(&self, container: Size) -> Rect {
        Rect::new(
            self.x * container.width,
            self.y * container.height,
            self.width * container.width,
            self.height * container.height,
        )
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Rotate `p` about `center` by `angle` radians (clockwise on screen, since
/// the y axis points down).
pub fn rotate_point(p: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Express a display-space point in the unrotated frame of `rect`.
///
/// Hit testing a rotated box reduces to hit testing its axis-aligned rect
/// against the point returned here.
pub fn to_local(p: Point, rect: &Rect, rotation: f64) -> Point {
    rotate_point(p, rect.center(), -rotation)
}

/// Rotate a displacement vector (no translation).
pub fn rotate_vector(dx: f64, dy: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (dx * cos - dy * sin, dx * sin + dy * cos)
}

/// Angle of `p` around `center`, in radians, in `(-π, π]`.
pub fn angle_about(p: Point, center: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x)
}

/// Wrap an angle difference into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Corners of `rect` rotated about its center: NW, NE, SE, SW.
pub fn rotated_corners(rect: &Rect, rotation: f64) -> [Point; 4] {
    let c = rect.center();
    [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ]
    .map(|p| rotate_point(p, c, rotation))
}

/// Axis-aligned bounding box of `rect` rotated about its center.
pub fn rotated_bounds(rect: &Rect, rotation: f64) -> Rect {
    let corners = rotated_corners(rect, rotation);
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn scenario_meta() -> ImageMeta {
        ImageMeta::new(Dimensions::new(1600, 1200), Size::new(800.0, 600.0))
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    // =========================================================================
    // to_natural / to_display
    // =========================================================================

    #[test]
    fn scale_factors_follow_display_size() {
        let meta = scenario_meta();
        assert_eq!(meta.scale_x(), 2.0);
        assert_eq!(meta.scale_y(), 2.0);

        let resized = meta.with_display(Size::new(400.0, 300.0));
        assert_eq!(resized.scale_x(), 4.0);
        assert_eq!(resized.scale_y(), 4.0);
    }

    #[test]
    fn unmeasured_display_falls_back_to_unit_scale() {
        let meta = ImageMeta::new(Dimensions::new(100, 100), Size::default());
        assert_eq!(meta.scale_x(), 1.0);
        assert_eq!(meta.scale_y(), 1.0);
    }

    #[test]
    fn maps_centered_selection_to_natural() {
        let rect = Rect::new(160.0, 120.0, 480.0, 360.0);
        assert_eq!(
            to_natural(&rect, &scenario_meta()),
            PixelRect::new(320, 240, 960, 720)
        );
    }

    #[test]
    fn overflow_reduces_size_not_origin() {
        // 700+200 = 900 display px → 1800 natural, only 1600 available
        let rect = Rect::new(700.0, 500.0, 200.0, 200.0);
        let natural = to_natural(&rect, &scenario_meta());
        assert_eq!(natural.x, 1400);
        assert_eq!(natural.y, 1000);
        assert_eq!(natural.width, 200);
        assert_eq!(natural.height, 200);
    }

    #[test]
    fn negative_origin_clamps_to_zero() {
        let rect = Rect::new(-10.0, -5.0, 50.0, 50.0);
        let natural = to_natural(&rect, &scenario_meta());
        assert_eq!((natural.x, natural.y), (0, 0));
        assert_eq!((natural.width, natural.height), (100, 100));
    }

    #[test]
    fn degenerate_rect_keeps_one_pixel() {
        let rect = Rect::new(10.0, 10.0, 0.0, 0.0);
        let natural = to_natural(&rect, &scenario_meta());
        assert_eq!((natural.width, natural.height), (1, 1));
    }

    #[test]
    fn round_trip_is_within_one_pixel() {
        let metas = [
            scenario_meta(),
            ImageMeta::new(Dimensions::new(4032, 3024), Size::new(731.0, 548.25)),
            ImageMeta::new(Dimensions::new(333, 999), Size::new(200.0, 600.0)),
        ];
        for meta in metas {
            let (nw, nh) = (meta.natural.width, meta.natural.height);
            for step in 0..20u32 {
                let x = step * nw / 40;
                let y = step * nh / 40;
                let rect = PixelRect::new(x, y, (nw - x) / 2 + 1, (nh - y) / 3 + 1);
                let back = to_natural(&to_display(&rect, &meta), &meta);
                assert!(back.x.abs_diff(rect.x) <= 1, "{rect:?} → {back:?}");
                assert!(back.y.abs_diff(rect.y) <= 1, "{rect:?} → {back:?}");
                assert!(back.width.abs_diff(rect.width) <= 1, "{rect:?} → {back:?}");
                assert!(back.height.abs_diff(rect.height) <= 1, "{rect:?} → {back:?}");
            }
        }
    }

    // =========================================================================
    // PixelRect / RelativeRect
    // =========================================================================

    #[test]
    fn pixel_rect_clamp_pulls_origin_then_shrinks() {
        let clamped = PixelRect::new(150, 90, 100, 100).clamp_to(Dimensions::new(100, 80));
        assert_eq!(clamped, PixelRect::new(99, 79, 1, 1));

        let inside = PixelRect::new(10, 10, 20, 20).clamp_to(Dimensions::new(100, 80));
        assert_eq!(inside, PixelRect::new(10, 10, 20, 20));
    }

    #[test]
    fn relative_rect_reapplies_proportionally() {
        let reference = PixelRect::new(320, 240, 960, 720);
        let rel = RelativeRect::from_pixels(&reference, Dimensions::new(1600, 1200));
        assert_close(rel.x, 0.2);
        assert_close(rel.width, 0.6);

        let other = rel.to_pixels(Dimensions::new(800, 400));
        assert_eq!(other, PixelRect::new(160, 80, 480, 240));
    }

    #[test]
    fn relative_rect_never_collapses_below_one_pixel() {
        let rel = RelativeRect {
            x: 0.5,
            y: 0.5,
            width: 0.0001,
            height: 0.0001,
        };
        let px = rel.to_pixels(Dimensions::new(10, 10));
        assert_eq!((px.width, px.height), (1, 1));
    }

    #[test]
    fn relative_rect_from_display_round_trips() {
        let container = Size::new(800.0, 600.0);
        let rect = Rect::new(100.0, 150.0, 200.0, 300.0);
        let rel = RelativeRect::from_display(&rect, container);
        assert_eq!(rel.to_display(container), rect);
    }

    // =========================================================================
    // Rotation helpers
    // =========================================================================

    #[test]
    fn quarter_turn_rotates_clockwise_on_screen() {
        let p = rotate_point(Point::new(10.0, 0.0), Point::default(), FRAC_PI_2);
        assert_close(p.x, 0.0);
        assert_close(p.y, 10.0);
    }

    #[test]
    fn to_local_undoes_rotation() {
        let rect = Rect::new(100.0, 100.0, 200.0, 100.0);
        let corner = rotated_corners(&rect, 0.7)[2];
        let local = to_local(corner, &rect, 0.7);
        assert_close(local.x, rect.right());
        assert_close(local.y, rect.bottom());
    }

    #[test]
    fn rotated_bounds_swap_sides_at_ninety_degrees() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let bounds = rotated_bounds(&rect, FRAC_PI_2);
        assert_close(bounds.width, 100.0);
        assert_close(bounds.height, 200.0);
        assert_close(bounds.center().x, 100.0);
        assert_close(bounds.center().y, 50.0);
    }

    #[test]
    fn angle_about_uses_screen_axes() {
        let c = Point::new(50.0, 50.0);
        assert_close(angle_about(Point::new(60.0, 50.0), c), 0.0);
        assert_close(angle_about(Point::new(50.0, 60.0), c), FRAC_PI_2);
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        assert_close(wrap_angle(3.0 * PI), PI);
        assert_close(wrap_angle(-PI), PI);
        assert_close(wrap_angle(0.5), 0.5);
        assert_close(wrap_angle(-2.0 * PI + 0.25), 0.25);
    }
}
