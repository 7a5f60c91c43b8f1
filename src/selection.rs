//! Selection/transform state shared by the crop and watermark tools.
//!
//! A [`Selection`] is an axis-aligned rectangle in display space plus a
//! rotation and a scale. The rectangle always lies inside its container:
//!
//! ```text
//! 0 ≤ x,   x + width  ≤ container.width
//! 0 ≤ y,   y + height ≤ container.height
//! ```
//!
//! With an [`AspectRatio`] locked, `width / height` equals the ratio after
//! every mutation. When bounds, ratio and the minimum size floor disagree,
//! bounds win over the ratio and the ratio wins over the floor.
//!
//! ## Resize anchors
//!
//! | Handle      | Fixed point                      | Driving side (locked) |
//! |-------------|----------------------------------|-----------------------|
//! | `se`        | top-left corner                  | width                 |
//! | `nw`        | bottom-right corner              | width                 |
//! | `ne`, `sw`  | opposite corner                  | width                 |
//! | `e`, `w`    | midpoint of the opposite edge    | width                 |
//! | `n`, `s`    | midpoint of the opposite edge    | height                |
//!
//! Every operation is total: out-of-range input is clamped, never rejected.

use crate::geometry::{Point, Rect, Size};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Smallest watermark scale factor accepted by [`Selection::set_scale`].
pub const MIN_SCALE: f64 = 0.05;
/// Largest watermark scale factor accepted by [`Selection::set_scale`].
pub const MAX_SCALE: f64 = 20.0;

/// Numeric limits applied to every selection mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionLimits {
    /// Fraction of each container dimension used by [`Selection::initialize`].
    pub initial_fraction: f64,
    /// Size floor in display pixels, per dimension.
    pub min_size: f64,
    /// Distance in display pixels at which edges snap to the container.
    pub snap_threshold: f64,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            initial_fraction: 0.6,
            min_size: 20.0,
            snap_threshold: 8.0,
        }
    }
}

// =============================================================================
// Aspect ratio
// =============================================================================

/// A locked width/height ratio. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio(1.0);
    pub const FOUR_THREE: AspectRatio = AspectRatio(4.0 / 3.0);
    pub const SIXTEEN_NINE: AspectRatio = AspectRatio(16.0 / 9.0);
    pub const THREE_TWO: AspectRatio = AspectRatio(3.0 / 2.0);

    /// Named presets offered by the crop tool. `None` is freeform.
    pub const PRESETS: [(&'static str, Option<AspectRatio>); 5] = [
        ("Freeform", None),
        ("1:1", Some(Self::SQUARE)),
        ("4:3", Some(Self::FOUR_THREE)),
        ("16:9", Some(Self::SIXTEEN_NINE)),
        ("3:2", Some(Self::THREE_TWO)),
    ];

    /// A ratio from a raw value; `None` for non-finite or non-positive input.
    pub fn new(ratio: f64) -> Option<Self> {
        (ratio.is_finite() && ratio > 0.0).then_some(Self(ratio))
    }

    /// Custom `W:H` ratio. Non-positive sides are clamped to 1.
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() && v >= 1.0 { v } else { 1.0 };
        Self(clamp(width) / clamp(height))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::PRESETS
            .iter()
            .find(|(_, r)| r.is_some_and(|r| (r.0 - self.0).abs() < 1e-9))
        {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{:.4}", self.0),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid aspect ratio `{0}`: expected W:H (e.g. 16:9), a positive number, or `free`")]
pub struct ParseAspectError(pub String);

/// Parse `"16:9"`, `"16/9"`, `"1.5"` or `"free"`.
///
/// Returns `Ok(None)` for freeform.
pub fn parse_aspect(input: &str) -> Result<Option<AspectRatio>, ParseAspectError> {
    let s = input.trim();
    if s.eq_ignore_ascii_case("free") || s.eq_ignore_ascii_case("freeform") {
        return Ok(None);
    }
    let err = || ParseAspectError(input.to_string());
    if let Some((w, h)) = s.split_once([':', '/']) {
        let w: f64 = w.trim().parse().map_err(|_| err())?;
        let h: f64 = h.trim().parse().map_err(|_| err())?;
        return Ok(Some(AspectRatio::from_dimensions(w, h)));
    }
    let value: f64 = s.parse().map_err(|_| err())?;
    AspectRatio::new(value).map(Some).ok_or_else(err)
}

impl FromStr for AspectRatio {
    type Err = ParseAspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_aspect(s)?.ok_or_else(|| ParseAspectError(s.to_string()))
    }
}

// =============================================================================
// Handles
// =============================================================================

/// One of the eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Handle {
    pub const CORNERS: [Handle; 4] = [Handle::NW, Handle::NE, Handle::SE, Handle::SW];
    pub const EDGES: [Handle; 4] = [Handle::N, Handle::E, Handle::S, Handle::W];

    /// Direction each axis moves in when the handle is dragged outward:
    /// `-1` (left/up), `0` (axis unaffected) or `+1` (right/down).
    pub fn direction(self) -> (f64, f64) {
        match self {
            Handle::N => (0.0, -1.0),
            Handle::S => (0.0, 1.0),
            Handle::E => (1.0, 0.0),
            Handle::W => (-1.0, 0.0),
            Handle::NE => (1.0, -1.0),
            Handle::NW => (-1.0, -1.0),
            Handle::SE => (1.0, 1.0),
            Handle::SW => (-1.0, 1.0),
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(self, Handle::NE | Handle::NW | Handle::SE | Handle::SW)
    }

    /// With a locked ratio, `n`/`s` derive width from height; all others
    /// derive height from width.
    fn drives_height(self) -> bool {
        matches!(self, Handle::N | Handle::S)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Handle::N => "n",
            Handle::S => "s",
            Handle::E => "e",
            Handle::W => "w",
            Handle::NE => "ne",
            Handle::NW => "nw",
            Handle::SE => "se",
            Handle::SW => "sw",
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Rectangle + rotation + scale, kept inside its container.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    rect: Rect,
    rotation: f64,
    scale: f64,
    container: Size,
    aspect: Option<AspectRatio>,
    limits: SelectionLimits,
}

impl Selection {
    /// Centered selection covering `initial_fraction` of each container
    /// dimension, reduced to `aspect` when one is given.
    pub fn initialize(
        container: Size,
        aspect: Option<AspectRatio>,
        limits: SelectionLimits,
    ) -> Self {
        let container = sanitize_container(container);
        let mut width = container.width * limits.initial_fraction;
        let mut height = container.height * limits.initial_fraction;

        if let Some(aspect) = aspect.filter(|_| height > 0.0) {
            let r = aspect.value();
            if width / height > r {
                width = height * r;
            } else {
                height = width / r;
            }
        }

        let rect = Rect::new(
            (container.width - width) / 2.0,
            (container.height - height) / 2.0,
            width,
            height,
        );
        Self {
            rect,
            rotation: 0.0,
            scale: 1.0,
            container,
            aspect,
            limits,
        }
    }

    /// Selection at an explicit rectangle, clamped into the container.
    ///
    /// Used for watermark layers placed at fixed offsets and for
    /// rectangles supplied on the command line.
    pub fn from_rect(rect: Rect, container: Size, limits: SelectionLimits) -> Self {
        let container = sanitize_container(container);
        let mut selection = Self {
            rect,
            rotation: 0.0,
            scale: 1.0,
            container,
            aspect: None,
            limits,
        };
        selection.clamp_into_container();
        selection
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn aspect(&self) -> Option<AspectRatio> {
        self.aspect
    }

    pub fn limits(&self) -> SelectionLimits {
        self.limits
    }

    /// The rectangle as drawn on screen: scaled about its center.
    pub fn scaled_rect(&self) -> Rect {
        Rect::from_center(
            self.rect.center(),
            self.rect.width * self.scale,
            self.rect.height * self.scale,
        )
    }

    /// Lock (or unlock, with `None`) the aspect ratio.
    ///
    /// Locking resizes in place: the largest rectangle of the new ratio that
    /// fits inside the current one, centered on the same point, then pulled
    /// back inside the container. Unlocking leaves the rectangle untouched.
    pub fn set_aspect(&mut self, aspect: Option<AspectRatio>) {
        self.aspect = aspect;
        let Some(aspect) = aspect else {
            return;
        };
        let r = aspect.value();
        let Rect { width, height, .. } = self.rect;

        let inner_width = if height > 0.0 && width / height > r {
            height * r
        } else {
            width
        };
        let floor = self.limits.min_size.max(self.limits.min_size * r);
        let (w, h) = fit_ratio(
            inner_width.max(floor),
            r,
            self.container.width,
            self.container.height,
        );

        self.rect = Rect::from_center(self.rect.center(), w, h);
        self.clamp_origin();
    }

    /// Translate by `(dx, dy)`, clamped to the container, snapping to an edge
    /// when the result lands within the snap threshold of it.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        let max_x = (self.container.width - self.rect.width).max(0.0);
        let max_y = (self.container.height - self.rect.height).max(0.0);
        let snap = self.limits.snap_threshold;

        self.rect.x = snap_to_range((self.rect.x + dx).clamp(0.0, max_x), max_x, snap);
        self.rect.y = snap_to_range((self.rect.y + dy).clamp(0.0, max_y), max_y, snap);
    }

    /// Resize by dragging `handle` by `(dx, dy)` display pixels.
    pub fn resize(&mut self, handle: Handle, dx: f64, dy: f64) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.rect;
        let (hx, hy) = handle.direction();
        let Size {
            width: cw,
            height: ch,
        } = self.container;

        let ax = anchor_coord(x, width, hx);
        let ay = anchor_coord(y, height, hy);
        let max_w = available_extent(ax, cw, hx);
        let max_h = available_extent(ay, ch, hy);
        let min_w = self.limits.min_size.min(max_w);
        let min_h = self.limits.min_size.min(max_h);

        let raw_w = width + hx * dx;
        let raw_h = height + hy * dy;

        let (w, h) = match self.aspect {
            None => (
                clamp_nan(raw_w, min_w, max_w),
                clamp_nan(raw_h, min_h, max_h),
            ),
            Some(aspect) => {
                let r = aspect.value();
                if handle.drives_height() {
                    let floor = min_h.max(min_w / r);
                    let (h, w) = fit_ratio(raw_h.max(floor), 1.0 / r, max_h, max_w);
                    (w, h)
                } else {
                    let floor = min_w.max(min_h * r);
                    fit_ratio(raw_w.max(floor), r, max_w, max_h)
                }
            }
        };

        let mut rect = Rect::new(place(ax, w, hx), place(ay, h, hy), w, h);
        if self.aspect.is_none() {
            rect = snap_moving_edges(rect, handle, self.container, self.limits.snap_threshold);
        }
        self.rect = rect;
    }

    /// Add `delta` radians. The angle is never normalized.
    pub fn rotate(&mut self, delta: f64) {
        if delta.is_finite() {
            self.rotation += delta;
        }
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        if rotation.is_finite() {
            self.rotation = rotation;
        }
    }

    /// Set the watermark scale factor, clamped to `[MIN_SCALE, MAX_SCALE]`.
    pub fn set_scale(&mut self, scale: f64) {
        if !scale.is_nan() {
            self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    /// Follow a container resize by rescaling the rectangle proportionally.
    ///
    /// A locked selection scales both sides by the smaller factor so its
    /// ratio survives.
    pub fn set_container(&mut self, container: Size) {
        let container = sanitize_container(container);
        if self.container.is_empty() {
            *self = Self::initialize(container, self.aspect, self.limits);
            return;
        }
        let fx = container.width / self.container.width;
        let fy = container.height / self.container.height;
        let (sw, sh) = match self.aspect {
            Some(_) => (fx.min(fy), fx.min(fy)),
            None => (fx, fy),
        };
        let center = self.rect.center();
        self.rect = Rect::from_center(
            Point::new(center.x * fx, center.y * fy),
            self.rect.width * sw,
            self.rect.height * sh,
        );
        self.container = container;
        self.clamp_into_container();
    }

    fn clamp_into_container(&mut self) {
        let Size {
            width: cw,
            height: ch,
        } = self.container;
        let min_w = self.limits.min_size.min(cw);
        let min_h = self.limits.min_size.min(ch);
        self.rect.width = clamp_nan(self.rect.width, min_w, cw);
        self.rect.height = clamp_nan(self.rect.height, min_h, ch);
        if let Some(aspect) = self.aspect {
            let (w, h) = fit_ratio(self.rect.width, aspect.value(), cw, ch);
            self.rect.width = w;
            self.rect.height = h;
        }
        self.clamp_origin();
    }

    fn clamp_origin(&mut self) {
        let max_x = (self.container.width - self.rect.width).max(0.0);
        let max_y = (self.container.height - self.rect.height).max(0.0);
        self.rect.x = clamp_nan(self.rect.x, 0.0, max_x);
        self.rect.y = clamp_nan(self.rect.y, 0.0, max_y);
    }
}

fn sanitize_container(size: Size) -> Size {
    let fix = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    Size::new(fix(size.width), fix(size.height))
}

/// `f64::clamp` that maps NaN to `min` instead of propagating it.
fn clamp_nan(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Largest `(w, h)` with `w / h == ratio`, `w ≤ width`, `w ≤ max_w`, `h ≤ max_h`.
fn fit_ratio(width: f64, ratio: f64, max_w: f64, max_h: f64) -> (f64, f64) {
    let mut w = width.min(max_w);
    let mut h = w / ratio;
    if h > max_h {
        h = max_h;
        w = h * ratio;
    }
    (w, h)
}

fn snap_to_range(value: f64, max: f64, threshold: f64) -> f64 {
    let mut v = value;
    if v < threshold {
        v = 0.0;
    }
    if (max - v).abs() < threshold {
        v = max;
    }
    v
}

/// Coordinate that stays fixed while dragging a handle moving in `dir`.
fn anchor_coord(origin: f64, extent: f64, dir: f64) -> f64 {
    if dir > 0.0 {
        origin
    } else if dir < 0.0 {
        origin + extent
    } else {
        origin + extent / 2.0
    }
}

/// Room available from `anchor` in direction `dir`; symmetric for `dir == 0`.
fn available_extent(anchor: f64, limit: f64, dir: f64) -> f64 {
    let extent = if dir > 0.0 {
        limit - anchor
    } else if dir < 0.0 {
        anchor
    } else {
        2.0 * anchor.min(limit - anchor)
    };
    extent.max(0.0)
}

fn place(anchor: f64, extent: f64, dir: f64) -> f64 {
    if dir > 0.0 {
        anchor
    } else if dir < 0.0 {
        anchor - extent
    } else {
        anchor - extent / 2.0
    }
}

fn snap_moving_edges(rect: Rect, handle: Handle, container: Size, threshold: f64) -> Rect {
    let (hx, hy) = handle.direction();
    let mut r = rect;
    if hx > 0.0 && container.width - r.right() < threshold {
        r.width = container.width - r.x;
    }
    if hx < 0.0 && r.x < threshold {
        r.width += r.x;
        r.x = 0.0;
    }
    if hy > 0.0 && container.height - r.bottom() < threshold {
        r.height = container.height - r.y;
    }
    if hy < 0.0 && r.y < threshold {
        r.height += r.y;
        r.y = 0.0;
    }
    r
}
