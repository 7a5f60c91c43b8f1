//! Pointer interaction controller.
//!
//! Pointer events arrive as plain values; the controller turns them into
//! selection mutations. The gesture state is an explicit value:
//!
//! ```text
//!            down on body          move: snapshot.move_by(total Δ)
//!   Idle ───────────────────▶ Dragging ──────────────┐
//!    ▲  ───────────────────▶ Resizing(handle) ───────┤ up / cancel
//!    │      down on handle                           │
//!    │  ───────────────────▶ Rotating ───────────────┤
//!    │   down on rotate knob                         │
//!    └───────────────────────────────────────────────┘
//! ```
//!
//! Every move recomputes the whole selection from the snapshot taken at
//! gesture start and the *total* displacement, so rounding never drifts over
//! a long drag and clamping is applied once per move.
//!
//! Only one gesture is active at a time: the first pointer wins, and events
//! from any other pointer are ignored until it is released.

use crate::geometry::{Point, angle_about, rotate_point, rotate_vector, to_local, wrap_angle};
use crate::selection::{Handle, Selection};

/// Hit-test tolerances in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleMetrics {
    /// Distance from a corner/edge at which its handle is grabbed.
    pub handle_tolerance: f64,
    /// Distance of the rotate knob above the top edge's midpoint.
    pub rotate_handle_offset: f64,
}

impl Default for HandleMetrics {
    fn default() -> Self {
        Self {
            handle_tolerance: 10.0,
            rotate_handle_offset: 24.0,
        }
    }
}

/// Identifies one pointer (mouse, pen or a single touch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(pointer: PointerId, x: f64, y: f64) -> Self {
        Self {
            pointer,
            position: Point::new(x, y),
        }
    }
}

/// What a pointer-down would grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Handle(Handle),
    Rotate,
    Body,
    Outside,
}

/// Hit test `point` against `selection` in its local (unrotated, scaled) frame.
///
/// Precedence: corners, then edges and the rotate knob, then the body.
/// The rotate knob only exists when `rotatable` is set.
pub fn hit_test(selection: &Selection, point: Point, metrics: &HandleMetrics, rotatable: bool) -> Hit {
    let rect = selection.scaled_rect();
    let local = to_local(point, &rect, selection.rotation());
    let tol = metrics.handle_tolerance;
    let near = |a: f64, b: f64| (a - b).abs() <= tol;

    let corners = [
        (Handle::NW, rect.x, rect.y),
        (Handle::NE, rect.right(), rect.y),
        (Handle::SE, rect.right(), rect.bottom()),
        (Handle::SW, rect.x, rect.bottom()),
    ];
    if let Some((handle, _, _)) = corners
        .iter()
        .find(|(_, cx, cy)| near(local.x, *cx) && near(local.y, *cy))
    {
        return Hit::Handle(*handle);
    }

    if rotatable {
        let knob = Point::new(rect.center().x, rect.y - metrics.rotate_handle_offset);
        if local.distance(knob) <= tol {
            return Hit::Rotate;
        }
    }

    let in_span_x = local.x >= rect.x && local.x <= rect.right();
    let in_span_y = local.y >= rect.y && local.y <= rect.bottom();
    if in_span_x && near(local.y, rect.y) {
        return Hit::Handle(Handle::N);
    }
    if in_span_x && near(local.y, rect.bottom()) {
        return Hit::Handle(Handle::S);
    }
    if in_span_y && near(local.x, rect.x) {
        return Hit::Handle(Handle::W);
    }
    if in_span_y && near(local.x, rect.right()) {
        return Hit::Handle(Handle::E);
    }

    if rect.contains(local) {
        Hit::Body
    } else {
        Hit::Outside
    }
}

/// The gesture state machine.
///
/// Each active variant carries the pointer that owns it, where it started,
/// and the selection as it was at that moment.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        pointer: PointerId,
        origin: Point,
        snapshot: Selection,
    },
    Resizing {
        pointer: PointerId,
        handle: Handle,
        origin: Point,
        snapshot: Selection,
    },
    Rotating {
        pointer: PointerId,
        origin: Point,
        snapshot: Selection,
    },
}

/// Payload-free view of [`Gesture`], handy for assertions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Idle,
    Dragging,
    Resizing(Handle),
    Rotating,
}

impl Gesture {
    /// Start the gesture that `hit` calls for. `Outside` stays idle.
    pub fn begin(hit: Hit, event: PointerEvent, selection: &Selection) -> Self {
        let pointer = event.pointer;
        let origin = event.position;
        let snapshot = selection.clone();
        match hit {
            Hit::Body => Gesture::Dragging {
                pointer,
                origin,
                snapshot,
            },
            Hit::Handle(handle) => Gesture::Resizing {
                pointer,
                handle,
                origin,
                snapshot,
            },
            Hit::Rotate => Gesture::Rotating {
                pointer,
                origin,
                snapshot,
            },
            Hit::Outside => Gesture::Idle,
        }
    }

    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Dragging { .. } => GestureKind::Dragging,
            Gesture::Resizing { handle, .. } => GestureKind::Resizing(*handle),
            Gesture::Rotating { .. } => GestureKind::Rotating,
        }
    }

    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            Gesture::Idle => None,
            Gesture::Dragging { pointer, .. }
            | Gesture::Resizing { pointer, .. }
            | Gesture::Rotating { pointer, .. } => Some(*pointer),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    /// The selection this gesture produces for `event`, or `None` when idle
    /// or when the event belongs to a different pointer.
    pub fn apply(&self, event: PointerEvent) -> Option<Selection> {
        if self.pointer() != Some(event.pointer) {
            return None;
        }
        let p = event.position;
        match self {
            Gesture::Idle => None,
            Gesture::Dragging {
                origin, snapshot, ..
            } => {
                let mut next = snapshot.clone();
                next.move_by(p.x - origin.x, p.y - origin.y);
                Some(next)
            }
            Gesture::Resizing {
                handle,
                origin,
                snapshot,
                ..
            } => {
                // Displacement is measured on screen; the handles live in the
                // selection's own rotated, scaled frame.
                let (dx, dy) = rotate_vector(p.x - origin.x, p.y - origin.y, -snapshot.rotation());
                let scale = snapshot.scale();
                let mut next = snapshot.clone();
                next.resize(*handle, dx / scale, dy / scale);
                Some(next)
            }
            Gesture::Rotating {
                origin, snapshot, ..
            } => {
                let center = snapshot.rect().center();
                let delta = wrap_angle(angle_about(p, center) - angle_about(*origin, center));
                let mut next = snapshot.clone();
                next.rotate(delta);
                Some(next)
            }
        }
    }
}

/// Owns the current [`Gesture`] and applies pointer events to a selection.
#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
    metrics: HandleMetrics,
    rotatable: bool,
}

impl InteractionController {
    /// Controller for crop selections (no rotate knob).
    pub fn new(metrics: HandleMetrics) -> Self {
        Self {
            gesture: Gesture::Idle,
            metrics,
            rotatable: false,
        }
    }

    /// Controller for watermark boxes, which expose a rotate knob.
    pub fn rotatable(metrics: HandleMetrics) -> Self {
        Self {
            rotatable: true,
            ..Self::new(metrics)
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn metrics(&self) -> &HandleMetrics {
        &self.metrics
    }

    pub fn is_idle(&self) -> bool {
        self.gesture.is_idle()
    }

    pub fn hit_test(&self, selection: &Selection, point: Point) -> Hit {
        hit_test(selection, point, &self.metrics, self.rotatable)
    }

    /// Begin a gesture. Returns `false` when the press was ignored (another
    /// gesture is active, or the press landed outside the selection).
    pub fn pointer_down(&mut self, selection: &Selection, event: PointerEvent) -> bool {
        if !self.gesture.is_idle() {
            log::debug!(
                "ignoring pointer {:?}: {:?} already active",
                event.pointer,
                self.gesture.kind()
            );
            return false;
        }
        let hit = self.hit_test(selection, event.position);
        self.transition(Gesture::begin(hit, event, selection));
        !self.gesture.is_idle()
    }

    /// Recompute `selection` for a move of the active pointer.
    /// Returns `true` when the selection was replaced.
    pub fn pointer_move(&self, selection: &mut Selection, event: PointerEvent) -> bool {
        match self.gesture.apply(event) {
            Some(next) => {
                *selection = next;
                true
            }
            None => false,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.release(event);
    }

    /// Capture loss. Identical to a release: the last applied state stays.
    pub fn pointer_cancel(&mut self, event: PointerEvent) {
        self.release(event);
    }

    /// Drop any active gesture, e.g. when the active image changes.
    pub fn reset(&mut self) {
        self.transition(Gesture::Idle);
    }

    fn release(&mut self, event: PointerEvent) {
        if self.gesture.pointer() == Some(event.pointer) {
            self.transition(Gesture::Idle);
        }
    }

    fn transition(&mut self, next: Gesture) {
        let (from, to) = (self.gesture.kind(), next.kind());
        if from != to {
            log::debug!("gesture {from:?} -> {to:?}");
        }
        self.gesture = next;
    }
}

/// Where the rotate knob is drawn on screen.
pub fn rotate_knob(selection: &Selection, metrics: &HandleMetrics) -> Point {
    let rect = selection.scaled_rect();
    let knob = Point::new(rect.center().x, rect.y - metrics.rotate_handle_offset);
    rotate_point(knob, rect.center(), selection.rotation())
}
