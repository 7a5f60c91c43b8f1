//! Watermark overlay: a stack of text and logo layers drawn over a preview
//! container, each with its own rotatable selection.
//!
//! Layers are kept bottom-to-top; pointer presses go to the topmost layer
//! under the pointer. Geometry lives in display pixels while editing and is
//! converted to container-relative [`Placement`]s when a job is captured, so
//! the export renders the same composition at the image's natural size.

use crate::config::WatermarkConfig;
use crate::geometry::{Point, Rect, Size};
use crate::imaging::calculations::{glyph_scale, text_metrics};
use crate::imaging::{
    BlendMode, Color, LayerContent, LayerSpec, Placement, TextSpec, WatermarkJob,
};
use crate::interaction::{HandleMetrics, Hit, InteractionController, PointerEvent};
use crate::selection::{Selection, SelectionLimits};
use crate::types::SourceImage;
use std::fmt;
use std::sync::Arc;

/// Offset of a newly added layer from the container's top-left corner.
const NEW_LAYER_OFFSET: f64 = 100.0;
/// Vertical padding between a text box and its font size.
const TEXT_PADDING: f64 = 10.0;

/// Font size a text box of `box_height` display pixels holds.
fn font_size_for(box_height: f64) -> f64 {
    (box_height - TEXT_PADDING).max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// Text styling for a layer. `font_size` is in display pixels and follows the
/// height of the layer's box once the layer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Color,
    pub bold: bool,
    pub underline: bool,
}

/// Compositing settings shared by text and logo layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    /// 0.0 to 1.0.
    pub opacity: f32,
    pub blend: BlendMode,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 0.5,
            blend: BlendMode::Overlay,
        }
    }
}

/// What a layer draws.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Text { text: String, style: TextStyle },
    Logo { name: String, bytes: Arc<[u8]> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkLayer {
    pub id: LayerId,
    pub content: OverlayContent,
    pub style: LayerStyle,
    pub selection: Selection,
}

impl WatermarkLayer {
    /// Re-derive a text layer's font size from its box.
    fn sync_font_size(&mut self) {
        if let OverlayContent::Text { style, .. } = &mut self.content {
            style.font_size = font_size_for(self.selection.rect().height);
        }
    }

    /// Export form of this layer, relative to its container. Text is sized
    /// from the box height, so resizing the box resizes the text.
    fn spec(&self) -> LayerSpec {
        let container_height = self.selection.container().height;
        let content = match &self.content {
            OverlayContent::Text { text, style } => LayerContent::Text(TextSpec {
                text: text.clone(),
                font_fraction: if container_height > 0.0 {
                    font_size_for(self.selection.rect().height) / container_height
                } else {
                    0.0
                },
                color: style.color,
                bold: style.bold,
                underline: style.underline,
            }),
            OverlayContent::Logo { name, bytes } => LayerContent::Logo {
                name: name.clone(),
                bytes: Arc::clone(bytes),
            },
        };
        LayerSpec {
            content,
            placement: Placement::from_selection(&self.selection),
            opacity: self.style.opacity.clamp(0.0, 1.0),
            blend: self.style.blend,
        }
    }
}

/// Defaults applied to layers created without explicit styling.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefaults {
    pub text: String,
    pub text_style: TextStyle,
    pub style: LayerStyle,
    pub logo_size: f64,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self::from(&WatermarkConfig::default())
    }
}

impl From<&WatermarkConfig> for LayerDefaults {
    fn from(config: &WatermarkConfig) -> Self {
        Self {
            text: config.text.clone(),
            text_style: TextStyle {
                font_size: config.font_size,
                color: config.color(),
                bold: false,
                underline: false,
            },
            style: LayerStyle {
                opacity: config.opacity_fraction(),
                blend: config.blend(),
            },
            logo_size: config.logo_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatermarkOverlay {
    container: Size,
    layers: Vec<WatermarkLayer>,
    next_id: u64,
    /// Layer owning the current gesture.
    grabbed: Option<LayerId>,
    limits: SelectionLimits,
    controller: InteractionController,
    defaults: LayerDefaults,
}

impl WatermarkOverlay {
    pub fn new(
        container: Size,
        limits: SelectionLimits,
        metrics: HandleMetrics,
        defaults: LayerDefaults,
    ) -> Self {
        Self {
            container,
            layers: Vec::new(),
            next_id: 1,
            grabbed: None,
            limits,
            controller: InteractionController::rotatable(metrics),
            defaults,
        }
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Layers, bottom to top.
    pub fn layers(&self) -> &[WatermarkLayer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&WatermarkLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut WatermarkLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn defaults(&self) -> &LayerDefaults {
        &self.defaults
    }

    fn push(&mut self, content: OverlayContent, style: LayerStyle, rect: Rect) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        let selection = Selection::from_rect(rect, self.container, self.limits);
        log::debug!("added {id} at {:?}", selection.rect());
        self.layers.push(WatermarkLayer {
            id,
            content,
            style,
            selection,
        });
        id
    }

    /// Add a text layer on top. The box is as wide as the rendered line and
    /// padded above the font size.
    pub fn add_text(
        &mut self,
        text: impl Into<String>,
        text_style: TextStyle,
        style: LayerStyle,
    ) -> LayerId {
        let text = text.into();
        let size = text_style.font_size.max(1.0);
        let metrics = text_metrics(
            text.chars().count(),
            glyph_scale(size),
            text_style.bold,
            text_style.underline,
        );
        let rect = Rect::new(
            NEW_LAYER_OFFSET,
            NEW_LAYER_OFFSET,
            metrics.width as f64,
            size + TEXT_PADDING,
        );
        let id = self.push(
            OverlayContent::Text {
                text,
                style: text_style,
            },
            style,
            rect,
        );
        // the box may have been clamped into the container
        self.edit(id, WatermarkLayer::sync_font_size);
        id
    }

    /// Add a text layer using the configured defaults.
    pub fn add_default_text(&mut self) -> LayerId {
        let LayerDefaults {
            text,
            text_style,
            style,
            ..
        } = self.defaults.clone();
        self.add_text(text, text_style, style)
    }

    /// Add a logo layer on top in a square box of the default logo size.
    pub fn add_logo(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        style: LayerStyle,
    ) -> LayerId {
        let size = self.defaults.logo_size;
        let rect = Rect::new(NEW_LAYER_OFFSET, NEW_LAYER_OFFSET, size, size);
        self.push(
            OverlayContent::Logo {
                name: name.into(),
                bytes: bytes.into(),
            },
            style,
            rect,
        )
    }

    pub fn remove(&mut self, id: LayerId) -> Option<WatermarkLayer> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        if self.grabbed == Some(id) {
            self.grabbed = None;
            self.controller.reset();
        }
        Some(self.layers.remove(index))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.grabbed = None;
        self.controller.reset();
    }

    /// Follow a preview resize; every layer keeps its relative placement.
    pub fn resize_container(&mut self, container: Size) {
        self.container = container;
        for layer in &mut self.layers {
            layer.selection.set_container(container);
            layer.sync_font_size();
        }
    }

    /// Move a layer's box to `rect`, keeping its rotation and scale.
    pub fn place_layer(&mut self, id: LayerId, rect: Rect) -> bool {
        let (container, limits) = (self.container, self.limits);
        self.edit(id, |l| {
            let mut selection = Selection::from_rect(rect, container, limits);
            selection.set_rotation(l.selection.rotation());
            selection.set_scale(l.selection.scale());
            l.selection = selection;
            l.sync_font_size();
        })
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        self.edit(id, |l| l.style.opacity = opacity.clamp(0.0, 1.0))
    }

    pub fn set_blend(&mut self, id: LayerId, blend: BlendMode) -> bool {
        self.edit(id, |l| l.style.blend = blend)
    }

    pub fn set_rotation(&mut self, id: LayerId, radians: f64) -> bool {
        self.edit(id, |l| l.selection.set_rotation(radians))
    }

    pub fn set_scale(&mut self, id: LayerId, scale: f64) -> bool {
        self.edit(id, |l| l.selection.set_scale(scale))
    }

    /// Replace a text layer's text. Logo layers are left alone.
    pub fn set_text(&mut self, id: LayerId, new_text: impl Into<String>) -> bool {
        let new_text = new_text.into();
        let mut changed = false;
        self.edit(id, |l| {
            if let OverlayContent::Text { text, .. } = &mut l.content {
                *text = new_text;
                changed = true;
            }
        });
        changed
    }

    fn edit(&mut self, id: LayerId, f: impl FnOnce(&mut WatermarkLayer)) -> bool {
        match self.layer_mut(id) {
            Some(layer) => {
                f(layer);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Pointer input
    // =========================================================================

    /// Topmost layer under `point` and what part of it was hit.
    pub fn layer_at(&self, point: Point) -> Option<(LayerId, Hit)> {
        self.layers.iter().rev().find_map(|l| {
            match self.controller.hit_test(&l.selection, point) {
                Hit::Outside => None,
                hit => Some((l.id, hit)),
            }
        })
    }

    pub fn grabbed(&self) -> Option<LayerId> {
        self.grabbed
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Start a gesture on the topmost layer under the pointer.
    pub fn pointer_down(&mut self, event: PointerEvent) -> Option<LayerId> {
        if !self.controller.is_idle() {
            return None;
        }
        let (id, _) = self.layer_at(event.position)?;
        let layer = self.layers.iter().find(|l| l.id == id)?;
        if self.controller.pointer_down(&layer.selection, event) {
            self.grabbed = Some(id);
            Some(id)
        } else {
            None
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        let Some(id) = self.grabbed else {
            return false;
        };
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => self.controller.pointer_move(&mut layer.selection, event),
            None => false,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.controller.pointer_up(event);
        self.release();
    }

    pub fn pointer_cancel(&mut self, event: PointerEvent) {
        self.controller.pointer_cancel(event);
        self.release();
    }

    fn release(&mut self) {
        if !self.controller.is_idle() {
            return;
        }
        if let Some(id) = self.grabbed.take() {
            self.edit(id, WatermarkLayer::sync_font_size);
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Relative layer specs, bottom to top.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        self.layers.iter().map(WatermarkLayer::spec).collect()
    }

    /// Snapshot of the composition for `source`.
    pub fn job(&self, source: &SourceImage) -> WatermarkJob {
        WatermarkJob {
            source: source.clone(),
            layers: self.layer_specs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{GestureKind, PointerId};
    use crate::selection::Handle;
    use crate::test_helpers::*;
    use std::f64::consts::FRAC_PI_2;

    fn overlay() -> WatermarkOverlay {
        WatermarkOverlay::new(
            Size::new(800.0, 600.0),
            SelectionLimits::default(),
            HandleMetrics::default(),
            LayerDefaults::default(),
        )
    }

    fn style() -> TextStyle {
        TextStyle {
            font_size: 40.0,
            color: Color::WHITE,
            bold: false,
            underline: false,
        }
    }

    #[test]
    fn text_layer_box_matches_rendered_line() {
        let mut ov = overlay();
        let id = ov.add_text("Hello", style(), LayerStyle::default());
        let rect = ov.layer(id).unwrap().selection.rect();
        // five 40 px glyphs with 5 px gaps between them
        assert_eq!(rect, Rect::new(100.0, 100.0, 220.0, 50.0));
    }

    #[test]
    fn resizing_text_box_resizes_font() {
        let mut ov = overlay();
        let id = ov.add_text("Hello", style(), LayerStyle::default());
        let p = PointerId(1);
        // se corner of (100, 100, 220, 50)
        assert_eq!(ov.pointer_down(PointerEvent::new(p, 320.0, 150.0)), Some(id));
        ov.pointer_move(PointerEvent::new(p, 220.0, 130.0));

        // the export follows the box before the gesture ends
        match &ov.layer_specs()[0].content {
            LayerContent::Text(t) => assert!((t.font_fraction - 20.0 / 600.0).abs() < 1e-9),
            other => panic!("expected text, got {other:?}"),
        }
        ov.pointer_up(PointerEvent::new(p, 220.0, 130.0));
        assert!(matches!(
            &ov.layer(id).unwrap().content,
            OverlayContent::Text { style, .. } if style.font_size == 20.0
        ));
    }

    #[test]
    fn placing_text_box_resizes_font() {
        let mut ov = overlay();
        let id = ov.add_text("Hello", style(), LayerStyle::default());
        ov.place_layer(id, Rect::new(0.0, 0.0, 400.0, 90.0));
        assert!(matches!(
            &ov.layer(id).unwrap().content,
            OverlayContent::Text { style, .. } if style.font_size == 80.0
        ));
    }

    #[test]
    fn default_text_uses_configured_defaults() {
        let mut ov = overlay();
        let id = ov.add_default_text();
        let layer = ov.layer(id).unwrap();
        match &layer.content {
            OverlayContent::Text { text, style } => {
                assert_eq!(text, "Explore More");
                assert_eq!(style.font_size, 64.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(layer.style.blend, BlendMode::Overlay);
        assert!((layer.style.opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn logo_layer_is_square() {
        let mut ov = overlay();
        let id = ov.add_logo("logo.png", vec![1u8, 2, 3], LayerStyle::default());
        let rect = ov.layer(id).unwrap().selection.rect();
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 200.0));
    }

    #[test]
    fn press_goes_to_topmost_layer() {
        let mut ov = overlay();
        let bottom = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let top = ov.add_logo("b.png", vec![0u8], LayerStyle::default());

        assert_eq!(ov.layer_at(Point::new(200.0, 200.0)), Some((top, Hit::Body)));
        ov.remove(top);
        assert_eq!(
            ov.layer_at(Point::new(200.0, 200.0)),
            Some((bottom, Hit::Body))
        );
        assert_eq!(ov.layer_at(Point::new(700.0, 500.0)), None);
    }

    #[test]
    fn drag_moves_only_grabbed_layer() {
        let mut ov = overlay();
        let a = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let b = ov.add_text("Hi", style(), LayerStyle::default());
        let p = PointerId(1);

        assert_eq!(ov.pointer_down(PointerEvent::new(p, 250.0, 250.0)), Some(a));
        ov.pointer_move(PointerEvent::new(p, 300.0, 280.0));
        ov.pointer_up(PointerEvent::new(p, 300.0, 280.0));

        assert_eq!(ov.layer(a).unwrap().selection.rect().x, 150.0);
        assert_eq!(ov.layer(b).unwrap().selection.rect().x, 100.0);
        assert_eq!(ov.grabbed(), None);
    }

    #[test]
    fn rotate_knob_starts_rotation() {
        let mut ov = overlay();
        let id = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let p = PointerId(3);
        // knob sits 24 px above the top edge's midpoint (200, 100)
        assert_eq!(ov.pointer_down(PointerEvent::new(p, 200.0, 76.0)), Some(id));
        assert_eq!(ov.controller().gesture().kind(), GestureKind::Rotating);

        // swing the knob to the right of the center (200, 200)
        ov.pointer_move(PointerEvent::new(p, 324.0, 200.0));
        let rotation = ov.layer(id).unwrap().selection.rotation();
        assert!((rotation - FRAC_PI_2).abs() < 1e-9, "rotation {rotation}");
        ov.pointer_cancel(PointerEvent::new(p, 324.0, 200.0));
        assert!(ov.controller().is_idle());
    }

    #[test]
    fn corner_resize_stays_in_bounds() {
        let mut ov = overlay();
        let id = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let p = PointerId(1);
        assert_eq!(ov.pointer_down(PointerEvent::new(p, 300.0, 300.0)), Some(id));
        assert_eq!(
            ov.controller().gesture().kind(),
            GestureKind::Resizing(Handle::SE)
        );
        for step in 1..=20 {
            let d = step as f64 * 40.0;
            ov.pointer_move(PointerEvent::new(p, 300.0 + d, 300.0 + d));
            assert_in_bounds(&ov.layer(id).unwrap().selection);
        }
    }

    #[test]
    fn layer_specs_are_relative() {
        let mut ov = overlay();
        let id = ov.add_text("Hello", style(), LayerStyle::default());
        ov.set_rotation(id, 0.5);
        ov.set_scale(id, 2.0);
        ov.set_blend(id, BlendMode::Multiply);
        ov.set_opacity(id, 3.0);

        let specs = ov.layer_specs();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.blend, BlendMode::Multiply);
        assert_eq!(spec.opacity, 1.0);
        assert_eq!(spec.placement.rotation, 0.5);
        assert_eq!(spec.placement.scale, 2.0);
        assert!((spec.placement.center_x - 210.0 / 800.0).abs() < 1e-9);
        assert!((spec.placement.center_y - 125.0 / 600.0).abs() < 1e-9);
        match &spec.content {
            LayerContent::Text(t) => assert!((t.font_fraction - 40.0 / 600.0).abs() < 1e-9),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn resize_keeps_relative_placement() {
        let mut ov = overlay();
        let id = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let before = ov.layer_specs()[0].placement;
        ov.resize_container(Size::new(400.0, 300.0));
        let after = ov.layer_specs()[0].placement;

        assert_eq!(ov.container(), Size::new(400.0, 300.0));
        assert!((before.center_x - after.center_x).abs() < 1e-9);
        assert!((before.center_y - after.center_y).abs() < 1e-9);
        assert_eq!(ov.layer(id).unwrap().selection.rect().width, 100.0);
    }

    #[test]
    fn place_layer_keeps_transform() {
        let mut ov = overlay();
        let id = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        ov.set_rotation(id, 1.0);
        ov.set_scale(id, 0.5);
        assert!(ov.place_layer(id, Rect::new(600.0, 400.0, 400.0, 100.0)));

        let sel = &ov.layer(id).unwrap().selection;
        assert_eq!(sel.rect(), Rect::new(400.0, 400.0, 400.0, 100.0));
        assert_eq!(sel.rotation(), 1.0);
        assert_eq!(sel.scale(), 0.5);
    }

    #[test]
    fn set_text_ignores_logos() {
        let mut ov = overlay();
        let logo = ov.add_logo("a.png", vec![0u8], LayerStyle::default());
        let text = ov.add_text("Old", style(), LayerStyle::default());
        assert!(!ov.set_text(logo, "x"));
        assert!(ov.set_text(text, "New"));
        assert!(matches!(
            &ov.layer(text).unwrap().content,
            OverlayContent::Text { text, .. } if text == "New"
        ));
    }

    #[test]
    fn job_snapshots_layers() {
        let mut ov = overlay();
        ov.add_default_text();
        let source = SourceImage::new("beach.jpg", "image/jpeg", Vec::new());
        let job = ov.job(&source);
        ov.clear();
        assert_eq!(job.layers.len(), 1);
        assert!(ov.layer_specs().is_empty());
    }
}
