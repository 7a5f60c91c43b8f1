//! Crop workspace: an image queue, the active image's geometry and one crop
//! selection driven by pointer input.
//!
//! ```text
//! add_images ──▶ queue ──select──▶ active image
//!                                     │ image_loaded(natural, display)
//!                                     ▼
//!                      ImageMeta + Selection ◀── pointer events / set_aspect
//!                                     │ crop_job()
//!                                     ▼
//!                                  CropJob (snapshot)
//! ```
//!
//! The selection only exists once the active image has been measured. Picking
//! another image, or resizing the container, re-creates it.

use crate::geometry::{Dimensions, ImageMeta, PixelRect, Rect, Size, to_natural};
use crate::imaging::{CropJob, Quality};
use crate::interaction::{HandleMetrics, InteractionController, PointerEvent};
use crate::selection::{AspectRatio, Selection, SelectionLimits};
use crate::types::SourceImage;

#[derive(Debug, Clone)]
pub struct CropWorkspace {
    queue: Vec<SourceImage>,
    active: Option<usize>,
    meta: Option<ImageMeta>,
    selection: Option<Selection>,
    aspect: Option<AspectRatio>,
    limits: SelectionLimits,
    controller: InteractionController,
    quality: Quality,
}

impl Default for CropWorkspace {
    fn default() -> Self {
        Self::new(SelectionLimits::default(), HandleMetrics::default(), Quality::default())
    }
}

impl CropWorkspace {
    pub fn new(limits: SelectionLimits, metrics: HandleMetrics, quality: Quality) -> Self {
        Self {
            queue: Vec::new(),
            active: None,
            meta: None,
            selection: None,
            aspect: None,
            limits,
            controller: InteractionController::new(metrics),
            quality,
        }
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Queue images, skipping anything whose MIME type is not `image/*`.
    ///
    /// Returns how many were accepted. The first accepted image becomes active
    /// when nothing was active before.
    pub fn add_images(&mut self, images: impl IntoIterator<Item = SourceImage>) -> usize {
        let before = self.queue.len();
        for image in images {
            if image.is_image() {
                log::debug!("queued {}", image.name());
                self.queue.push(image);
            } else {
                log::warn!("skipping {}: not an image ({})", image.name(), image.mime());
            }
        }
        let added = self.queue.len() - before;
        if self.active.is_none() && added > 0 {
            self.activate(before);
        }
        added
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.queue
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_image(&self) -> Option<&SourceImage> {
        self.active.and_then(|i| self.queue.get(i))
    }

    /// Make `index` the active image. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.queue.len() {
            return false;
        }
        if self.active != Some(index) {
            self.activate(index);
        }
        true
    }

    /// Drop an image from the queue, keeping the active image stable where
    /// possible.
    pub fn remove(&mut self, index: usize) -> Option<SourceImage> {
        if index >= self.queue.len() {
            return None;
        }
        let removed = self.queue.remove(index);
        match self.active {
            Some(active) if active == index => {
                if self.queue.is_empty() {
                    self.deactivate();
                } else {
                    self.activate(index.min(self.queue.len() - 1));
                }
            }
            Some(active) if active > index => self.active = Some(active - 1),
            _ => {}
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.deactivate();
    }

    fn activate(&mut self, index: usize) {
        self.active = Some(index);
        self.meta = None;
        self.selection = None;
        self.controller.reset();
    }

    fn deactivate(&mut self) {
        self.active = None;
        self.meta = None;
        self.selection = None;
        self.controller.reset();
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// The active image finished loading at `natural` size and is shown at
    /// `display` size.
    pub fn image_loaded(&mut self, natural: Dimensions, display: Size) {
        if self.active.is_none() {
            return;
        }
        self.meta = Some(ImageMeta::new(natural, display));
        self.selection = Some(Selection::initialize(display, self.aspect, self.limits));
        self.controller.reset();
    }

    /// The container was re-measured; the selection is re-created for the new
    /// display size.
    pub fn container_resized(&mut self, display: Size) {
        let Some(meta) = self.meta else {
            return;
        };
        self.meta = Some(meta.with_display(display));
        self.selection = Some(Selection::initialize(display, self.aspect, self.limits));
        self.controller.reset();
    }

    /// Replace the selection with an explicit display rectangle, clamped into
    /// the container and fitted to the locked ratio.
    pub fn place_selection(&mut self, rect: Rect) -> bool {
        let Some(meta) = self.meta else {
            return false;
        };
        let mut selection = Selection::from_rect(rect, meta.display, self.limits);
        selection.set_aspect(self.aspect);
        self.selection = Some(selection);
        self.controller.reset();
        true
    }

    pub fn meta(&self) -> Option<ImageMeta> {
        self.meta
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn aspect(&self) -> Option<AspectRatio> {
        self.aspect
    }

    /// Lock the aspect ratio, resizing a live selection in place. Switching
    /// to free-form starts over from the default selection.
    pub fn set_aspect(&mut self, aspect: Option<AspectRatio>) {
        self.aspect = aspect;
        match aspect {
            Some(_) => {
                if let Some(selection) = self.selection.as_mut() {
                    selection.set_aspect(aspect);
                }
            }
            None => {
                if let Some(meta) = self.meta {
                    self.selection = Some(Selection::initialize(meta.display, None, self.limits));
                    self.controller.reset();
                }
            }
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    /// The selection mapped to the active image's natural pixels.
    pub fn natural_rect(&self) -> Option<PixelRect> {
        Some(to_natural(&self.selection.as_ref()?.rect(), self.meta.as_ref()?))
    }

    // =========================================================================
    // Pointer input
    // =========================================================================

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        match self.selection.as_ref() {
            Some(selection) => self.controller.pointer_down(selection, event),
            None => false,
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        match self.selection.as_mut() {
            Some(selection) => self.controller.pointer_move(selection, event),
            None => false,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.controller.pointer_up(event);
    }

    pub fn pointer_cancel(&mut self, event: PointerEvent) {
        self.controller.pointer_cancel(event);
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Snapshot of the current crop, or `None` until the active image has
    /// been measured.
    pub fn crop_job(&self) -> Option<CropJob> {
        Some(CropJob {
            source: self.active_image()?.clone(),
            meta: self.meta?,
            rect: self.selection.as_ref()?.rect(),
            quality: self.quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::PointerId;
    use crate::test_helpers::*;

    fn image(name: &str) -> SourceImage {
        SourceImage::new(name, "image/jpeg", Vec::new())
    }

    fn loaded() -> CropWorkspace {
        let mut ws = CropWorkspace::default();
        ws.add_images([image("a.jpg"), image("b.jpg"), image("c.jpg")]);
        ws.image_loaded(Dimensions::new(1600, 1200), Size::new(800.0, 600.0));
        ws
    }

    #[test]
    fn non_images_are_skipped() {
        let mut ws = CropWorkspace::default();
        let added = ws.add_images([
            image("a.jpg"),
            SourceImage::new("notes.txt", "text/plain", Vec::new()),
            image("b.jpg"),
        ]);
        assert_eq!(added, 2);
        assert_eq!(ws.images().len(), 2);
        assert_eq!(ws.active_index(), Some(0));
    }

    #[test]
    fn selection_waits_for_measurement() {
        let mut ws = CropWorkspace::default();
        ws.add_images([image("a.jpg")]);
        assert!(ws.selection().is_none());
        assert!(ws.crop_job().is_none());
        assert!(!ws.pointer_down(PointerEvent::new(PointerId(1), 400.0, 300.0)));
    }

    #[test]
    fn loading_initializes_centered_selection() {
        let ws = loaded();
        assert_eq!(
            ws.selection().unwrap().rect(),
            Rect::new(160.0, 120.0, 480.0, 360.0)
        );
        assert_eq!(ws.natural_rect(), Some(PixelRect::new(320, 240, 960, 720)));
    }

    #[test]
    fn set_aspect_resizes_live_selection() {
        let mut ws = loaded();
        ws.set_aspect(Some(AspectRatio::SQUARE));
        let sel = ws.selection().unwrap();
        assert_eq!(sel.rect(), Rect::new(220.0, 120.0, 360.0, 360.0));
        assert_ratio(sel, 1.0);
    }

    #[test]
    fn free_aspect_resets_to_default_selection() {
        let mut ws = loaded();
        ws.set_aspect(Some(AspectRatio::SQUARE));
        ws.place_selection(Rect::new(10.0, 10.0, 100.0, 100.0));
        assert!(ws.pointer_down(PointerEvent::new(PointerId(1), 60.0, 60.0)));

        ws.set_aspect(None);
        let sel = ws.selection().unwrap();
        assert_eq!(sel.rect(), Rect::new(160.0, 120.0, 480.0, 360.0));
        assert_eq!(sel.aspect(), None);
        assert!(ws.controller().is_idle());
    }

    #[test]
    fn aspect_survives_image_change() {
        let mut ws = loaded();
        ws.set_aspect(Some(AspectRatio::SIXTEEN_NINE));
        ws.select(1);
        assert!(ws.selection().is_none());
        ws.image_loaded(Dimensions::new(1000, 1000), Size::new(500.0, 500.0));
        assert_ratio(ws.selection().unwrap(), 16.0 / 9.0);
    }

    #[test]
    fn container_resize_recreates_selection() {
        let mut ws = loaded();
        let p = PointerId(1);
        ws.pointer_down(PointerEvent::new(p, 400.0, 300.0));
        ws.pointer_move(PointerEvent::new(p, 450.0, 300.0));
        ws.container_resized(Size::new(400.0, 300.0));

        assert!(ws.controller().is_idle());
        assert_eq!(
            ws.selection().unwrap().rect(),
            Rect::new(80.0, 60.0, 240.0, 180.0)
        );
        assert_eq!(ws.meta().unwrap().scale_x(), 4.0);
        assert_eq!(ws.natural_rect(), Some(PixelRect::new(320, 240, 960, 720)));
    }

    #[test]
    fn drag_moves_selection_within_bounds() {
        let mut ws = loaded();
        let p = PointerId(7);
        assert!(ws.pointer_down(PointerEvent::new(p, 400.0, 300.0)));
        for step in 1..=30 {
            ws.pointer_move(PointerEvent::new(p, 400.0 + step as f64 * 20.0, 300.0));
            assert_in_bounds(ws.selection().unwrap());
        }
        ws.pointer_up(PointerEvent::new(p, 1000.0, 300.0));
        assert_eq!(ws.selection().unwrap().rect().right(), 800.0);
        assert!(ws.controller().is_idle());
    }

    #[test]
    fn remove_keeps_active_image_stable() {
        let mut ws = loaded();
        ws.select(2);
        ws.remove(0);
        assert_eq!(ws.active_image().unwrap().name(), "c.jpg");

        ws.remove(1);
        assert_eq!(ws.active_image().unwrap().name(), "b.jpg");

        ws.remove(0);
        assert!(ws.active_image().is_none());
        assert!(ws.remove(0).is_none());
    }

    #[test]
    fn placed_selection_is_clamped_and_fitted() {
        let mut ws = loaded();
        ws.set_aspect(Some(AspectRatio::SQUARE));
        assert!(ws.place_selection(Rect::new(700.0, 500.0, 300.0, 200.0)));
        let sel = ws.selection().unwrap();
        assert_in_bounds(sel);
        assert_ratio(sel, 1.0);

        let mut empty = CropWorkspace::default();
        assert!(!empty.place_selection(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let mut ws = loaded();
        assert!(!ws.select(9));
        assert_eq!(ws.active_index(), Some(0));
        assert!(ws.selection().is_some());
    }

    #[test]
    fn crop_job_snapshots_current_state() {
        let mut ws = loaded();
        let job = ws.crop_job().unwrap();
        ws.set_aspect(Some(AspectRatio::SQUARE));
        ws.clear();

        assert_eq!(job.source.name(), "a.jpg");
        assert_eq!(job.natural_rect(), PixelRect::new(320, 240, 960, 720));
        assert!(ws.crop_job().is_none());
    }
}
