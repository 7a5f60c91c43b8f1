//! # Image Toolkit
//!
//! The interactive core of a crop and watermark tool: a selection rectangle
//! driven by pointer gestures over a scaled preview, and an export renderer
//! that replays the final selection on the full-resolution image.
//!
//! # Architecture: Preview Space vs. Image Space
//!
//! Everything the user touches lives in *display* pixels (the preview as laid
//! out on screen, `f64`). Everything written to disk lives in *natural* pixels
//! (the source image, `u32`). The two meet in exactly one place:
//!
//! ```text
//! pointer events ──▶ interaction ──▶ selection (display px)
//!                                        │ workspace / overlay snapshot
//!                                        ▼
//!                          CropJob / WatermarkJob
//!                                        │ geometry::to_natural, Placement
//!                                        ▼
//!                       imaging backend (natural px) ──▶ encoded bytes
//! ```
//!
//! Rounding happens only at that boundary, so a selection can be dragged for
//! hours without accumulating error.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Display ↔ natural mapping, relative rectangles, rotation math |
//! | [`selection`] | Rectangle + rotation + scale with bounds, aspect lock, snapping and size floor |
//! | [`interaction`] | Gesture state machine and hit testing |
//! | [`workspace`] | Crop page state: image queue, active image, one crop selection |
//! | [`overlay`] | Watermark page state: stack of rotatable text/logo layers |
//! | [`imaging`] | Decode, crop, composite, encode; single and batch export |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Source and exported image buffers |
//! | [`naming`] | Output filename derivation |
//! | [`output`] | CLI output formatting for batch progress and reports |
//!
//! # Design Decisions
//!
//! ## Snapshot-Based Gestures
//!
//! A gesture records the selection as it was at pointer-down. Every move
//! recomputes the result from that snapshot and the *total* displacement
//! instead of applying per-event deltas. Clamping during a drag therefore
//! never loses ground: drag past an edge and back, and the box returns to
//! exactly where the pointer says it should be.
//!
//! ## Immutable Export Jobs
//!
//! Exports work from [`imaging::CropJob`] / [`imaging::WatermarkJob`]
//! snapshots that own a shared handle to the source bytes. The interactive
//! state can keep changing, or be cleared, while an export is running.
//!
//! ## Relative Batch Geometry
//!
//! "Apply to all" converts the reference crop into fractions of the source
//! ([`geometry::RelativeRect`]) and watermark boxes into
//! [`imaging::Placement`]s, then resolves them against each image's own
//! natural size. Images of different sizes get the same composition.
//!
//! ## Decode Failures Skip, Everything Else Stops
//!
//! In a batch, an image that cannot be decoded is reported and skipped. An
//! output surface that cannot be allocated or an encoder failure aborts the
//! batch with an error, since later images would fail the same way.

pub mod config;
pub mod geometry;
pub mod imaging;
pub mod interaction;
pub mod naming;
pub mod output;
pub mod overlay;
pub mod selection;
pub mod types;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_helpers;
