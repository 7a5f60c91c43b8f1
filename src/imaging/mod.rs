//! Image processing: pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Crop** | `DynamicImage::crop_imm`, re-encoded in the source format |
//! | **Text layer** | `font8x8` bitmap glyphs, nearest-neighbour upscale |
//! | **Logo layer** | `resize_exact` with Lanczos3 |
//! | **Watermark** | rotated blit with blend modes, encoded as PNG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement and text math (unit testable)
//! - **Parameters**: Data structures describing export operations
//! - **Compose**: Raster helpers for text, logos and blending
//! - **Backend**: [`ExportBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining jobs + backend, including batches

pub mod backend;
pub mod calculations;
pub mod compose;
pub mod operations;
pub mod params;
pub mod rust_backend;

pub use crate::geometry::Dimensions;
pub use backend::{ExportBackend, ExportError};
pub use calculations::Placement;
pub use operations::{
    BatchEvent, BatchFailure, BatchReport, CropJob, ReportSummary, WatermarkJob,
    apply_crop_to_all, apply_watermark_to_all, export_crop, export_watermark, write_outputs,
};
pub use params::{
    BlendMode, Color, CropParams, LayerContent, LayerSpec, OutputFormat, Quality, TextSpec,
    WatermarkParams,
};
pub use rust_backend::RustBackend;
