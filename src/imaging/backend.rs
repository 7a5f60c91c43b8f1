//! Export backend trait and error type.
//!
//! The [`ExportBackend`] trait defines the three operations every backend must
//! support: identify, crop and watermark. The rest of the crate only talks to
//! the trait, so batch logic can be tested with a recording mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and an embedded 8×8 bitmap font.

use super::params::{CropParams, WatermarkParams};
use crate::geometry::Dimensions;
use crate::types::{ExportedImage, SourceImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The source (or a logo layer) could not be decoded. Batch export skips
    /// the image and keeps going.
    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    /// The output surface could not be allocated. Aborts the export call.
    #[error("cannot allocate a {width}x{height} output surface: {reason}")]
    Canvas {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },
    #[error("{name} is not an image ({mime})")]
    UnsupportedInput { name: String, mime: String },
}

impl ExportError {
    /// Whether batch export should record this error and move on.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            ExportError::Decode { .. } | ExportError::UnsupportedInput { .. }
        )
    }
}

/// Trait for export backends.
///
/// Every backend must implement all three operations so the rest of the
/// codebase is backend-agnostic.
pub trait ExportBackend {
    /// Natural size of the encoded source.
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, ExportError>;

    /// Copy `params.rect` one-to-one into a new image.
    fn crop(&self, params: &CropParams) -> Result<ExportedImage, ExportError>;

    /// Draw every layer over the source at natural resolution.
    fn watermark(&self, params: &WatermarkParams) -> Result<ExportedImage, ExportError>;
}
