//! High-level export operations.
//!
//! These functions combine job snapshots with backend execution. A job is an
//! immutable copy of everything an export needs (source bytes, display
//! geometry, layers), so the interactive state can keep changing while an
//! export runs.
//!
//! ## Batch export
//!
//! ```text
//! reference job ──▶ relative rect / placements ──┐
//!                                                ▼
//! for each source:  identify ─▶ resolve against its own size ─▶ export
//!                      │ decode failure                         │
//!                      └──▶ BatchEvent::Failed, keep going      └──▶ BatchEvent::Exported
//! ```
//!
//! Images are processed one at a time. Decode failures are recorded and the
//! batch moves on; any other error (surface allocation, encoding) aborts it.

use super::backend::{ExportBackend, ExportError};
use super::params::{CropParams, LayerSpec, OutputFormat, Quality, WatermarkParams};
use crate::geometry::{ImageMeta, PixelRect, Rect, RelativeRect, to_natural};
use crate::naming::{cropped_name, watermarked_name};
use crate::types::{ExportedImage, SourceImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Snapshot of a crop request in display space.
#[derive(Debug, Clone, PartialEq)]
pub struct CropJob {
    pub source: SourceImage,
    pub meta: ImageMeta,
    /// Selection rectangle in display pixels.
    pub rect: Rect,
    pub quality: Quality,
}

impl CropJob {
    pub fn natural_rect(&self) -> PixelRect {
        to_natural(&self.rect, &self.meta)
    }

    /// The crop as fractions of the source, for re-use on other images.
    pub fn relative_rect(&self) -> RelativeRect {
        RelativeRect::from_pixels(&self.natural_rect(), self.meta.natural)
    }
}

/// Snapshot of a watermark request. Layers are fully relative.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkJob {
    pub source: SourceImage,
    pub layers: Vec<LayerSpec>,
}

/// Plan a crop export without executing it.
pub fn plan_crop(source: &SourceImage, rect: PixelRect, quality: Quality) -> CropParams {
    let format = OutputFormat::for_source(source.name());
    CropParams {
        source: source.clone(),
        rect,
        output_name: cropped_name(source.name(), format),
        format,
        quality,
    }
}

/// Plan a watermark export without executing it.
pub fn plan_watermark(source: &SourceImage, layers: &[LayerSpec]) -> WatermarkParams {
    WatermarkParams {
        source: source.clone(),
        layers: layers.to_vec(),
        output_name: watermarked_name(source.name()),
    }
}

/// Export the job's selection at full resolution.
pub fn export_crop(backend: &impl ExportBackend, job: &CropJob) -> Result<ExportedImage> {
    let params = plan_crop(&job.source, job.natural_rect(), job.quality);
    log::debug!("cropping {} to {:?}", job.source.name(), params.rect);
    backend.crop(&params)
}

pub fn export_watermark(backend: &impl ExportBackend, job: &WatermarkJob) -> Result<ExportedImage> {
    backend.watermark(&plan_watermark(&job.source, &job.layers))
}

// =============================================================================
// Batch
// =============================================================================

/// Progress notification emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        name: String,
    },
    Exported {
        index: usize,
        name: String,
        output: String,
        width: u32,
        height: u32,
    },
    Failed {
        index: usize,
        name: String,
        reason: String,
    },
}

/// An image the batch had to skip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outputs: Vec<ExportedImage>,
    pub failures: Vec<BatchFailure>,
}

/// Serializable summary of a [`BatchReport`], written as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub exported: Vec<ReportEntry>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub source: String,
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl BatchReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            exported: self
                .outputs
                .iter()
                .map(|o| ReportEntry {
                    source: o.source_name.clone(),
                    output: o.file_name.clone(),
                    width: o.width,
                    height: o.height,
                    format: o.format,
                })
                .collect(),
            failed: self.failures.clone(),
        }
    }
}

fn notify(events: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        tx.send(event).ok();
    }
}

fn run_batch<F>(
    sources: &[SourceImage],
    events: Option<Sender<BatchEvent>>,
    mut export: F,
) -> Result<BatchReport>
where
    F: FnMut(&SourceImage) -> Result<ExportedImage>,
{
    let total = sources.len();
    let mut report = BatchReport::default();
    log::info!("batch export of {total} images");

    for (index, source) in sources.iter().enumerate() {
        let name = source.name().to_string();
        notify(
            &events,
            BatchEvent::Started {
                index,
                total,
                name: name.clone(),
            },
        );

        match export(source) {
            Ok(out) => {
                log::info!("[{}/{}] {} -> {}", index + 1, total, name, out.file_name);
                notify(
                    &events,
                    BatchEvent::Exported {
                        index,
                        name,
                        output: out.file_name.clone(),
                        width: out.width,
                        height: out.height,
                    },
                );
                report.outputs.push(out);
            }
            Err(e) if e.is_per_item() => {
                log::warn!("skipping {name}: {e}");
                let reason = e.to_string();
                notify(
                    &events,
                    BatchEvent::Failed {
                        index,
                        name: name.clone(),
                        reason: reason.clone(),
                    },
                );
                report.failures.push(BatchFailure {
                    index,
                    name,
                    reason,
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Apply the reference crop to every source.
///
/// Each image gets the same *relative* region, resolved against its own
/// natural size.
pub fn apply_crop_to_all(
    backend: &impl ExportBackend,
    reference: &CropJob,
    sources: &[SourceImage],
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport> {
    let relative = reference.relative_rect();
    run_batch(sources, events, |source| {
        let dims = backend.identify(source)?;
        let rect = relative.to_pixels(dims);
        backend.crop(&plan_crop(source, rect, reference.quality))
    })
}

/// Apply the same watermark layers to every source.
pub fn apply_watermark_to_all(
    backend: &impl ExportBackend,
    layers: &[LayerSpec],
    sources: &[SourceImage],
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport> {
    run_batch(sources, events, |source| {
        backend.watermark(&plan_watermark(source, layers))
    })
}

/// Save outputs under `dir`, creating it if needed. Returns the written paths
/// in order.
pub fn write_outputs(dir: &Path, outputs: &[ExportedImage]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    outputs
        .iter()
        .map(|out| {
            let path = dir.join(&out.file_name);
            std::fs::write(&path, &out.bytes)?;
            log::debug!("wrote {}", path.display());
            Ok(path)
        })
        .collect()
}
