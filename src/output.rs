//! CLI output formatting for the export commands.
//!
//! # Output Format
//!
//! ## Batch progress
//!
//! ```text
//! 001 beach.jpg
//!     → cropped_beach.jpg (960x720)
//! 002 broken.png
//!     ✗ failed to decode broken.png: ...
//! ```
//!
//! ## Report
//!
//! ```text
//! Exported 2 images, 1 failed
//!     Skipped: broken.png
//! ```
//!
//! ## Map
//!
//! ```text
//! Display 800x600 → Natural 1600x1200 (scale 2.000 x 2.000)
//!     Rect 160,120,480,360 → 320,240,960,720
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::geometry::{ImageMeta, PixelRect, Rect};
use crate::imaging::{BatchEvent, BatchReport};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format a single batch event as it streams in.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { index, name, .. } => {
            vec![format!("{} {}", format_index(index + 1), name)]
        }
        BatchEvent::Exported {
            output,
            width,
            height,
            ..
        } => vec![format!("{}→ {} ({}x{})", indent(1), output, width, height)],
        BatchEvent::Failed { reason, .. } => vec![format!("{}✗ {}", indent(1), reason)],
    }
}

/// Format the closing summary of a batch.
pub fn format_report(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Exported {}, {} failed",
        plural(report.outputs.len(), "image"),
        report.failures.len()
    )];
    for failure in &report.failures {
        lines.push(format!("{}Skipped: {}", indent(1), failure.name));
    }
    lines
}

pub fn print_report(report: &BatchReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

/// Format a display → natural mapping.
pub fn format_mapping(meta: &ImageMeta, display: &Rect, natural: &PixelRect) -> Vec<String> {
    vec![
        format!(
            "Display {}x{} → Natural {}x{} (scale {:.3} x {:.3})",
            meta.display.width,
            meta.display.height,
            meta.natural.width,
            meta.natural.height,
            meta.scale_x(),
            meta.scale_y()
        ),
        format!(
            "{}Rect {},{},{},{} → {},{},{},{}",
            indent(1),
            display.x,
            display.y,
            display.width,
            display.height,
            natural.x,
            natural.y,
            natural.width,
            natural.height
        ),
    ]
}

pub fn print_mapping(meta: &ImageMeta, display: &Rect, natural: &PixelRect) {
    for line in format_mapping(meta, display, natural) {
        println!("{}", line);
    }
}
