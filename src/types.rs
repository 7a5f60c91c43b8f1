//! Shared types passed between the workspace, the overlay and the export
//! renderer.
//!
//! A [`SourceImage`] is what the user dropped into the queue: a filename, a
//! MIME type, and the raw encoded bytes. The bytes live behind an
//! `Arc<[u8]>` so export jobs can snapshot a source without copying it.
//!
//! An [`ExportedImage`] is what comes back out: an encoded buffer plus the
//! filename it should be saved under.

use crate::imaging::OutputFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// MIME type reported for files whose extension names no known image format.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} is not an image ({mime})")]
    NotAnImage { name: String, mime: String },
    #[error("failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// An encoded image waiting in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// Non-image files are rejected with [`SourceError::NotAnImage`].
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let mime = guess_mime(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if !mime.starts_with("image/") {
            return Err(SourceError::NotAnImage { name, mime });
        }
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(name, mime, bytes))
    }

    /// Original filename, without directories.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Another handle to the same buffer.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIME type for a path based on its extension.
pub fn guess_mime(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| UNKNOWN_MIME.to_string())
}

/// Read every image named by `inputs`.
///
/// Directories are walked recursively in filename order. Files that do not
/// look like images are logged and skipped; unreadable files are an error.
pub fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<SourceImage>, SourceError> {
    let mut sources = Vec::new();
    for input in inputs {
        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            match SourceImage::from_path(entry.path()) {
                Ok(source) => sources.push(source),
                Err(SourceError::NotAnImage { name, mime }) => {
                    log::warn!("skipping {name}: not an image ({mime})");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(sources)
}

/// An encoded output image.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    /// Filename the output should be saved under.
    pub file_name: String,
    /// Name of the source image it was produced from.
    pub source_name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}
