//! Output filename derivation.
//!
//! | Export    | Source          | Output                    |
//! |-----------|-----------------|---------------------------|
//! | crop      | `beach.jpg`     | `cropped_beach.jpg`       |
//! | crop      | `scan.avif`     | `cropped_scan.png` (PNG fallback) |
//! | watermark | `beach.jpg`     | `beach_watermarked.png`   |
//!
//! Directory components in a source name are dropped, so outputs always land
//! directly in the chosen output directory.

use crate::imaging::OutputFormat;
use std::path::Path;

/// Final path component of `name`, or `name` itself if it has none.
pub fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

/// Filename without directories or extension; `"image"` when nothing is left.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
}

/// Name for a crop of `original` encoded as `format`.
///
/// The original name is kept verbatim when its extension already matches the
/// output format; otherwise the extension is replaced.
pub fn cropped_name(original: &str, format: OutputFormat) -> String {
    let base = base_name(original);
    if OutputFormat::from_file_name(base) == Some(format) {
        format!("cropped_{base}")
    } else {
        format!("cropped_{}.{}", file_stem(base), format.extension())
    }
}

/// Name for a watermarked copy of `original`. Always PNG.
pub fn watermarked_name(original: &str) -> String {
    format!("{}_watermarked.png", file_stem(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_keeps_original_name_when_format_matches() {
        assert_eq!(cropped_name("beach.jpg", OutputFormat::Jpeg), "cropped_beach.jpg");
        assert_eq!(cropped_name("Beach.JPEG", OutputFormat::Jpeg), "cropped_Beach.JPEG");
        assert_eq!(cropped_name("icon.png", OutputFormat::Png), "cropped_icon.png");
    }

    #[test]
    fn crop_swaps_extension_on_fallback() {
        assert_eq!(cropped_name("scan.avif", OutputFormat::Png), "cropped_scan.png");
        assert_eq!(cropped_name("noext", OutputFormat::Png), "cropped_noext.png");
    }

    #[test]
    fn crop_drops_directories() {
        assert_eq!(
            cropped_name("holiday/2024/beach.jpg", OutputFormat::Jpeg),
            "cropped_beach.jpg"
        );
    }

    #[test]
    fn watermark_name_uses_stem() {
        assert_eq!(watermarked_name("beach.jpg"), "beach_watermarked.png");
        assert_eq!(watermarked_name("a.b.c.webp"), "a.b.c_watermarked.png");
        assert_eq!(watermarked_name("dir/photo.tiff"), "photo_watermarked.png");
    }

    #[test]
    fn empty_stem_falls_back() {
        assert_eq!(file_stem(""), "image");
        assert_eq!(watermarked_name(""), "image_watermarked.png");
    }
}
