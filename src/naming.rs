//! Output filenames for compressed images.
//!
//! A compressed copy lands next to its source as
//! `<stem>_compressed_q<quality><ext>`, where `quality` is the *starting*
//! quality of the request (not the one the search ended on), so every file
//! of a batch run shares the same suffix:
//! - `IMG_0042.JPG` → `IMG_0042_compressed_q80.JPG`
//! - `logo.png` (forced to JPEG) → `logo_compressed_q80.jpg`
//! - `logo.png` (kept as PNG) → `logo_compressed_q80.png`

use crate::imaging::{Format, Quality};
use std::path::{Path, PathBuf};

/// Marker inserted between the original stem and the quality suffix.
pub const COMPRESSED_MARKER: &str = "_compressed_q";

/// Derive the output path for a compressed copy of `source`.
///
/// The original extension (including its case) is kept when it already names
/// `output_format`; otherwise the canonical extension of `output_format` is used.
pub fn compressed_output_path(
    source: &Path,
    starting_quality: Quality,
    output_format: Format,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| Format::from_extension(e) == Some(output_format))
        .unwrap_or_else(|| output_format.extension().to_string());

    source.with_file_name(format!(
        "{stem}{COMPRESSED_MARKER}{}.{ext}",
        starting_quality.value()
    ))
}
