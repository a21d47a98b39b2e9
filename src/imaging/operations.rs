//! High-level image operations.
//!
//! These functions combine file I/O with backend execution. The pipelines
//! themselves never touch the filesystem; everything that does lives here.

use super::backend::{BackendError, ImageBackend};
use super::params::{Format, Quality};
use super::raster::{PixelFormat, RasterImage, SourceImage};
use std::io::Write;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Read `path` and decode it, keeping the original bytes alongside the pixels.
pub fn load_source(backend: &impl ImageBackend, path: &Path) -> Result<SourceImage> {
    let bytes = std::fs::read(path)?;
    backend.decode(bytes)
}

/// Encode `image` for export as `format`.
///
/// JPEG cannot carry alpha, so an RGBA image is composited onto white first.
pub fn export_image(
    backend: &impl ImageBackend,
    image: &RasterImage,
    format: Format,
    quality: Quality,
) -> Result<Vec<u8>> {
    if format == Format::Jpeg && image.pixel_format() == PixelFormat::Rgba {
        return backend.encode(&image.to_opaque(), format, quality);
    }
    backend.encode(image, format, quality)
}

/// Write `bytes` to `path` without ever leaving a partial file behind.
///
/// The data goes to a temporary file in the destination directory, which is
/// then renamed over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}
