//! Shared test utilities for the banner-press test suite.
//!
//! Synthetic images with predictable content, plus helpers to drop encoded
//! files into a temp directory for batch tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_image(tmp.path(), "photo.jpg", &noise_rgb(300, 200), Format::Jpeg);
//! ```

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::imaging::{Format, ImageBackend, Quality, RasterImage, RustBackend};

// =========================================================================
// Synthetic rasters
// =========================================================================

/// Smooth diagonal gradient. Compresses very well.
pub fn gradient_rgb(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Deterministic high-frequency noise. Compresses badly, so encoded size
/// tracks quality and dimensions closely.
pub fn noise_rgb(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
        v ^= v >> 15;
        v = v.wrapping_mul(0x2C1B_3C6D);
        v ^= v >> 12;
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    }))
}

/// Gradient with a transparent left half.
pub fn half_transparent_rgba(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([(x % 256) as u8, (y % 256) as u8, 64, alpha])
    }))
}

// =========================================================================
// Files on disk
// =========================================================================

/// Encode `image` with the real backend and write it to `dir/name`.
pub fn write_image(dir: &Path, name: &str, image: &RasterImage, format: Format) -> PathBuf {
    let bytes = RustBackend::new()
        .encode(image, format, Quality::new(95))
        .unwrap();
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Size of a file in bytes. Panics if it does not exist.
pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path)
        .unwrap_or_else(|e| panic!("{} missing: {e}", path.display()))
        .len()
}
