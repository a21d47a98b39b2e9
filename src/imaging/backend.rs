//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three primitives both pipelines are
//! built on: decode a buffer, encode a raster into a buffer, and resize.
//! Crop and paste are plain buffer copies and live on
//! [`RasterImage`](super::raster::RasterImage) itself.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust with everything
//! statically linked into the binary.

use super::params::{Format, Quality};
use super::raster::{RasterImage, SourceImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image processing backends.
///
/// Every encode goes into a fresh in-memory buffer; backends never write to
/// the filesystem. `Sync` so a single backend can be shared across the batch
/// worker pool.
pub trait ImageBackend: Sync {
    /// Decode an encoded buffer, detecting its container format from content.
    fn decode(&self, bytes: Vec<u8>) -> Result<SourceImage, BackendError>;

    /// Encode `image` as `format`. `quality` is ignored by formats without a quality knob.
    fn encode(
        &self,
        image: &RasterImage,
        format: Format,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// Resize to exactly `width`×`height` with a Lanczos-class filter.
    fn resize(
        &self,
        image: &RasterImage,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, BackendError>;
}
