//! Size-constrained recompression.
//!
//! [`AdaptiveCompressor::compress`] searches for an encoding of one image that
//! fits under a byte ceiling, degrading the output in three ordered stages:
//!
//! 1. **Direct**: encode once at the starting quality.
//! 2. **Quality step**: lower the quality in fixed steps, keeping full size.
//!    Skipped for formats whose encoder has no quality setting.
//! 3. **Resize**: shrink both dimensions by a constant factor per attempt,
//!    encoding at a held quality, until a dimension would drop below the
//!    minimum.
//!
//! The candidate sequence comes from [`AttemptPlan`]; this module only runs
//! encodes until one fits. All encodes go into in-memory buffers. Writing the
//! winner to disk is the caller's job.
//!
//! PNG and GIF sources are flattened onto white and re-encoded as JPEG unless
//! the request says to keep them.

use crate::imaging::{
    AttemptPlan, BackendError, CompressionPolicy, CompressionSpec, Format, ImageBackend,
    PngStrategy, Quality, RasterImage, SourceImage, Stage,
};
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("cannot fit under {ceiling} bytes (best was {best_size} bytes at {width}x{height})")]
    CannotMeetSizeConstraint {
        ceiling: u64,
        best_size: u64,
        width: u32,
        height: u32,
    },
    #[error("Decode failed: {0}")]
    DecodeFailure(String),
    #[error("Encode failed: {0}")]
    EncodeFailure(String),
}

impl From<BackendError> for CompressError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Io(e) => CompressError::DecodeFailure(e.to_string()),
            BackendError::Decode(msg) => CompressError::DecodeFailure(msg),
            BackendError::Encode(msg) => CompressError::EncodeFailure(msg),
        }
    }
}

/// Outcome of a successful compression. `bytes.len()` never exceeds the ceiling.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub bytes: Vec<u8>,
    /// Quality of the winning encode (the starting quality for a passthrough).
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub stage: Stage,
    /// Number of encodes performed, zero for a passthrough.
    pub attempts: u32,
    /// The source's own bytes were returned unchanged.
    pub passthrough: bool,
}

impl CompressionResult {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Output format for `source` under `strategy`, and whether it must be flattened.
pub(crate) fn target_format(source: Format, strategy: PngStrategy) -> (Format, bool) {
    match (source, strategy) {
        (Format::Png | Format::Gif, PngStrategy::ForceJpeg) => (Format::Jpeg, true),
        (format, _) => (format, false),
    }
}

pub struct AdaptiveCompressor<B> {
    backend: B,
    policy: CompressionPolicy,
}

impl<B: ImageBackend> AdaptiveCompressor<B> {
    pub fn new(backend: B, policy: CompressionPolicy) -> Self {
        Self { backend, policy }
    }

    /// Decode an encoded buffer and [`compress`](Self::compress) it.
    pub fn compress_bytes(
        &self,
        bytes: Vec<u8>,
        spec: &CompressionSpec,
    ) -> Result<CompressionResult, CompressError> {
        let source = self.backend.decode(bytes)?;
        self.compress(&source, spec)
    }

    /// Find the first encoding of `source` that fits under `spec.ceiling`.
    ///
    /// When the output format matches the source and the source's original
    /// bytes already fit, those bytes are returned without re-encoding, so
    /// compressing this function's own output again succeeds immediately.
    pub fn compress(
        &self,
        source: &SourceImage,
        spec: &CompressionSpec,
    ) -> Result<CompressionResult, CompressError> {
        let ceiling = spec.ceiling.get();
        let (format, flatten) = target_format(source.format, spec.png_strategy);
        let (width, height) = source.raster.dimensions();

        let fitting_original = source
            .encoded
            .as_ref()
            .filter(|b| format == source.format && b.len() as u64 <= ceiling);
        if let Some(original) = fitting_original {
            debug!(size = original.len(), ceiling, "source already fits, passing through");
            return Ok(CompressionResult {
                bytes: original.clone(),
                quality: spec.quality,
                width,
                height,
                format,
                stage: Stage::Direct,
                attempts: 0,
                passthrough: true,
            });
        }

        let working: Cow<'_, RasterImage> = if flatten {
            Cow::Owned(source.raster.to_opaque())
        } else {
            Cow::Borrowed(&source.raster)
        };

        let plan = AttemptPlan::new(
            (width, height),
            spec.quality,
            format.has_quality_knob(),
            self.policy,
        );

        let mut attempts = 0;
        let mut smallest: Option<(u64, u32, u32)> = None;
        for attempt in plan {
            let resized;
            let candidate = if (attempt.width, attempt.height) == (width, height) {
                working.as_ref()
            } else {
                resized = self
                    .backend
                    .resize(&working, attempt.width, attempt.height)?;
                &resized
            };

            let bytes = self.backend.encode(candidate, format, attempt.quality)?;
            attempts += 1;
            let size = bytes.len() as u64;
            debug!(
                stage = ?attempt.stage,
                quality = attempt.quality.value(),
                width = attempt.width,
                height = attempt.height,
                size,
                ceiling,
                "encode attempt"
            );

            if size <= ceiling {
                info!(
                    stage = ?attempt.stage,
                    quality = attempt.quality.value(),
                    size,
                    attempts,
                    "fits under ceiling"
                );
                return Ok(CompressionResult {
                    bytes,
                    quality: attempt.quality,
                    width: attempt.width,
                    height: attempt.height,
                    format,
                    stage: attempt.stage,
                    attempts,
                    passthrough: false,
                });
            }
            if smallest.is_none_or(|(best, _, _)| size < best) {
                smallest = Some((size, attempt.width, attempt.height));
            }
        }

        let (best_size, width, height) = smallest.unwrap_or((0, width, height));
        info!(ceiling, best_size, attempts, "cannot meet size constraint");
        Err(CompressError::CannotMeetSizeConstraint {
            ceiling,
            best_size,
            width,
            height,
        })
    }
}
