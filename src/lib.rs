//! # banner-press
//!
//! Two small image tools behind one command line: stitch two cropped photos
//! into a banner, and recompress images until they fit under a size ceiling.
//!
//! # Architecture: Two Independent Pipelines
//!
//! Both pipelines are pure transforms over in-memory rasters and byte
//! buffers. They share the [`imaging`] layer and nothing else:
//!
//! ```text
//! stitch     image A ─ fit/crop ─┐
//!                                 ├─ stitch ─► banner (PNG or JPEG)
//!            image B ─ fit/crop ─┘
//!
//! compress   image ─ direct ─► quality step-down ─► resize step-down ─► bytes ≤ ceiling
//! ```
//!
//! A stitched banner is an ordinary raster, so it can be fed straight into the
//! compressor.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`stitch`] | Ratio-locked crop fitting, cropping and vertical compositing |
//! | [`compress`] | Three-stage search for an encoding under a byte ceiling |
//! | [`batch`] | Parallel compression of a directory tree with per-file reports |
//! | [`imaging`] | Raster type, backend trait, pure-Rust backend, crop/search math |
//! | [`config`] | `banner-press.toml` loading, validation and merging |
//! | [`naming`] | `<stem>_compressed_q<quality><ext>` output paths |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Backend Trait
//!
//! Decode, encode and resize go through [`imaging::ImageBackend`]. The
//! compressor's search only depends on encoded sizes, so its tests run
//! against a mock backend with a closed-form size model and assert the exact
//! sequence of attempts.
//!
//! ## Lazy Attempt Plan
//!
//! The degradation search is an iterator ([`imaging::AttemptPlan`]) of
//! candidate encodes. The compressor pulls from it until one fits, so no
//! attempt is ever made past the first success and the bound on attempts is
//! visible in one place.
//!
//! ## Nothing Half-Written
//!
//! Every encode goes into a memory buffer. Only the winning buffer is written,
//! through a temporary file renamed over the destination, and never over the
//! source image.

pub mod batch;
pub mod compress;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod stitch;

#[cfg(test)]
pub(crate) mod test_helpers;
