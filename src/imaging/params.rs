//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the pipelines ([`stitch`](crate::stitch),
//! [`compress`](crate::compress)) and the [`backend`](super::backend) that does
//! the pixel work. Keeping them free of pixel data lets the search logic be
//! exercised against a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`AspectRatio`]: Positive, finite width/height proportion.
//! - [`CropRegion`]: Rectangle in source pixel coordinates.
//! - [`Format`]: The four container formats the engine reads and writes.
//! - [`Background`]: Canvas fill for stitched output.
//! - [`PngStrategy`]: Whether PNG/GIF sources are converted to JPEG when compressing.
//! - [`CompressionSpec`]: Ceiling, starting quality and strategy for one compression call.
//! - [`CompressionPolicy`]: The search constants (steps, floors, scale factor).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target width/height proportion, e.g. `2.35` for a cinema banner or `1.0` for a square.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AspectRatio(f64);

impl AspectRatio {
    /// The 2.35:1 cinema banner proportion.
    pub const BANNER: Self = Self(2.35);
    pub const SQUARE: Self = Self(1.0);

    /// Returns `None` unless the ratio is finite and strictly positive.
    pub fn new(ratio: f64) -> Option<Self> {
        (ratio.is_finite() && ratio > 0.0).then_some(Self(ratio))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Height of a region `width` pixels wide at this ratio, floored.
    pub fn height_for(self, width: u32) -> u32 {
        (width as f64 / self.0) as u32
    }

    /// Width of a region `height` pixels tall at this ratio, floored.
    pub fn width_for(self, height: u32) -> u32 {
        (height as f64 * self.0) as u32
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:1", self.0)
    }
}

/// Rectangle `(x1, y1)..(x2, y2)` in source-image pixel coordinates.
///
/// Corners are exclusive on the far side: a region covering a whole 100×50
/// image is `(0, 0, 100, 50)`. A freshly drawn region may have its corners in
/// any order; [`normalized`](Self::normalized) sorts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRegion {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Region covering an entire `width`×`height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn normalized(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when the region lies entirely inside a `width`×`height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2 && self.x2 <= width && self.y2 <= height
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

impl FromStr for CropRegion {
    type Err = String;

    /// Parses `x1,y1,x2,y2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid region '{s}': {e}"))?;
        match parts.as_slice() {
            [x1, y1, x2, y2] => Ok(Self::new(*x1, *y1, *x2, *y2)),
            _ => Err(format!(
                "invalid region '{s}': expected four numbers x1,y1,x2,y2"
            )),
        }
    }
}

/// Container formats read and written by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl Format {
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Canonical extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    /// Whether the encoder output depends on the quality setting.
    ///
    /// PNG, GIF and BMP ignore it, so stepping quality down cannot shrink them.
    pub fn has_quality_knob(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

/// Canvas fill for stitched output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Background {
    /// Opaque white RGB canvas.
    #[default]
    Opaque,
    /// Fully transparent RGBA canvas.
    Transparent,
}

/// What to do with PNG and GIF sources when compressing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PngStrategy {
    /// Flatten to opaque RGB and encode as JPEG (much smaller, loses transparency).
    #[default]
    ForceJpeg,
    /// Keep the source container and its transparency.
    KeepPng,
}

/// One compression request: byte ceiling, starting quality and PNG strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSpec {
    pub ceiling: NonZeroU64,
    pub quality: Quality,
    pub png_strategy: PngStrategy,
}

impl CompressionSpec {
    /// Build a spec whose ceiling is `megabytes * 1024 * 1024` bytes.
    ///
    /// Returns `None` for a zero ceiling.
    pub fn from_megabytes(
        megabytes: u64,
        quality: Quality,
        png_strategy: PngStrategy,
    ) -> Option<Self> {
        let ceiling = NonZeroU64::new(megabytes.checked_mul(1024 * 1024)?)?;
        Some(Self {
            ceiling,
            quality,
            png_strategy,
        })
    }
}

/// Constants driving the degradation search in [`compress`](crate::compress).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionPolicy {
    /// Quality decrement per stage-2 attempt.
    pub quality_step: u32,
    /// Stage 2 only tries qualities strictly above this value.
    pub quality_floor: u32,
    /// Stage 3 encodes at `max(starting quality, held_quality_floor)`.
    pub held_quality_floor: u32,
    /// Per-iteration uniform scale applied to both dimensions in stage 3.
    pub scale_factor: f64,
    /// Stage 3 stops before producing a dimension below this many pixels.
    pub min_dimension: u32,
}

impl CompressionPolicy {
    pub fn held_quality(&self, starting: Quality) -> Quality {
        Quality::new(starting.value().max(self.held_quality_floor))
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            quality_step: 5,
            quality_floor: 10,
            held_quality_floor: 70,
            scale_factor: 0.9,
            min_dimension: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn aspect_ratio_rejects_non_positive() {
        assert!(AspectRatio::new(0.0).is_none());
        assert!(AspectRatio::new(-1.0).is_none());
        assert!(AspectRatio::new(f64::NAN).is_none());
        assert!(AspectRatio::new(f64::INFINITY).is_none());
        assert_eq!(AspectRatio::new(2.35).unwrap().value(), 2.35);
    }

    #[test]
    fn aspect_ratio_floors_derived_edges() {
        let banner = AspectRatio::new(2.35).unwrap();
        // 1000 / 2.35 = 425.53
        assert_eq!(banner.height_for(1000), 425);
        // 425 * 2.35 = 998.75
        assert_eq!(banner.width_for(425), 998);
    }

    #[test]
    fn region_normalizes_reversed_corners() {
        let r = CropRegion::new(300, 200, 100, 50).normalized();
        assert_eq!(r, CropRegion::new(100, 50, 300, 200));
        assert_eq!((r.width(), r.height()), (200, 150));
    }

    #[test]
    fn region_fits_within_bounds() {
        assert!(CropRegion::new(0, 0, 100, 50).fits_within(100, 50));
        assert!(!CropRegion::new(0, 0, 101, 50).fits_within(100, 50));
        assert!(!CropRegion::new(10, 10, 10, 20).fits_within(100, 50));
    }

    #[test]
    fn region_parses_from_cli_string() {
        let r: CropRegion = "10, 20,310,220".parse().unwrap();
        assert_eq!(r, CropRegion::new(10, 20, 310, 220));
        assert!("10,20,30".parse::<CropRegion>().is_err());
        assert!("a,b,c,d".parse::<CropRegion>().is_err());
    }

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(Format::from_extension("JPEG"), Some(Format::Jpeg));
        assert_eq!(Format::from_extension("Png"), Some(Format::Png));
        assert_eq!(Format::from_extension("tiff"), None);
    }

    #[test]
    fn only_jpeg_has_quality_knob() {
        assert!(Format::Jpeg.has_quality_knob());
        assert!(!Format::Png.has_quality_knob());
        assert!(!Format::Gif.has_quality_knob());
        assert!(!Format::Bmp.has_quality_knob());
    }

    #[test]
    fn ceiling_is_megabytes_in_bytes() {
        let spec = CompressionSpec::from_megabytes(10, Quality::new(80), PngStrategy::ForceJpeg)
            .unwrap();
        assert_eq!(spec.ceiling.get(), 10 * 1024 * 1024);
        assert!(
            CompressionSpec::from_megabytes(0, Quality::new(80), PngStrategy::KeepPng).is_none()
        );
    }

    #[test]
    fn held_quality_is_floored_at_70() {
        let policy = CompressionPolicy::default();
        assert_eq!(policy.held_quality(Quality::new(40)).value(), 70);
        assert_eq!(policy.held_quality(Quality::new(85)).value(), 85);
    }
}
