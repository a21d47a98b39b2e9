//! Crop-and-stitch pipeline.
//!
//! Two source images are each cropped to a locked aspect ratio, then stacked
//! vertically into one banner: the top part at its ratio, the bottom part at
//! its own, both scaled to a common width.
//!
//! ```text
//! fit_crop_to_ratio ──► crop ──► CommittedCrop ─┐
//!                                                ├─► StitchInputs ──► stitch ──► export
//! fit_crop_to_ratio ──► crop ──► CommittedCrop ─┘
//! ```
//!
//! Region fitting is a pure function of the image extents, so the same call
//! drives a live preview and the final commit. Nothing here reads or writes
//! files; see [`crate::imaging::operations`] for that.

use crate::imaging::{
    AspectRatio, Background, BackendError, CropRegion, Format, ImageBackend, Quality, RasterImage,
    calculate_ratio_fit, calculate_stitch_layout, clamp_region, export_image,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("crop region {width}x{height} is too small (minimum {min}px per side)")]
    RegionTooSmall { width: u32, height: u32, min: u32 },
    #[error("crop region {region} is outside the {width}x{height} image")]
    OutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },
    #[error("no {0} image has been committed")]
    MissingInput(Side),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Which half of the banner a crop belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
        })
    }
}

/// Settings for one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StitchSettings {
    pub ratio_top: AspectRatio,
    pub ratio_bottom: AspectRatio,
    /// Minimum crop side in display pixels.
    pub min_region: u32,
    /// Quality used when the banner is exported as JPEG.
    pub export_quality: Quality,
}

impl Default for StitchSettings {
    fn default() -> Self {
        Self {
            ratio_top: AspectRatio::BANNER,
            ratio_bottom: AspectRatio::SQUARE,
            min_region: 50,
            export_quality: Quality::default(),
        }
    }
}

impl StitchSettings {
    pub fn ratio_for(&self, side: Side) -> AspectRatio {
        match side {
            Side::Top => self.ratio_top,
            Side::Bottom => self.ratio_bottom,
        }
    }
}

/// Where a source image is drawn on a display canvas.
///
/// Converts rectangles drawn on the canvas into source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub source_width: u32,
    pub source_height: u32,
}

impl Viewport {
    /// Fit a `source` image inside a `canvas`, preserving its proportions and
    /// centering it. Images smaller than the canvas are shown at 1:1.
    pub fn fit(source: (u32, u32), canvas: (u32, u32)) -> Self {
        let (sw, sh) = (source.0.max(1) as f64, source.1.max(1) as f64);
        let scale = (canvas.0 as f64 / sw).min(canvas.1 as f64 / sh).min(1.0);
        let (dw, dh) = (sw * scale, sh * scale);
        Self {
            offset_x: (canvas.0 as f64 - dw) / 2.0,
            offset_y: (canvas.1 as f64 - dh) / 2.0,
            display_width: dw,
            display_height: dh,
            source_width: source.0,
            source_height: source.1,
        }
    }

    /// Source pixels per displayed pixel.
    pub fn zoom(&self) -> f64 {
        if self.display_width <= 0.0 {
            return 1.0;
        }
        self.source_width as f64 / self.display_width
    }

    /// Map a canvas-space rectangle (corners in any order) to source coordinates.
    ///
    /// Points left of or above the image map to zero; the far side is left
    /// for [`fit_region_to_ratio`] to clamp.
    pub fn to_source(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> CropRegion {
        let zoom = self.zoom();
        let sx = |x: f64| ((x - self.offset_x) * zoom).max(0.0) as u32;
        let sy = |y: f64| ((y - self.offset_y) * zoom).max(0.0) as u32;
        CropRegion::new(sx(x1), sy(y1), sx(x2), sy(y2)).normalized()
    }
}

/// Fit a freehand `requested` region to `ratio` inside a `width`×`height` image.
///
/// Corners are normalised and the region intersected with the image before
/// trimming. Either resulting side below `min_side` source pixels is
/// rejected, as is an empty result.
pub fn fit_region_to_ratio(
    (width, height): (u32, u32),
    requested: CropRegion,
    ratio: AspectRatio,
    min_side: f64,
) -> Result<CropRegion, StitchError> {
    let region = clamp_region(requested.normalized(), width, height);
    let fitted = calculate_ratio_fit(region, ratio);
    let (w, h) = (fitted.width(), fitted.height());
    if fitted.is_empty() || (w as f64) < min_side || (h as f64) < min_side {
        return Err(StitchError::RegionTooSmall {
            width: w,
            height: h,
            min: min_side.ceil() as u32,
        });
    }
    Ok(fitted)
}

/// A crop locked to a ratio, ready to be stitched.
#[derive(Debug, Clone)]
pub struct CommittedCrop {
    pub image: RasterImage,
    pub ratio: AspectRatio,
    pub region: CropRegion,
}

/// The committed crops for both halves of a banner.
#[derive(Debug, Clone, Default)]
pub struct StitchInputs {
    pub top: Option<CommittedCrop>,
    pub bottom: Option<CommittedCrop>,
}

impl StitchInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the crop for `side`.
    pub fn with(mut self, side: Side, crop: CommittedCrop) -> Self {
        match side {
            Side::Top => self.top = Some(crop),
            Side::Bottom => self.bottom = Some(crop),
        }
        self
    }

    pub fn is_ready(&self) -> bool {
        self.top.is_some() && self.bottom.is_some()
    }
}

pub struct CropStitchPipeline<B> {
    backend: B,
    settings: StitchSettings,
}

impl<B: ImageBackend> CropStitchPipeline<B> {
    pub fn new(backend: B, settings: StitchSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &StitchSettings {
        &self.settings
    }

    /// Adjust a drawn region to `ratio` on `image`.
    ///
    /// `zoom` is the display-to-source scale the region was drawn at; the
    /// minimum side is `min_region * zoom` source pixels.
    pub fn fit_crop_to_ratio(
        &self,
        image: &RasterImage,
        requested: CropRegion,
        ratio: AspectRatio,
        zoom: f64,
    ) -> Result<CropRegion, StitchError> {
        let min_side = self.settings.min_region as f64 * zoom;
        fit_region_to_ratio(image.dimensions(), requested, ratio, min_side)
    }

    /// Pixel-accurate crop. The region must be non-empty and inside the image.
    pub fn crop(
        &self,
        image: &RasterImage,
        region: CropRegion,
    ) -> Result<RasterImage, StitchError> {
        let (width, height) = image.dimensions();
        if !region.fits_within(width, height) {
            return Err(StitchError::OutOfBounds {
                region,
                width,
                height,
            });
        }
        Ok(image.cropped(region.x1, region.y1, region.width(), region.height()))
    }

    /// Fit `requested` to `ratio` and crop, remembering the ratio for [`stitch`](Self::stitch).
    pub fn commit(
        &self,
        image: &RasterImage,
        requested: CropRegion,
        ratio: AspectRatio,
        zoom: f64,
    ) -> Result<CommittedCrop, StitchError> {
        let region = self.fit_crop_to_ratio(image, requested, ratio, zoom)?;
        let cropped = self.crop(image, region)?;
        debug!(%region, %ratio, "committed crop");
        Ok(CommittedCrop {
            image: cropped,
            ratio,
            region,
        })
    }

    /// Stack both committed crops on one canvas.
    ///
    /// Both parts are resized to the narrower crop's width, each at its own
    /// ratio. The top part is pasted at the origin and the bottom part right
    /// beneath it.
    pub fn stitch(
        &self,
        inputs: &StitchInputs,
        background: Background,
    ) -> Result<RasterImage, StitchError> {
        let top = inputs
            .top
            .as_ref()
            .ok_or(StitchError::MissingInput(Side::Top))?;
        let bottom = inputs
            .bottom
            .as_ref()
            .ok_or(StitchError::MissingInput(Side::Bottom))?;

        let layout = calculate_stitch_layout(
            top.image.width(),
            top.ratio,
            bottom.image.width(),
            bottom.ratio,
        );
        let top_part = self
            .backend
            .resize(&top.image, layout.width, layout.top_height)?;
        let bottom_part = self
            .backend
            .resize(&bottom.image, layout.width, layout.bottom_height)?;

        let mut canvas = RasterImage::canvas(layout.width, layout.total_height(), background);
        canvas.paste(&top_part, 0, 0);
        canvas.paste(&bottom_part, 0, layout.top_height);

        info!(
            width = layout.width,
            height = layout.total_height(),
            ?background,
            "stitched banner"
        );
        Ok(canvas)
    }

    /// Encode a stitched banner. JPEG output is flattened onto white.
    pub fn export(&self, image: &RasterImage, format: Format) -> Result<Vec<u8>, StitchError> {
        Ok(export_image(
            &self.backend,
            image,
            format,
            self.settings.export_quality,
        )?)
    }
}
