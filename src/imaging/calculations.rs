//! Pure calculation functions for crop fitting, stitch layout and the
//! compression search.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{AspectRatio, CompressionPolicy, CropRegion, Quality};

/// Trim `region` symmetrically until its width/height matches `ratio`.
///
/// The region is assumed normalized. With `th = floor(w / ratio)`: when `th`
/// exceeds the available height the region is too wide, so the width shrinks
/// to `floor(h * ratio)` and is center-trimmed horizontally; otherwise the
/// height shrinks to `th` and is center-trimmed vertically. The result may
/// be empty when the region is tiny; callers enforce a minimum size.
///
/// # Examples
/// ```
/// # use banner_press::imaging::{AspectRatio, CropRegion, calculate_ratio_fit};
/// let square = AspectRatio::new(1.0).unwrap();
/// // 400x200 → trimmed to the centered 200x200
/// let fitted = calculate_ratio_fit(CropRegion::new(0, 0, 400, 200), square);
/// assert_eq!(fitted, CropRegion::new(100, 0, 300, 200));
/// ```
pub fn calculate_ratio_fit(region: CropRegion, ratio: AspectRatio) -> CropRegion {
    let (w, h) = (region.width(), region.height());
    let target_height = ratio.height_for(w);

    if target_height > h {
        // Too wide: keep the height, trim left and right
        let target_width = ratio.width_for(h).min(w);
        let left = region.x1 + (w - target_width) / 2;
        CropRegion::new(left, region.y1, left + target_width, region.y2)
    } else {
        // Too tall (or exact): keep the width, trim top and bottom
        let top = region.y1 + (h - target_height) / 2;
        CropRegion::new(region.x1, top, region.x2, top + target_height)
    }
}

/// Intersect a normalized region with a `width`×`height` image.
pub fn clamp_region(region: CropRegion, width: u32, height: u32) -> CropRegion {
    let x1 = region.x1.min(width);
    let y1 = region.y1.min(height);
    CropRegion::new(x1, y1, region.x2.clamp(x1, width), region.y2.clamp(y1, height))
}

/// Output geometry of a stitched banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchLayout {
    /// Common width of both parts and of the canvas.
    pub width: u32,
    pub top_height: u32,
    pub bottom_height: u32,
}

impl StitchLayout {
    pub fn total_height(&self) -> u32 {
        self.top_height + self.bottom_height
    }
}

/// Compute the stitched layout from the widths of both crops and their ratios.
///
/// The common width is the narrower of the two, so neither part is upscaled
/// past its own detail. Each part's height follows from its own ratio,
/// floored and never below one pixel.
pub fn calculate_stitch_layout(
    top_width: u32,
    top_ratio: AspectRatio,
    bottom_width: u32,
    bottom_ratio: AspectRatio,
) -> StitchLayout {
    let width = top_width.min(bottom_width);
    StitchLayout {
        width,
        top_height: top_ratio.height_for(width).max(1),
        bottom_height: bottom_ratio.height_for(width).max(1),
    }
}

/// One uniform downscale step: both dimensions multiplied by `factor`, floored.
pub fn calculate_scaled_dimensions(dims: (u32, u32), factor: f64) -> (u32, u32) {
    let (w, h) = dims;
    ((w as f64 * factor) as u32, (h as f64 * factor) as u32)
}

/// Ordered degradation stages of the compression search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Encode once at the starting quality.
    Direct,
    /// Step the quality down at full size.
    QualityStep,
    /// Shrink the image at a held quality.
    Resize,
}

/// A single candidate encode the compressor should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub stage: Stage,
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Direct,
    Quality(u32),
    Resize(u32, u32),
    Done,
}

/// Lazy, bounded sequence of [`Attempt`]s for one compression call.
///
/// Yields the direct encode, then (for formats with a quality knob) every
/// stepped-down quality strictly above the floor, then successively smaller
/// dimensions at the held quality. Ends before any dimension would drop below
/// the policy minimum, so an image already under the minimum gets no resize
/// attempt at all. The caller stops pulling at the first attempt that fits.
#[derive(Debug, Clone)]
pub struct AttemptPlan {
    policy: CompressionPolicy,
    starting: Quality,
    held: Quality,
    dims: (u32, u32),
    quality_steps: bool,
    cursor: Cursor,
}

impl AttemptPlan {
    pub fn new(
        dims: (u32, u32),
        starting: Quality,
        quality_steps: bool,
        policy: CompressionPolicy,
    ) -> Self {
        Self {
            held: policy.held_quality(starting),
            policy,
            starting,
            dims,
            quality_steps,
            cursor: Cursor::Direct,
        }
    }
}

impl Iterator for AttemptPlan {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        loop {
            match self.cursor {
                Cursor::Direct => {
                    self.cursor = if self.quality_steps && self.policy.quality_step > 0 {
                        Cursor::Quality(self.starting.value())
                    } else {
                        Cursor::Resize(self.dims.0, self.dims.1)
                    };
                    return Some(Attempt {
                        stage: Stage::Direct,
                        quality: self.starting,
                        width: self.dims.0,
                        height: self.dims.1,
                    });
                }
                Cursor::Quality(previous) => {
                    let next = previous.saturating_sub(self.policy.quality_step);
                    if next <= self.policy.quality_floor {
                        self.cursor = Cursor::Resize(self.dims.0, self.dims.1);
                        continue;
                    }
                    self.cursor = Cursor::Quality(next);
                    return Some(Attempt {
                        stage: Stage::QualityStep,
                        quality: Quality::new(next),
                        width: self.dims.0,
                        height: self.dims.1,
                    });
                }
                Cursor::Resize(w, h) => {
                    let (nw, nh) = calculate_scaled_dimensions((w, h), self.policy.scale_factor);
                    let min = self.policy.min_dimension.max(1);
                    // A non-shrinking factor would never terminate
                    if nw < min || nh < min || (nw, nh) == (w, h) {
                        self.cursor = Cursor::Done;
                        return None;
                    }
                    self.cursor = Cursor::Resize(nw, nh);
                    return Some(Attempt {
                        stage: Stage::Resize,
                        quality: self.held,
                        width: nw,
                        height: nh,
                    });
                }
                Cursor::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(r: f64) -> AspectRatio {
        AspectRatio::new(r).unwrap()
    }

    // =========================================================================
    // calculate_ratio_fit tests
    // =========================================================================

    #[test]
    fn fit_wide_region_to_square_trims_horizontally() {
        let fitted = calculate_ratio_fit(CropRegion::new(0, 0, 400, 200), ratio(1.0));
        assert_eq!(fitted, CropRegion::new(100, 0, 300, 200));
    }

    #[test]
    fn fit_tall_region_to_banner_trims_vertically() {
        // 940 / 2.35 = 400 → trim 600 tall to 400, centered
        let fitted = calculate_ratio_fit(CropRegion::new(10, 0, 950, 600), ratio(2.35));
        assert_eq!(fitted, CropRegion::new(10, 100, 950, 500));
    }

    #[test]
    fn fit_wide_region_to_banner_trims_horizontally() {
        // 2000x400: 2000/2.35 = 851 > 400, so width = 400*2.35 = 940
        let fitted = calculate_ratio_fit(CropRegion::new(0, 0, 2000, 400), ratio(2.35));
        assert_eq!(fitted.width(), 940);
        assert_eq!(fitted.height(), 400);
        assert_eq!(fitted.x1, 530);
    }

    #[test]
    fn fit_exact_region_is_unchanged() {
        let region = CropRegion::new(5, 5, 205, 105);
        assert_eq!(calculate_ratio_fit(region, ratio(2.0)), region);
    }

    #[test]
    fn fit_offsets_are_relative_to_region_origin() {
        let fitted = calculate_ratio_fit(CropRegion::new(100, 50, 300, 350), ratio(1.0));
        assert_eq!(fitted, CropRegion::new(100, 100, 300, 300));
    }

    // =========================================================================
    // clamp_region tests
    // =========================================================================

    #[test]
    fn clamp_trims_overhang() {
        let clamped = clamp_region(CropRegion::new(50, 20, 500, 400), 300, 200);
        assert_eq!(clamped, CropRegion::new(50, 20, 300, 200));
    }

    #[test]
    fn clamp_fully_outside_is_empty() {
        let clamped = clamp_region(CropRegion::new(400, 300, 500, 400), 300, 200);
        assert!(clamped.is_empty());
    }

    // =========================================================================
    // calculate_stitch_layout tests
    // =========================================================================

    #[test]
    fn layout_uses_narrower_width() {
        let layout = calculate_stitch_layout(1175, ratio(2.35), 800, ratio(1.0));
        assert_eq!(layout.width, 800);
        // 800 / 2.35 = 340.4
        assert_eq!(layout.top_height, 340);
        assert_eq!(layout.bottom_height, 800);
        assert_eq!(layout.total_height(), 1140);
    }

    #[test]
    fn layout_never_produces_zero_height() {
        let layout = calculate_stitch_layout(3, ratio(10.0), 3, ratio(1.0));
        assert_eq!(layout.top_height, 1);
    }

    // =========================================================================
    // calculate_scaled_dimensions tests
    // =========================================================================

    #[test]
    fn scaled_dimensions_are_floored() {
        assert_eq!(calculate_scaled_dimensions((1000, 800), 0.9), (900, 720));
        assert_eq!(calculate_scaled_dimensions((648, 583), 0.9), (583, 524));
    }

    // =========================================================================
    // AttemptPlan tests
    // =========================================================================

    fn plan(dims: (u32, u32), quality: u32, steps: bool) -> Vec<Attempt> {
        AttemptPlan::new(dims, Quality::new(quality), steps, CompressionPolicy::default()).collect()
    }

    #[test]
    fn plan_starts_with_direct_encode() {
        let attempts = plan((1000, 800), 80, true);
        assert_eq!(
            attempts[0],
            Attempt {
                stage: Stage::Direct,
                quality: Quality::new(80),
                width: 1000,
                height: 800,
            }
        );
    }

    #[test]
    fn plan_quality_steps_stop_above_floor() {
        let qualities: Vec<u32> = plan((1000, 800), 80, true)
            .into_iter()
            .filter(|a| a.stage == Stage::QualityStep)
            .map(|a| a.quality.value())
            .collect();
        assert_eq!(qualities, vec![75, 70, 65, 60, 55, 50, 45, 40, 35, 30, 25, 20, 15]);
    }

    #[test]
    fn plan_low_start_has_no_quality_steps() {
        let attempts = plan((1000, 800), 14, true);
        assert!(attempts.iter().all(|a| a.stage != Stage::QualityStep));
    }

    #[test]
    fn plan_without_quality_knob_goes_straight_to_resize() {
        let attempts = plan((1000, 800), 80, false);
        assert_eq!(attempts[0].stage, Stage::Direct);
        assert_eq!(attempts[1].stage, Stage::Resize);
    }

    #[test]
    fn plan_resize_uses_held_quality() {
        let attempts = plan((1000, 800), 40, true);
        let resize: Vec<&Attempt> = attempts.iter().filter(|a| a.stage == Stage::Resize).collect();
        assert!(!resize.is_empty());
        assert!(resize.iter().all(|a| a.quality.value() == 70));
    }

    #[test]
    fn plan_resize_sequence_compounds_and_stops_at_floor() {
        let dims: Vec<(u32, u32)> = plan((300, 200), 80, false)
            .into_iter()
            .filter(|a| a.stage == Stage::Resize)
            .map(|a| (a.width, a.height))
            .collect();
        // 200 → 180 → 162 → 145 → 130 → 117 → 105 → (94 stops)
        assert_eq!(
            dims,
            vec![
                (270, 180),
                (243, 162),
                (218, 145),
                (196, 130),
                (176, 117),
                (158, 105),
            ]
        );
    }

    #[test]
    fn plan_below_minimum_never_resizes() {
        let attempts = plan((50, 50), 80, true);
        assert!(attempts.iter().all(|a| a.stage != Stage::Resize));
        assert_eq!(attempts.len(), 1 + 13);
    }

    #[test]
    fn plan_is_bounded_even_with_degenerate_factor() {
        let policy = CompressionPolicy {
            scale_factor: 1.0,
            ..CompressionPolicy::default()
        };
        let attempts: Vec<Attempt> =
            AttemptPlan::new((500, 500), Quality::new(80), false, policy).collect();
        assert_eq!(attempts.len(), 1);
    }
}
