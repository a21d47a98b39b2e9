//! In-memory raster images.
//!
//! [`RasterImage`] is the one pixel type shared by both pipelines. Decoded
//! images of any color type are normalised on construction to 8-bit RGB or
//! RGBA, so every downstream operation only has two buffer layouts to handle.
//! All operations return new images; nothing mutates a caller's image except
//! [`paste`](RasterImage::paste) on a canvas the caller owns.

use super::params::{Background, Format};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, Rgb, RgbImage, Rgba, RgbaImage};

/// Pixel layout of a [`RasterImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

#[derive(Debug, Clone, PartialEq)]
enum Pixels {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

/// Owned 8-bit RGB or RGBA pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: Pixels,
}

impl RasterImage {
    /// Wrap a decoded image, converting it to RGB8 or RGBA8.
    pub fn new(image: DynamicImage) -> Self {
        let pixels = match image {
            DynamicImage::ImageRgb8(rgb) => Pixels::Rgb(rgb),
            DynamicImage::ImageRgba8(rgba) => Pixels::Rgba(rgba),
            other if other.color().has_alpha() => Pixels::Rgba(other.to_rgba8()),
            other => Pixels::Rgb(other.to_rgb8()),
        };
        Self { pixels }
    }

    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self {
            pixels: Pixels::Rgb(rgb),
        }
    }

    pub fn from_rgba(rgba: RgbaImage) -> Self {
        Self {
            pixels: Pixels::Rgba(rgba),
        }
    }

    /// Blank canvas for compositing: opaque white RGB or transparent RGBA.
    pub fn canvas(width: u32, height: u32, background: Background) -> Self {
        match background {
            Background::Opaque => {
                Self::from_rgb(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
            }
            Background::Transparent => {
                Self::from_rgba(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])))
            }
        }
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgb(img) => img.width(),
            Pixels::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgb(img) => img.height(),
            Pixels::Rgba(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match &self.pixels {
            Pixels::Rgb(_) => PixelFormat::Rgb,
            Pixels::Rgba(_) => PixelFormat::Rgba,
        }
    }

    /// Raw interleaved bytes plus the color type an encoder needs to read them.
    pub fn as_raw(&self) -> (&[u8], ExtendedColorType) {
        match &self.pixels {
            Pixels::Rgb(img) => (img.as_raw(), ExtendedColorType::Rgb8),
            Pixels::Rgba(img) => (img.as_raw(), ExtendedColorType::Rgba8),
        }
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        match &self.pixels {
            Pixels::Rgb(img) => DynamicImage::ImageRgb8(img.clone()).to_rgba8(),
            Pixels::Rgba(img) => img.clone(),
        }
    }

    /// Opaque copy of the image. Transparent pixels are composited onto white.
    pub fn to_opaque(&self) -> Self {
        match &self.pixels {
            Pixels::Rgb(img) => Self::from_rgb(img.clone()),
            Pixels::Rgba(img) => {
                let flat = RgbImage::from_fn(img.width(), img.height(), |x, y| {
                    let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
                    let alpha = a as u16;
                    let over_white =
                        |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
                    Rgb([over_white(r), over_white(g), over_white(b)])
                });
                Self::from_rgb(flat)
            }
        }
    }

    /// Copy of the `width`×`height` block starting at `(x, y)`.
    ///
    /// The caller is responsible for bounds; see [`crate::stitch`] for the
    /// checked variant.
    pub(crate) fn cropped(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        match &self.pixels {
            Pixels::Rgb(img) => {
                Self::from_rgb(imageops::crop_imm(img, x, y, width, height).to_image())
            }
            Pixels::Rgba(img) => {
                Self::from_rgba(imageops::crop_imm(img, x, y, width, height).to_image())
            }
        }
    }

    /// Lanczos3 resize to exactly `width`×`height`.
    pub(crate) fn resized(&self, width: u32, height: u32) -> Self {
        match &self.pixels {
            Pixels::Rgb(img) => {
                Self::from_rgb(imageops::resize(img, width, height, FilterType::Lanczos3))
            }
            Pixels::Rgba(img) => {
                Self::from_rgba(imageops::resize(img, width, height, FilterType::Lanczos3))
            }
        }
    }

    /// Overwrite the pixels under `other`, placed with its top-left at `(x, y)`.
    ///
    /// Pixels are replaced, not blended. On an RGB canvas the pasted image's
    /// alpha channel is dropped.
    pub fn paste(&mut self, other: &RasterImage, x: u32, y: u32) {
        match &mut self.pixels {
            Pixels::Rgb(canvas) => {
                let top = match &other.pixels {
                    Pixels::Rgb(img) => img.clone(),
                    Pixels::Rgba(img) => DynamicImage::ImageRgba8(img.clone()).to_rgb8(),
                };
                imageops::replace(canvas, &top, x as i64, y as i64);
            }
            Pixels::Rgba(canvas) => {
                imageops::replace(canvas, &other.to_rgba8(), x as i64, y as i64);
            }
        }
    }
}

/// A decoded image together with where it came from.
///
/// `encoded` holds the bytes the image was decoded from, when there were any.
/// A raster produced in memory (for example a stitched banner) has none.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub raster: RasterImage,
    pub format: Format,
    pub encoded: Option<Vec<u8>>,
}

impl SourceImage {
    pub fn decoded(raster: RasterImage, format: Format, encoded: Vec<u8>) -> Self {
        Self {
            raster,
            format,
            encoded: Some(encoded),
        }
    }

    /// Treat an in-memory raster as if it had been loaded as `format`.
    pub fn from_raster(raster: RasterImage, format: Format) -> Self {
        Self {
            raster,
            format,
            encoded: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn normalizes_grayscale_to_rgb() {
        let gray = GrayImage::from_pixel(4, 3, Luma([128]));
        let raster = RasterImage::new(DynamicImage::ImageLuma8(gray));
        assert_eq!(raster.pixel_format(), PixelFormat::Rgb);
        assert_eq!(raster.dimensions(), (4, 3));
    }

    #[test]
    fn keeps_alpha_when_source_has_it() {
        let la = DynamicImage::new_luma_a8(2, 2);
        assert_eq!(RasterImage::new(la).pixel_format(), PixelFormat::Rgba);
    }

    #[test]
    fn opaque_canvas_is_white_rgb() {
        let canvas = RasterImage::canvas(3, 2, Background::Opaque);
        assert_eq!(canvas.pixel_format(), PixelFormat::Rgb);
        let (raw, color) = canvas.as_raw();
        assert_eq!(color, ExtendedColorType::Rgb8);
        assert!(raw.iter().all(|&b| b == 255));
    }

    #[test]
    fn transparent_canvas_is_clear_rgba() {
        let canvas = RasterImage::canvas(3, 2, Background::Transparent);
        assert_eq!(canvas.pixel_format(), PixelFormat::Rgba);
        assert!(canvas.to_rgba8().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn to_opaque_composites_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let flat = RasterImage::from_rgba(rgba).to_opaque();

        assert_eq!(flat.pixel_format(), PixelFormat::Rgb);
        let (raw, _) = flat.as_raw();
        assert_eq!(raw, &[255, 255, 255, 10, 20, 30]);
    }

    #[test]
    fn paste_replaces_pixels_at_offset() {
        let mut canvas = RasterImage::canvas(4, 4, Background::Opaque);
        let red = RasterImage::from_rgb(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        canvas.paste(&red, 2, 2);

        let rgba = canvas.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(rgba.get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn paste_onto_transparent_keeps_source_alpha() {
        let mut canvas = RasterImage::canvas(2, 2, Background::Transparent);
        let half = RasterImage::from_rgba(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 255, 128])));
        canvas.paste(&half, 1, 0);

        let rgba = canvas.to_rgba8();
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 255, 128]);
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn cropped_copies_block() {
        let img = RgbImage::from_fn(10, 10, |x, y| Rgb([x as u8, y as u8, 0]));
        let block = RasterImage::from_rgb(img).cropped(3, 4, 2, 5);
        assert_eq!(block.dimensions(), (2, 5));
        let rgba = block.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [3, 4, 0, 255]);
    }

    #[test]
    fn resized_hits_exact_dimensions() {
        let img = RasterImage::from_rgb(RgbImage::new(40, 30));
        assert_eq!(img.resized(17, 9).dimensions(), (17, 9));
    }
}
