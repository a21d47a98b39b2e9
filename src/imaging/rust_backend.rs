//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP) | `image::ImageReader` with content sniffing |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha flattened onto white) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (best compression, adaptive filter) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` |
//! | Encode → BMP | `image::codecs::bmp::BmpEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::params::{Format, Quality};
use super::raster::{PixelFormat, RasterImage, SourceImage};
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageReader};
use std::io::Cursor;

/// Extensions whose decoders are compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// NeuQuant sampling speed for GIF palettes (1 = slowest, 30 = fastest).
const GIF_QUANTIZER_SPEED: i32 = 10;

/// Returns the set of image file extensions the batch driver picks up.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_failed(format: Format) -> impl FnOnce(image::ImageError) -> BackendError {
    move |e| BackendError::Encode(format!("{format} encode failed: {e}"))
}

fn encode_jpeg(
    image: &RasterImage,
    quality: Quality,
    buf: &mut Vec<u8>,
) -> Result<(), BackendError> {
    // JPEG has no alpha channel.
    let opaque;
    let image = match image.pixel_format() {
        PixelFormat::Rgb => image,
        PixelFormat::Rgba => {
            opaque = image.to_opaque();
            &opaque
        }
    };
    let (raw, color) = image.as_raw();
    JpegEncoder::new_with_quality(buf, quality.value() as u8)
        .write_image(raw, image.width(), image.height(), color)
        .map_err(encode_failed(Format::Jpeg))
}

fn encode_png(image: &RasterImage, buf: &mut Vec<u8>) -> Result<(), BackendError> {
    let (raw, color) = image.as_raw();
    PngEncoder::new_with_quality(buf, CompressionType::Best, PngFilter::Adaptive)
        .write_image(raw, image.width(), image.height(), color)
        .map_err(encode_failed(Format::Png))
}

fn encode_gif(image: &RasterImage, buf: &mut Vec<u8>) -> Result<(), BackendError> {
    let rgba = image.to_rgba8();
    // The trailer is written when the encoder is dropped, at the end of this function.
    let mut encoder = GifEncoder::new_with_speed(buf, GIF_QUANTIZER_SPEED);
    encoder
        .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(encode_failed(Format::Gif))
}

fn encode_bmp(image: &RasterImage, buf: &mut Vec<u8>) -> Result<(), BackendError> {
    let (raw, color) = image.as_raw();
    BmpEncoder::new(buf)
        .write_image(raw, image.width(), image.height(), color)
        .map_err(encode_failed(Format::Bmp))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: Vec<u8>) -> Result<SourceImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(BackendError::Io)?;
        let format = reader
            .format()
            .and_then(Format::from_image_format)
            .ok_or_else(|| {
                BackendError::Decode("unrecognized or unsupported image format".to_string())
            })?;
        let pixels = reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("{format}: {e}")))?;
        Ok(SourceImage::decoded(RasterImage::new(pixels), format, bytes))
    }

    fn encode(
        &self,
        image: &RasterImage,
        format: Format,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        match format {
            Format::Jpeg => encode_jpeg(image, quality, &mut buf)?,
            Format::Png => encode_png(image, &mut buf)?,
            Format::Gif => encode_gif(image, &mut buf)?,
            Format::Bmp => encode_bmp(image, &mut buf)?,
        }
        Ok(buf)
    }

    fn resize(
        &self,
        image: &RasterImage,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::Encode(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        Ok(image.resized(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_rgb, noise_rgb};
    use image::{Rgba, RgbaImage};

    #[test]
    fn supported_extensions_cover_all_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "gif", "bmp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn jpeg_encode_decode_keeps_dimensions_and_format() {
        let backend = RustBackend::new();
        let bytes = backend
            .encode(&gradient_rgb(120, 80), Format::Jpeg, Quality::new(85))
            .unwrap();

        let decoded = backend.decode(bytes.clone()).unwrap();
        assert_eq!(decoded.format, Format::Jpeg);
        assert_eq!(decoded.raster.dimensions(), (120, 80));
        assert_eq!(decoded.encoded.as_deref(), Some(bytes.as_slice()));
    }

    #[test]
    fn jpeg_quality_affects_size() {
        let backend = RustBackend::new();
        let image = noise_rgb(128, 128);
        let high = backend.encode(&image, Format::Jpeg, Quality::new(95)).unwrap();
        let low = backend.encode(&image, Format::Jpeg, Quality::new(20)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_encode_flattens_rgba() {
        let backend = RustBackend::new();
        let rgba = RasterImage::from_rgba(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])));
        let bytes = backend.encode(&rgba, Format::Jpeg, Quality::new(90)).unwrap();

        let decoded = backend.decode(bytes).unwrap();
        assert_eq!(decoded.raster.pixel_format(), PixelFormat::Rgb);
        // Fully transparent becomes (near) white after flattening.
        let px = decoded.raster.to_rgba8().get_pixel(8, 8).0;
        assert!(px[0] > 245 && px[1] > 245 && px[2] > 245, "got {px:?}");
    }

    #[test]
    fn png_roundtrip_keeps_alpha() {
        let backend = RustBackend::new();
        let rgba = RasterImage::from_rgba(RgbaImage::from_pixel(10, 6, Rgba([1, 2, 3, 100])));
        let bytes = backend.encode(&rgba, Format::Png, Quality::default()).unwrap();

        let decoded = backend.decode(bytes).unwrap();
        assert_eq!(decoded.format, Format::Png);
        assert_eq!(decoded.raster, rgba);
    }

    #[test]
    fn bmp_and_gif_decode_with_detected_format() {
        let backend = RustBackend::new();
        let image = gradient_rgb(24, 12);

        let bmp = backend.encode(&image, Format::Bmp, Quality::default()).unwrap();
        assert_eq!(backend.decode(bmp).unwrap().format, Format::Bmp);

        let gif = backend.encode(&image, Format::Gif, Quality::default()).unwrap();
        let decoded = backend.decode(gif).unwrap();
        assert_eq!(decoded.format, Format::Gif);
        assert_eq!(decoded.raster.dimensions(), (24, 12));
    }

    #[test]
    fn gif_encode_uses_sampled_quantizer() {
        let image = noise_rgb(64, 48);
        let bytes = RustBackend::new()
            .encode(&image, Format::Gif, Quality::default())
            .unwrap();

        let rgba = image.to_rgba8();
        let mut expected = Vec::new();
        GifEncoder::new_with_speed(&mut expected, 10)
            .encode(rgba.as_raw(), 64, 48, ExtendedColorType::Rgba8)
            .unwrap();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.decode(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_hits_exact_dimensions() {
        let backend = RustBackend::new();
        let resized = backend.resize(&gradient_rgb(200, 100), 90, 45).unwrap();
        assert_eq!(resized.dimensions(), (90, 45));
    }

    #[test]
    fn resize_to_zero_errors() {
        let backend = RustBackend::new();
        assert!(backend.resize(&gradient_rgb(20, 20), 0, 10).is_err());
    }
}
