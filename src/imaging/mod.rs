//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with content sniffing |
//! | **Crop / paste** | `image::imageops::{crop_imm, replace}` |
//! | **Resize** | `image::imageops::resize`, Lanczos3 |
//! | **Encode** | `image::codecs::{jpeg, png, gif, bmp}` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop, layout and search math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Raster**: The in-memory pixel buffer both pipelines share
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Functions combining file I/O + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
mod raster;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    Attempt, AttemptPlan, Stage, StitchLayout, calculate_ratio_fit, calculate_scaled_dimensions,
    calculate_stitch_layout, clamp_region,
};
pub use operations::{export_image, load_source, write_atomic};
pub use params::{
    AspectRatio, Background, CompressionPolicy, CompressionSpec, CropRegion, Format, PngStrategy,
    Quality,
};
pub use raster::{PixelFormat, RasterImage, SourceImage};
pub use rust_backend::{RustBackend, supported_input_extensions};
