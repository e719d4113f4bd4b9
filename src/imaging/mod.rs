//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Grayscale / invert** | `DynamicImage` built-ins |
//! | **Brightness / contrast / saturation / sharpness** | [`enhance`] kernels |
//! | **Resize** | `resize_exact` + [`calculate_resize_dimensions`] |
//! | **Encode** | `image` codecs (JPEG, PNG, WebP, AVIF, GIF, BMP, TIFF, ICO) |
//! | **EXIF carry-over** | `kamadak-exif` rewrite + [`metadata::embed`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Enhance**: Per-pixel adjustment kernels
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The [`Operation`] enum and the pipeline that applies it
//! - **Metadata**: EXIF kept from the source and written back into outputs

pub mod backend;
mod calculations;
pub mod enhance;
pub mod metadata;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ErrorKind, ImageBackend};
pub use calculations::{calculate_resize_dimensions, megapixels};
pub use operations::{
    Background, Operation, OperationDefaults, apply, output_suffix, prepare_for_format,
};
pub use params::{Factor, Quality, Resample, ResizeSpec};
pub use rust_backend::RustBackend;
