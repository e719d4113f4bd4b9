//! Shared test utilities: synthetic images written into temp directories.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let a = write_png(&tmp.path().join("a.png"), 16, 16);
//! let bad = write_corrupt(&tmp.path().join("corrupt.png"));
//! ```

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Deterministic RGBA gradient with partially transparent pixels.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
            if (x + y) % 2 == 0 { 255 } else { 128 },
        ])
    })
}

pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Write an RGBA PNG and return its path.
pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    gradient_rgba(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
    path.to_path_buf()
}

/// Write an RGB JPEG and return its path.
pub fn write_rgb_jpeg(path: &Path, width: u32, height: u32) -> PathBuf {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
    path.to_path_buf()
}

/// Write bytes that no decoder accepts.
pub fn write_corrupt(path: &Path) -> PathBuf {
    std::fs::write(path, b"this is not an image").unwrap();
    path.to_path_buf()
}
