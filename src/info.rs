//! Single-image inspection for the `info` command.

use crate::imaging::{BackendError, ImageBackend, megapixels};
use image::metadata::Orientation;
use image::{ColorType, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What `info` reports about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_size: u64,
    /// Container format sniffed from the file contents.
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
    pub megapixels: f64,
    pub color: ColorType,
    pub has_alpha: bool,
    /// EXIF orientation value (1 = upright).
    pub orientation: u8,
}

impl ImageInfo {
    pub fn format_name(&self) -> String {
        match self.format {
            Some(format) => format!("{format:?}").to_uppercase(),
            None => "unknown".to_string(),
        }
    }

    /// True when the EXIF orientation asks for a rotation or flip.
    pub fn is_rotated(&self) -> bool {
        self.orientation != Orientation::NoTransforms.to_exif()
    }
}

/// Read and decode `path`, reporting its basic properties.
pub fn inspect(backend: &(impl ImageBackend + ?Sized), path: &Path) -> Result<ImageInfo, BackendError> {
    let bytes = std::fs::read(path)?;
    let decoded = backend.decode(&bytes)?;
    let (width, height) = decoded.dimensions();
    debug!(path = %path.display(), width, height, "inspected");
    Ok(ImageInfo {
        path: path.to_path_buf(),
        file_size: bytes.len() as u64,
        format: decoded.source_format,
        width,
        height,
        megapixels: megapixels(width, height),
        color: decoded.pixels.color(),
        has_alpha: decoded.pixels.color().has_alpha(),
        orientation: decoded.orientation.to_exif(),
    })
}
