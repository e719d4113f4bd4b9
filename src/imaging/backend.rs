//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the boundary between this crate and the
//! image library: decode bytes into pixels, run one [`Operation`] over
//! pixels, encode pixels into bytes. Everything above it (the pipeline, the
//! batch runner) is backend-agnostic and unit-tested against a mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure-Rust codecs.

use super::operations::Operation;
use super::params::Quality;
use crate::formats::OutputFormat;
use image::metadata::Orientation;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Unsupported operation '{operation}': {reason}")]
    UnsupportedOperation { operation: String, reason: String },
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn unsupported(operation: &Operation, reason: impl Into<String>) -> Self {
        BackendError::UnsupportedOperation {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Decode(_) => ErrorKind::Decode,
            BackendError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            BackendError::Encode(_) => ErrorKind::Encode,
            BackendError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Failure category recorded on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Corrupt or unsupported source file.
    Decode,
    /// Operation invalid for the image's colour model.
    UnsupportedOperation,
    /// Target format rejected the pixels.
    Encode,
    /// Read, write or permission failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Decode => "decode error",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::Encode => "encode error",
            ErrorKind::Io => "I/O error",
        };
        f.write_str(name)
    }
}

/// A decoded image plus the metadata the pipeline still needs.
///
/// Decoders apply the EXIF orientation to `pixels` before returning, so
/// every operation sees the picture upright. `orientation` keeps the value
/// the source asked for; `exif` keeps the rest of the source's EXIF with
/// its orientation reset to 1 (see [`metadata`](super::metadata)).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    pub orientation: Orientation,
    pub source_format: Option<ImageFormat>,
    /// Raw TIFF-structured EXIF to write back into JPEG and WebP outputs.
    pub exif: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            orientation: Orientation::NoTransforms,
            source_format: None,
            exif: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync` so a single backend can be shared with
/// the batch worker thread behind an `Arc`.
pub trait ImageBackend: Send + Sync {
    /// Decode an encoded file into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Apply one operation, consuming the input.
    fn transform(
        &self,
        image: DecodedImage,
        operation: &Operation,
    ) -> Result<DecodedImage, BackendError>;

    /// Encode pixels into the target format.
    ///
    /// Callers are expected to run
    /// [`prepare_for_format`](super::operations::prepare_for_format) first;
    /// encoders reject colour types their format cannot hold.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
