//! The transform pipeline.
//!
//! An [`Operation`] says *what* to do to an image; the backend does it.
//! [`apply`] threads an image through an ordered list of operations, left to
//! right, handing ownership from one step to the next. [`prepare_for_format`]
//! is the last step before encode: it flattens alpha for formats that cannot
//! hold it and coerces the colour type into what the encoder accepts.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::enhance::flatten_alpha;
use super::params::{Factor, Resample, ResizeSpec};
use crate::formats::OutputFormat;
use image::{ColorType, DynamicImage, Rgb};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Background used when flattening alpha, as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background(pub [u8; 3]);

impl Background {
    pub fn rgb(self) -> Rgb<u8> {
        Rgb(self.0)
    }
}

impl Default for Background {
    fn default() -> Self {
        Self([255, 255, 255])
    }
}

/// One step of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    Grayscale,
    Invert,
    Brightness { factor: Factor },
    Contrast { factor: Factor },
    Saturation { factor: Factor },
    Sharpness { factor: Factor },
    Resize(ResizeSpec),
    /// Coerce to the target format's colour model now rather than at encode.
    Convert {
        format: OutputFormat,
        #[serde(default)]
        background: Background,
    },
    /// Drop the EXIF carried from the source. The orientation is already
    /// in the pixels, so nothing visible changes.
    StripMetadata,
    /// Drop only the GPS tags from the carried EXIF.
    StripGps,
}

/// Values filled in when an operation string leaves them out.
#[derive(Debug, Clone, Copy)]
pub struct OperationDefaults {
    pub format: OutputFormat,
    pub background: Background,
    pub resample: Resample,
    /// Whether a plain `WxH` keeps the aspect ratio. `!WxH` is always exact.
    pub keep_aspect: bool,
}

impl Default for OperationDefaults {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            background: Background::default(),
            resample: Resample::default(),
            keep_aspect: true,
        }
    }
}

impl Operation {
    /// Filename suffix for operations that name their output.
    ///
    /// Adjustments, resize, convert and metadata stripping are silent.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Operation::Grayscale => Some("Grayscale"),
            Operation::Invert => Some("Inverted"),
            _ => None,
        }
    }

    /// Parse a command-line operation.
    ///
    /// Accepted forms:
    /// - `grayscale`, `invert`, `strip-metadata`, `strip-gps`
    /// - `brightness=1.2`, `contrast=0.8`, `saturation=1.5`, `sharpness=2`
    /// - `resize=800x600`, `resize=800x`, `resize=x600`, `resize=!800x600`
    /// - `convert` (uses the default format) or `convert=jpeg`
    pub fn parse(input: &str, defaults: &OperationDefaults) -> std::result::Result<Self, String> {
        let (name, value) = match input.split_once('=') {
            Some((n, v)) => (n.trim(), Some(v.trim())),
            None => (input.trim(), None),
        };
        let factor = |v: Option<&str>| -> std::result::Result<Factor, String> {
            let v = v.ok_or_else(|| format!("'{name}' needs a factor, e.g. {name}=1.2"))?;
            let f: f32 = v
                .parse()
                .map_err(|_| format!("invalid factor '{v}' for {name}"))?;
            if !f.is_finite() || f < 0.0 {
                return Err(format!("factor for {name} must be >= 0, got {v}"));
            }
            Ok(Factor::new(f))
        };
        let no_value = |op: Operation| match value {
            Some(v) => Err(format!("'{name}' takes no value (got '{v}')")),
            None => Ok(op),
        };

        match name.to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" | "gray" | "grey" => no_value(Operation::Grayscale),
            "invert" => no_value(Operation::Invert),
            "strip-metadata" | "strip" => no_value(Operation::StripMetadata),
            "strip-gps" => no_value(Operation::StripGps),
            "brightness" => Ok(Operation::Brightness {
                factor: factor(value)?,
            }),
            "contrast" => Ok(Operation::Contrast {
                factor: factor(value)?,
            }),
            "saturation" => Ok(Operation::Saturation {
                factor: factor(value)?,
            }),
            "sharpness" => Ok(Operation::Sharpness {
                factor: factor(value)?,
            }),
            "resize" => {
                let v = value.ok_or("'resize' needs a size, e.g. resize=800x600")?;
                let mut spec: ResizeSpec = v.parse()?;
                if !v.starts_with('!') {
                    spec.keep_aspect = defaults.keep_aspect;
                }
                Ok(Operation::Resize(spec.with_resample(defaults.resample)))
            }
            "convert" => {
                let format = match value {
                    Some(v) => v.parse()?,
                    None => defaults.format,
                };
                Ok(Operation::Convert {
                    format,
                    background: defaults.background,
                })
            }
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Grayscale => f.write_str("grayscale"),
            Operation::Invert => f.write_str("invert"),
            Operation::Brightness { factor } => write!(f, "brightness={}", factor.value()),
            Operation::Contrast { factor } => write!(f, "contrast={}", factor.value()),
            Operation::Saturation { factor } => write!(f, "saturation={}", factor.value()),
            Operation::Sharpness { factor } => write!(f, "sharpness={}", factor.value()),
            Operation::Resize(spec) => write!(f, "resize={spec}"),
            Operation::Convert { format, .. } => write!(f, "convert={}", format.key()),
            Operation::StripMetadata => f.write_str("strip-metadata"),
            Operation::StripGps => f.write_str("strip-gps"),
        }
    }
}

/// Suffix of the last operation that names its output, if any.
///
/// `[grayscale, invert]` → `Inverted`: the file holds the composition, the
/// name reports the final named step.
pub fn output_suffix(operations: &[Operation]) -> Option<&'static str> {
    operations.iter().rev().find_map(Operation::suffix)
}

/// Apply `operations` in order. Zero operations returns the input untouched.
pub fn apply(
    backend: &(impl ImageBackend + ?Sized),
    image: DecodedImage,
    operations: &[Operation],
) -> Result<DecodedImage> {
    operations.iter().try_fold(image, |image, operation| {
        debug!(%operation, "applying");
        backend.transform(image, operation)
    })
}

/// Make `image` encodable as `format`.
///
/// Flat formats get their alpha composited onto `background`; the colour
/// type is then narrowed to one the format's encoder accepts. Pixel data is
/// otherwise unchanged.
pub fn prepare_for_format(
    image: DynamicImage,
    format: OutputFormat,
    background: Background,
) -> DynamicImage {
    let image = if format.supports_transparency() {
        image
    } else {
        flatten_alpha(image, background.rgb())
    };
    let color = image.color();

    if format.supports_16_bit() {
        return match color {
            ColorType::L8
            | ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::L16
            | ColorType::Rgb16
            | ColorType::Rgba16 => image,
            ColorType::La8 if format == OutputFormat::Png => image,
            ColorType::La16 if format == OutputFormat::Png => image,
            ColorType::La16 => DynamicImage::ImageRgba16(image.into_rgba16()),
            ColorType::Rgb32F => DynamicImage::ImageRgb16(image.into_rgb16()),
            _ => DynamicImage::ImageRgba8(image.into_rgba8()),
        };
    }

    match format {
        OutputFormat::Jpeg | OutputFormat::Bmp => {
            if color.has_color() {
                narrow_rgb8(image)
            } else {
                narrow_luma8(image)
            }
        }
        OutputFormat::Gif | OutputFormat::Ico => narrow_rgba8(image),
        _ => {
            if color.has_alpha() {
                narrow_rgba8(image)
            } else {
                narrow_rgb8(image)
            }
        }
    }
}

fn narrow_rgb8(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.into_rgb8()),
    }
}

fn narrow_rgba8(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) => image,
        other => DynamicImage::ImageRgba8(other.into_rgba8()),
    }
}

fn narrow_luma8(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.into_luma8()),
    }
}
