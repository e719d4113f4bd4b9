//! Output format registry.
//!
//! One row per format we can *write*. Each row knows its canonical extension,
//! the aliases it is recognised by, whether it carries an alpha channel,
//! whether it honours a quality setting, and which [`image::ImageFormat`]
//! encodes it.
//!
//! | Format | Ext | Alpha | Quality | Notes |
//! |---|---|---|---|---|
//! | PNG | `.png` | yes | no | lossless, 8/16 bit |
//! | JPEG | `.jpg` | no | yes | alpha is flattened |
//! | WebP | `.webp` | yes | no | lossless encoder only |
//! | AVIF | `.avif` | yes | yes | rav1e, speed 6 |
//! | GIF | `.gif` | yes | no | 256-colour palette |
//! | BMP | `.bmp` | no | no | alpha is flattened |
//! | TIFF | `.tiff` | yes | no | lossless, 8/16 bit |
//! | ICO | `.ico` | yes | no | at most 256×256 |
//!
//! HEIC and PDF are absent: there is no pure-Rust codec for them in the
//! `image` crate.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Extensions the scanner accepts as source images.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "ico",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Avif,
    Gif,
    Bmp,
    Tiff,
    Ico,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::WebP,
        OutputFormat::Avif,
        OutputFormat::Gif,
        OutputFormat::Bmp,
        OutputFormat::Tiff,
        OutputFormat::Ico,
    ];

    /// Display name, as shown in listings.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Avif => "AVIF",
            OutputFormat::Gif => "GIF",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Ico => "ICO",
        }
    }

    /// Canonical extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Ico => "ico",
        }
    }

    /// Lowercase key used in config and preset files.
    pub fn key(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            other => other.extension(),
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Png => &["png"],
            OutputFormat::Jpeg => &["jpg", "jpeg"],
            OutputFormat::WebP => &["webp"],
            OutputFormat::Avif => &["avif"],
            OutputFormat::Gif => &["gif"],
            OutputFormat::Bmp => &["bmp"],
            OutputFormat::Tiff => &["tif", "tiff"],
            OutputFormat::Ico => &["ico"],
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Avif => ImageFormat::Avif,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Ico => ImageFormat::Ico,
        }
    }

    pub fn supports_transparency(self) -> bool {
        !matches!(self, OutputFormat::Jpeg | OutputFormat::Bmp)
    }

    pub fn supports_quality(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Avif)
    }

    /// Whether EXIF carried over from the source is written into outputs.
    pub fn carries_exif(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::WebP)
    }

    /// Whether the encoder accepts 16-bit channels.
    pub fn supports_16_bit(self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::Tiff)
    }

    pub fn description(self) -> &'static str {
        match self {
            OutputFormat::Png => {
                "Lossless. Best for graphics, screenshots and images with transparency."
            }
            OutputFormat::Jpeg => "Best for photos. Lossy compression with a good quality/size ratio.",
            OutputFormat::WebP => "Modern web format. Written losslessly, keeps transparency.",
            OutputFormat::Avif => "AV1-based format. Smaller than JPEG at equal quality.",
            OutputFormat::Gif => "Limited to 256 colours. Supports transparency.",
            OutputFormat::Bmp => "Uncompressed. Large files but universally readable.",
            OutputFormat::Tiff => "Professional lossless format. Large files.",
            OutputFormat::Ico => "Windows icon format, at most 256x256 pixels.",
        }
    }

    /// Recommended quality range `(min, default, max)`.
    pub fn recommended_quality(self) -> (u32, u32, u32) {
        match self {
            OutputFormat::Jpeg => (70, 85, 95),
            OutputFormat::Avif => (70, 80, 90),
            _ => (1, 85, 100),
        }
    }

    /// Detect a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.aliases().contains(&ext.as_str()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<OutputFormat> for &'static str {
    fn from(format: OutputFormat) -> Self {
        format.key()
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    /// Accepts display names and extensions: `PNG`, `jpeg`, `jpg`, `tif`, …
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(&needle) || f.aliases().contains(&needle.as_str()))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|f| f.extension()).collect();
                format!("unknown format '{s}' (expected one of {})", names.join(", "))
            })
    }
}

/// Whether `path` has an extension the scanner treats as a source image.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_INPUT_EXTENSIONS.contains(&e.as_str())
        })
}
