//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are carried
//! inside [`Operation`](super::operations::Operation) values and handed to
//! the [`backend`](super::backend), which does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`Factor`]: Multiplicative enhancement factor (`1.0` = unchanged, never negative).
//! - [`Resample`]: Resampling filter used by resize.
//! - [`ResizeSpec`]: Target box, aspect handling and filter for a resize.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Enhancement factor for brightness, contrast, saturation and sharpness.
///
/// `0.0` yields the degenerate image (black, flat gray, fully desaturated,
/// fully blurred), `1.0` the original, values above `1.0` extrapolate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Factor(f32);

impl Factor {
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.max(0.0))
        } else {
            Self(1.0)
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 1.0
    }
}

impl Default for Factor {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f32> for Factor {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Factor> for f32 {
    fn from(f: Factor) -> Self {
        f.0
    }
}

/// Resampling filter for resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos,
}

impl Resample {
    pub fn filter(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Bilinear => FilterType::Triangle,
            Resample::Bicubic => FilterType::CatmullRom,
            Resample::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for Resample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resample::Nearest => "nearest",
            Resample::Bilinear => "bilinear",
            Resample::Bicubic => "bicubic",
            Resample::Lanczos => "lanczos",
        };
        f.write_str(name)
    }
}

impl FromStr for Resample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Resample::Nearest),
            "bilinear" => Ok(Resample::Bilinear),
            "bicubic" => Ok(Resample::Bicubic),
            "lanczos" => Ok(Resample::Lanczos),
            other => Err(format!(
                "unknown resample filter '{other}' (expected nearest, bilinear, bicubic or lanczos)"
            )),
        }
    }
}

/// Parameters for a resize operation.
///
/// See [`calculate_resize_dimensions`](super::calculations::calculate_resize_dimensions)
/// for how the target box is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_keep_aspect")]
    pub keep_aspect: bool,
    #[serde(default)]
    pub resample: Resample,
}

fn default_keep_aspect() -> bool {
    true
}

impl ResizeSpec {
    /// Fit inside `width`×`height`, keeping the aspect ratio.
    pub fn fit(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            keep_aspect: true,
            resample: Resample::default(),
        }
    }

    pub fn with_resample(mut self, resample: Resample) -> Self {
        self.resample = resample;
        self
    }

    pub fn is_noop(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        let bang = if self.keep_aspect { "" } else { "!" };
        write!(f, "{bang}{}x{}", edge(self.width), edge(self.height))
    }
}

impl FromStr for ResizeSpec {
    type Err = String;

    /// Parses `800x600`, `800x`, `x600` (fit, keep aspect) and `!800x600` (exact).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (keep_aspect, body) = match s.strip_prefix('!') {
            Some(rest) => (false, rest),
            None => (true, s),
        };
        let (w, h) = body
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid resize '{s}' (expected WxH, Wx or xH)"))?;
        let parse_edge = |v: &str| -> Result<Option<u32>, String> {
            if v.is_empty() {
                Ok(None)
            } else {
                v.parse::<u32>()
                    .map(Some)
                    .map_err(|_| format!("invalid resize edge '{v}' in '{s}'"))
            }
        };
        let width = parse_edge(w)?;
        let height = parse_edge(h)?;
        if width.is_none() && height.is_none() {
            return Err(format!("resize '{s}' needs at least one edge"));
        }
        Ok(Self {
            width,
            height,
            keep_aspect,
            resample: Resample::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn factor_rejects_negative_and_nan() {
        assert_eq!(Factor::new(-2.0).value(), 0.0);
        assert_eq!(Factor::new(f32::NAN).value(), 1.0);
        assert!(Factor::default().is_identity());
    }

    #[test]
    fn resample_maps_to_filters() {
        assert_eq!(Resample::Nearest.filter(), FilterType::Nearest);
        assert_eq!(Resample::Bilinear.filter(), FilterType::Triangle);
        assert_eq!(Resample::Bicubic.filter(), FilterType::CatmullRom);
        assert_eq!(Resample::Lanczos.filter(), FilterType::Lanczos3);
    }

    #[test]
    fn resample_parses_case_insensitively() {
        assert_eq!("Bicubic".parse::<Resample>().unwrap(), Resample::Bicubic);
        assert!("cubic".parse::<Resample>().is_err());
    }

    #[test]
    fn resize_spec_parses_box() {
        let spec: ResizeSpec = "800x600".parse().unwrap();
        assert_eq!(spec.width, Some(800));
        assert_eq!(spec.height, Some(600));
        assert!(spec.keep_aspect);
    }

    #[test]
    fn resize_spec_parses_single_edges() {
        let w: ResizeSpec = "800x".parse().unwrap();
        assert_eq!((w.width, w.height), (Some(800), None));
        let h: ResizeSpec = "x600".parse().unwrap();
        assert_eq!((h.width, h.height), (None, Some(600)));
    }

    #[test]
    fn resize_spec_bang_means_exact() {
        let spec: ResizeSpec = "!640x480".parse().unwrap();
        assert!(!spec.keep_aspect);
        assert_eq!(spec.to_string(), "!640x480");
    }

    #[test]
    fn resize_spec_rejects_garbage() {
        assert!("800".parse::<ResizeSpec>().is_err());
        assert!("x".parse::<ResizeSpec>().is_err());
        assert!("axb".parse::<ResizeSpec>().is_err());
    }
}
