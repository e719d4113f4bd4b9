//! Application configuration.
//!
//! Handles loading, validating, and merging `simple-convert.toml`. Stock
//! defaults are the base layer; a user file only needs the keys it wants to
//! change.
//!
//! ## Config File Location
//!
//! 1. `--config <path>` on the command line, or
//! 2. `simple-convert.toml` in the working directory, if present.
//!
//! Without either, the stock defaults are used.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "png"                 # png, jpeg, webp, avif, gif, bmp, tiff, ico
//! quality = 85                   # 1-100, used by JPEG and AVIF
//! naming = "{name}{suffix}{ext}" # see the naming module for placeholders
//! on_collision = "auto-increment" # overwrite, auto-increment or skip
//! background = [255, 255, 255]   # used when flattening alpha
//!
//! [resize]
//! resample = "lanczos"           # nearest, bilinear, bicubic, lanczos
//! keep_aspect = true             # plain WxH fits inside the box
//!
//! [batch]
//! event_capacity = 64            # progress events buffered for the UI
//!
//! [presets]
//! directory = ""                 # empty = platform config dir
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only switch the default output to JPEG
//! [output]
//! format = "jpeg"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::formats::OutputFormat;
use crate::imaging::{Background, OperationDefaults, Quality, Resample};
use crate::naming;
use crate::preset::default_preset_dir;
use crate::types::{CollisionPolicy, OutputSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "simple-convert.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `simple-convert.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Output format, quality and file naming.
    pub output: OutputConfig,
    /// Defaults for `resize=` operations.
    pub resize: ResizeConfig,
    /// Batch runner settings.
    pub batch: BatchConfig,
    /// Where presets are stored.
    pub presets: PresetsConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        naming::validate_template(&self.output.naming)
            .map_err(|e| ConfigError::Validation(format!("output.naming: {e}")))?;
        if self.batch.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "batch.event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Output settings for a batch. `output_dir = None` writes beside the sources.
    pub fn output_settings(&self, output_dir: Option<PathBuf>) -> OutputSettings {
        OutputSettings {
            format: self.output.format,
            quality: Quality::new(self.output.quality),
            output_dir,
            naming: self.output.naming.clone(),
            on_collision: self.output.on_collision,
            background: Background(self.output.background),
        }
    }

    pub fn operation_defaults(&self) -> OperationDefaults {
        OperationDefaults {
            format: self.output.format,
            background: Background(self.output.background),
            resample: self.resize.resample,
            keep_aspect: self.resize.keep_aspect,
        }
    }

    /// Configured preset directory, or the platform default.
    pub fn preset_dir(&self) -> Option<PathBuf> {
        if self.presets.directory.trim().is_empty() {
            default_preset_dir()
        } else {
            Some(PathBuf::from(&self.presets.directory))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Encoding quality for lossy formats (1-100).
    pub quality: u32,
    /// Filename template.
    pub naming: String,
    pub on_collision: CollisionPolicy,
    /// `[r, g, b]` composited under transparent pixels for flat formats.
    pub background: [u8; 3],
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 85,
            naming: naming::DEFAULT_TEMPLATE.to_string(),
            on_collision: CollisionPolicy::AutoIncrement,
            background: [255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub resample: Resample,
    pub keep_aspect: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            resample: Resample::Lanczos,
            keep_aspect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Capacity of the bounded progress-event channel.
    pub event_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            event_capacity: crate::batch::DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetsConfig {
    /// Preset directory. Empty means `<config dir>/simple-convert/presets`.
    pub directory: String,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Which file a config would be read from.
///
/// An explicit path is always used (and must exist); otherwise
/// `simple-convert.toml` in `cwd` is used when present.
pub fn config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = cwd.join(CONFIG_FILE_NAME);
            candidate.exists().then_some(candidate)
        }
    }
}

/// Load the configuration: stock defaults with the user file merged on top.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = match config_path(explicit, cwd) {
        Some(path) => Some(load_raw_config(&path)?),
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-convert configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from --config <path>, or from simple-convert.toml in the
# working directory. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Target format: png, jpeg, webp, avif, gif, bmp, tiff, ico.
format = "png"

# Encoding quality for JPEG and AVIF (1 = smallest, 100 = best).
quality = 85

# Output filename template. Placeholders:
#   {name}   source file name without extension
#   {suffix} " - Grayscale" / " - Inverted" for the last named operation
#   {ext}    output extension with the dot (".png")
#   {format} output extension without the dot ("png")
#   {date}   YYYY-MM-DD      {time}  HH-MM-SS
#   {###}    first free sequence number, zero-padded
naming = "{name}{suffix}{ext}"

# When the output file exists: "overwrite", "auto-increment" or "skip".
on_collision = "auto-increment"

# Background [r, g, b] for formats without transparency (JPEG, BMP).
background = [255, 255, 255]

# ---------------------------------------------------------------------------
# Resize defaults
# ---------------------------------------------------------------------------
[resize]
# Resampling filter: nearest, bilinear, bicubic, lanczos.
resample = "lanczos"

# Keep the aspect ratio for plain WxH sizes. "!WxH" always resizes exactly.
keep_aspect = true

# ---------------------------------------------------------------------------
# Batch processing
# ---------------------------------------------------------------------------
[batch]
# Progress events buffered between the worker and the terminal.
event_capacity = 64

# ---------------------------------------------------------------------------
# Presets
# ---------------------------------------------------------------------------
[presets]
# Directory holding <name>.json presets.
# Empty = the platform config directory (e.g. ~/.config/simple-convert/presets).
directory = ""
"##
}
