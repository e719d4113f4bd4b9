//! Named conversion presets stored as JSON files.
//!
//! A preset bundles an output format and quality with an optional resize
//! box, enhancement factors and a metadata switch. Each preset lives in
//! `<presets dir>/<name>.json`; the store creates a handful of defaults on
//! first use.
//!
//! ```json
//! {
//!   "format": "webp",
//!   "quality": 85,
//!   "resize": { "width": 1920, "height": 1080, "keep_aspect": true, "resample": "lanczos" },
//!   "adjustments": { "brightness": 1.0, "contrast": 1.0, "saturation": 1.0, "sharpness": 1.0 },
//!   "strip_metadata": true,
//!   "description": "Optimized for web delivery",
//!   "created": "2024-03-09T14:05:59.123"
//! }
//! ```
//!
//! Older files written with `resize_enabled` / `max_width` / `max_height` /
//! `preserve_metadata` / `strip_gps` keys and upper-case format names are
//! still read.

use crate::formats::OutputFormat;
use crate::imaging::{Factor, Operation, Quality, ResizeSpec};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid preset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Preset '{0}' not found")]
    NotFound(String),
    #[error("Invalid preset name '{0}'")]
    InvalidName(String),
}

/// Enhancement factors; `1.0` leaves the image unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub brightness: Factor,
    pub contrast: Factor,
    pub saturation: Factor,
    pub sharpness: Factor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PresetFile")]
pub struct Preset {
    pub format: OutputFormat,
    pub quality: Quality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeSpec>,
    pub adjustments: Adjustments,
    pub strip_metadata: bool,
    /// Drop only GPS tags. Ignored when `strip_metadata` is set.
    pub strip_gps: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
}

/// On-disk shape: current keys plus the legacy ones.
#[derive(Deserialize)]
struct PresetFile {
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    quality: Quality,
    #[serde(default)]
    resize: Option<ResizeSpec>,
    #[serde(default)]
    adjustments: Adjustments,
    #[serde(default)]
    strip_metadata: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    created: Option<NaiveDateTime>,
    #[serde(default)]
    resize_enabled: bool,
    #[serde(default)]
    max_width: Option<u32>,
    #[serde(default)]
    max_height: Option<u32>,
    #[serde(default = "default_true")]
    preserve_metadata: bool,
    #[serde(default)]
    strip_gps: bool,
}

fn default_true() -> bool {
    true
}

impl From<PresetFile> for Preset {
    fn from(file: PresetFile) -> Self {
        let legacy_resize = (file.resize_enabled
            && (file.max_width.is_some() || file.max_height.is_some()))
        .then(|| ResizeSpec {
            width: file.max_width,
            height: file.max_height,
            ..ResizeSpec::fit(0, 0)
        });
        Self {
            format: file.format,
            quality: file.quality,
            resize: file.resize.or(legacy_resize),
            adjustments: file.adjustments,
            strip_metadata: file.strip_metadata || !file.preserve_metadata,
            strip_gps: file.strip_gps,
            description: file.description,
            created: file.created,
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: Quality::default(),
            resize: None,
            adjustments: Adjustments::default(),
            strip_metadata: false,
            strip_gps: false,
            description: String::new(),
            created: None,
        }
    }
}

impl Preset {
    /// Operation chain for this preset.
    ///
    /// Order: resize, then every adjustment whose factor is not `1.0`
    /// (brightness, contrast, saturation, sharpness), then metadata stripping
    /// (all of it, or just GPS).
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if let Some(spec) = self.resize {
            ops.push(Operation::Resize(spec));
        }
        let a = &self.adjustments;
        let adjustments = [
            (a.brightness, Operation::Brightness { factor: a.brightness }),
            (a.contrast, Operation::Contrast { factor: a.contrast }),
            (a.saturation, Operation::Saturation { factor: a.saturation }),
            (a.sharpness, Operation::Sharpness { factor: a.sharpness }),
        ];
        ops.extend(
            adjustments
                .into_iter()
                .filter(|(factor, _)| !factor.is_identity())
                .map(|(_, op)| op),
        );
        if self.strip_metadata {
            ops.push(Operation::StripMetadata);
        } else if self.strip_gps {
            ops.push(Operation::StripGps);
        }
        ops
    }
}

/// The presets created on first use.
pub fn default_presets() -> Vec<(&'static str, Preset)> {
    let resized = |w, h| Some(ResizeSpec::fit(w, h));
    vec![
        (
            "Web Optimization",
            Preset {
                format: OutputFormat::WebP,
                quality: Quality::new(85),
                resize: resized(1920, 1080),
                strip_metadata: true,
                description: "Optimized for web delivery: WebP, at most 1920x1080, metadata stripped"
                    .to_string(),
                ..Preset::default()
            },
        ),
        (
            "Social Media",
            Preset {
                format: OutputFormat::Jpeg,
                quality: Quality::new(90),
                resize: resized(1080, 1080),
                strip_metadata: true,
                description: "Square-friendly 1080px JPEG at high quality".to_string(),
                ..Preset::default()
            },
        ),
        (
            "Print Quality",
            Preset {
                format: OutputFormat::Tiff,
                quality: Quality::new(100),
                description: "Maximum quality for printing: lossless TIFF, full resolution"
                    .to_string(),
                ..Preset::default()
            },
        ),
        (
            "Email Friendly",
            Preset {
                format: OutputFormat::Jpeg,
                quality: Quality::new(75),
                resize: resized(1280, 720),
                strip_metadata: true,
                description: "Small file size for email attachments".to_string(),
                ..Preset::default()
            },
        ),
        (
            "Privacy Safe",
            Preset {
                format: OutputFormat::Png,
                quality: Quality::new(85),
                strip_metadata: true,
                description: "All metadata removed for privacy".to_string(),
                ..Preset::default()
            },
        ),
    ]
}

/// Platform default: `<config dir>/simple-convert/presets`.
pub fn default_preset_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("simple-convert").join("presets"))
}

fn check_name(name: &str) -> Result<(), PresetError> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name.starts_with('.');
    if bad {
        Err(PresetError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// A directory of `<name>.json` preset files.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Open (and create if needed) a preset directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PresetError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Write any default preset that is missing. Returns how many were written.
    pub fn ensure_defaults(&self) -> Result<usize, PresetError> {
        let mut written = 0;
        for (name, preset) in default_presets() {
            if !self.path(name).exists() {
                self.save(name, preset)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Preset names, sorted.
    pub fn list(&self) -> Result<Vec<String>, PresetError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<Preset, PresetError> {
        check_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save under `name`, stamping the creation time. Replaces an existing preset.
    pub fn save(&self, name: &str, mut preset: Preset) -> Result<PathBuf, PresetError> {
        check_name(name)?;
        preset.created = Some(Local::now().naive_local());
        let path = self.path(name);
        std::fs::write(&path, serde_json::to_string_pretty(&preset)?)?;
        debug!(preset = name, path = %path.display(), "saved preset");
        Ok(path)
    }

    pub fn delete(&self, name: &str) -> Result<(), PresetError> {
        check_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Copy a stored preset to an arbitrary file.
    pub fn export(&self, name: &str, destination: &Path) -> Result<(), PresetError> {
        let preset = self.load(name)?;
        std::fs::write(destination, serde_json::to_string_pretty(&preset)?)?;
        Ok(())
    }

    /// Read a preset file into the store, named after the file unless `name` is given.
    pub fn import(&self, source: &Path, name: Option<&str>) -> Result<String, PresetError> {
        let content = std::fs::read_to_string(source)?;
        let preset: Preset = serde_json::from_str(&content)?;
        let name = match name {
            Some(n) => n.to_string(),
            None => source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.save(&name, preset)?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, PresetStore) {
        let tmp = TempDir::new().unwrap();
        let store = PresetStore::open(tmp.path().join("presets")).unwrap();
        (tmp, store)
    }

    #[test]
    fn ensure_defaults_writes_once() {
        let (_tmp, store) = store();
        assert_eq!(store.ensure_defaults().unwrap(), 5);
        assert_eq!(store.ensure_defaults().unwrap(), 0);
        assert_eq!(
            store.list().unwrap(),
            vec![
                "Email Friendly",
                "Print Quality",
                "Privacy Safe",
                "Social Media",
                "Web Optimization"
            ]
        );
    }

    #[test]
    fn default_preset_values() {
        let (_tmp, store) = store();
        store.ensure_defaults().unwrap();
        let web = store.load("Web Optimization").unwrap();
        assert_eq!(web.format, OutputFormat::WebP);
        assert_eq!(web.resize, Some(ResizeSpec::fit(1920, 1080)));
        assert!(web.strip_metadata);
        assert!(web.created.is_some());
        let print = store.load("Print Quality").unwrap();
        assert_eq!(print.quality.value(), 100);
        assert!(print.operations().is_empty());
    }

    #[test]
    fn save_load_delete_cycle() {
        let (_tmp, store) = store();
        let preset = Preset {
            format: OutputFormat::Avif,
            adjustments: Adjustments {
                contrast: Factor::new(1.2),
                ..Adjustments::default()
            },
            ..Preset::default()
        };
        store.save("Mine", preset.clone()).unwrap();
        let loaded = store.load("Mine").unwrap();
        assert_eq!(loaded.format, OutputFormat::Avif);
        assert_eq!(loaded.adjustments, preset.adjustments);

        store.delete("Mine").unwrap();
        assert!(matches!(store.load("Mine"), Err(PresetError::NotFound(_))));
        assert!(matches!(store.delete("Mine"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn names_with_separators_are_rejected() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.save("../evil", Preset::default()),
            Err(PresetError::InvalidName(_))
        ));
        assert!(matches!(store.load(""), Err(PresetError::InvalidName(_))));
    }

    #[test]
    fn export_then_import_under_new_name() {
        let (tmp, store) = store();
        store.ensure_defaults().unwrap();
        let file = tmp.path().join("shared.json");
        store.export("Email Friendly", &file).unwrap();

        let name = store.import(&file, None).unwrap();
        assert_eq!(name, "shared");
        let imported = store.load("shared").unwrap();
        assert_eq!(imported.resize, Some(ResizeSpec::fit(1280, 720)));

        let name = store.import(&file, Some("Renamed")).unwrap();
        assert_eq!(name, "Renamed");
        assert!(store.list().unwrap().contains(&"Renamed".to_string()));
    }

    #[test]
    fn import_reads_legacy_layout() {
        let (tmp, store) = store();
        let file = tmp.path().join("Old Web.json");
        std::fs::write(
            &file,
            r#"{
                "format": "WEBP",
                "quality": 80,
                "resize_enabled": true,
                "max_width": 1600,
                "max_height": 900,
                "preserve_metadata": false,
                "strip_gps": true,
                "description": "old",
                "created": "2023-05-01T10:20:30.123456"
            }"#,
        )
        .unwrap();
        store.import(&file, None).unwrap();
        let preset = store.load("Old Web").unwrap();
        assert_eq!(preset.format, OutputFormat::WebP);
        assert_eq!(preset.quality.value(), 80);
        assert_eq!(preset.resize, Some(ResizeSpec::fit(1600, 900)));
        assert!(preset.strip_metadata);
        assert_eq!(preset.operations().last(), Some(&Operation::StripMetadata));
    }

    #[test]
    fn legacy_strip_gps_keeps_the_other_metadata() {
        let preset: Preset = serde_json::from_str(
            r#"{"format": "JPEG", "preserve_metadata": true, "strip_gps": true}"#,
        )
        .unwrap();
        assert!(!preset.strip_metadata);
        assert!(preset.strip_gps);
        assert_eq!(preset.operations(), vec![Operation::StripGps]);

        let saved = serde_json::to_string(&preset).unwrap();
        let back: Preset = serde_json::from_str(&saved).unwrap();
        assert_eq!(back, preset);
    }

    #[test]
    fn legacy_resize_disabled_means_no_resize() {
        let preset: Preset = serde_json::from_str(
            r#"{"format": "PNG", "resize_enabled": false, "max_width": 100, "preserve_metadata": true}"#,
        )
        .unwrap();
        assert_eq!(preset.resize, None);
        assert!(!preset.strip_metadata);
    }

    #[test]
    fn import_rejects_invalid_json() {
        let (tmp, store) = store();
        let file = tmp.path().join("broken.json");
        std::fs::write(&file, "{ not json").unwrap();
        assert!(matches!(store.import(&file, None), Err(PresetError::Json(_))));
    }

    #[test]
    fn operations_follow_fixed_order() {
        let preset = Preset {
            resize: Some(ResizeSpec::fit(800, 600)),
            adjustments: Adjustments {
                brightness: Factor::new(1.1),
                contrast: Factor::new(1.0),
                saturation: Factor::new(0.5),
                sharpness: Factor::new(2.0),
            },
            strip_metadata: true,
            ..Preset::default()
        };
        let labels: Vec<String> = preset.operations().iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            vec![
                "resize=800x600",
                "brightness=1.1",
                "saturation=0.5",
                "sharpness=2",
                "strip-metadata"
            ]
        );
    }
}
