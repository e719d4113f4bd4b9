//! CLI output formatting.
//!
//! Every command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions are pure, so
//! tests check exact lines without capturing stdout.
//!
//! # Batch Progress
//!
//! ```text
//! Converting 3 images
//! 001 a.png → a - Inverted.png (12.0 KB → 9.1 KB)
//! 002 corrupt.png failed: decode error: Format error decoding Png
//! 003 b.jpg → b - Inverted.png (40.2 KB → 88.0 KB)
//! Paused
//! Resumed
//!
//! 2 converted, 1 failed, 0 skipped (of 3)
//! ```
//!
//! Progress lines use the 1-based queue position so the order matches the
//! input even when the batch is stopped early.

use crate::batch::{BatchEvent, BatchSummary, STOPPED_REASON};
use crate::formats::OutputFormat;
use crate::info::ImageInfo;
use crate::preset::Preset;
use crate::types::{JobStatus, OperationResult, RunState};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 0-based queue index as 1-based, 3-digit zero-padded.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count: `512 B`, `12.0 KB`, `3.4 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// One line describing a finished job.
pub fn format_result(result: &OperationResult) -> String {
    let index = format_index(result.index);
    let source = file_name(&result.source);
    match result.status {
        JobStatus::Succeeded => {
            let output = result
                .output
                .as_deref()
                .map(file_name)
                .unwrap_or_default();
            format!(
                "{index} {source} \u{2192} {output} ({} \u{2192} {})",
                format_size(result.input_bytes),
                format_size(result.output_bytes)
            )
        }
        JobStatus::Failed => match &result.failure {
            Some(failure) => format!("{index} {source} failed: {}: {}", failure.kind, failure.detail),
            None => format!("{index} {source} failed"),
        },
        JobStatus::Skipped => format!(
            "{index} {source} skipped: {}",
            result.skip_reason.as_deref().unwrap_or("no reason given")
        ),
        JobStatus::Pending | JobStatus::Running => format!("{index} {source} {:?}", result.status),
    }
}

// ============================================================================
// Batch events
// ============================================================================

/// Format a single batch event as display lines.
///
/// `ItemStarted` and `Progress` produce nothing; the `ItemDone` line already
/// carries the position.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Converting {total} {noun}")]
        }
        BatchEvent::ItemStarted { .. } | BatchEvent::Progress { .. } => Vec::new(),
        BatchEvent::ItemDone(result) => vec![format_result(result)],
        // The worker reports Running only when leaving a pause. Terminal
        // states are covered by the summary that follows.
        BatchEvent::StateChanged(state) => match state {
            RunState::Paused => vec!["Paused".to_string()],
            RunState::Running => vec!["Resumed".to_string()],
            _ => Vec::new(),
        },
        BatchEvent::Finished(summary) => {
            let mut lines = vec![String::new()];
            lines.extend(format_summary(summary));
            lines
        }
    }
}

/// Closing lines of a batch: the counts, plus a note when stopped early.
pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} converted, {} failed, {} skipped (of {})",
        summary.succeeded, summary.failed, summary.skipped, summary.total
    )];
    if summary.state == RunState::Stopped {
        let not_run = summary
            .results
            .iter()
            .filter(|r| r.skip_reason.as_deref() == Some(STOPPED_REASON))
            .count();
        lines.push(format!("Stopped early; {not_run} image(s) not processed"));
    }
    lines
}

pub fn print_batch_event(event: &BatchEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// info / formats / presets
// ============================================================================

pub fn format_info(info: &ImageInfo) -> Vec<String> {
    vec![
        info.path.display().to_string(),
        format!("    Size: {}", format_size(info.file_size)),
        format!("    Format: {}", info.format_name()),
        format!(
            "    Dimensions: {}x{} ({:.1} MP)",
            info.width, info.height, info.megapixels
        ),
        format!("    Color: {:?}", info.color),
        format!(
            "    Transparency: {}",
            if info.has_alpha { "yes" } else { "no" }
        ),
        format!("    Orientation: {}", info.orientation),
    ]
}

pub fn print_info(info: &ImageInfo) {
    for line in format_info(info) {
        println!("{}", line);
    }
}

/// Table of writable formats.
///
/// ```text
/// PNG   .png   alpha  -        Lossless. Best for graphics, ...
/// JPEG  .jpg   -      quality  Best for photos. ... (70-95, 85 recommended)
/// ```
pub fn format_formats() -> Vec<String> {
    OutputFormat::ALL
        .iter()
        .map(|f| {
            let alpha = if f.supports_transparency() { "alpha" } else { "-" };
            let mut description = f.description().to_string();
            if f.supports_quality() {
                let (min, recommended, max) = f.recommended_quality();
                description.push_str(&format!(" ({min}-{max}, {recommended} recommended)"));
            }
            format!(
                "{:<5} {:<6} {:<6} {:<8} {}",
                f.name(),
                format!(".{}", f.extension()),
                alpha,
                if f.supports_quality() { "quality" } else { "-" },
                description
            )
        })
        .collect()
}

pub fn print_formats() {
    for line in format_formats() {
        println!("{}", line);
    }
}

/// One line per preset name with its description.
pub fn format_preset_list(presets: &[(String, Preset)]) -> Vec<String> {
    if presets.is_empty() {
        return vec!["No presets".to_string()];
    }
    presets
        .iter()
        .map(|(name, preset)| {
            if preset.description.is_empty() {
                name.clone()
            } else {
                format!("{name}: {}", preset.description)
            }
        })
        .collect()
}

/// Full detail for one preset, including the operations it expands to.
pub fn format_preset(name: &str, preset: &Preset) -> Vec<String> {
    let mut lines = vec![name.to_string()];
    if !preset.description.is_empty() {
        lines.push(format!("    Description: {}", preset.description));
    }
    lines.push(format!("    Format: {}", preset.format));
    lines.push(format!("    Quality: {}", preset.quality.value()));
    if let Some(resize) = preset.resize {
        lines.push(format!("    Resize: {resize}"));
    }
    let a = &preset.adjustments;
    for (label, factor) in [
        ("Brightness", a.brightness),
        ("Contrast", a.contrast),
        ("Saturation", a.saturation),
        ("Sharpness", a.sharpness),
    ] {
        if !factor.is_identity() {
            lines.push(format!("    {label}: {}", factor.value()));
        }
    }
    let metadata = if preset.strip_metadata {
        "stripped"
    } else if preset.strip_gps {
        "kept without GPS"
    } else {
        "kept"
    };
    lines.push(format!("    Metadata: {metadata}"));
    if let Some(created) = preset.created {
        lines.push(format!("    Created: {}", created.format("%Y-%m-%d %H:%M:%S")));
    }
    let ops: Vec<String> = preset.operations().iter().map(|op| op.to_string()).collect();
    if !ops.is_empty() {
        lines.push(format!("    Operations: {}", ops.join(", ")));
    }
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
