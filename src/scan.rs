//! Source discovery.
//!
//! Turns the paths given on the command line into an ordered list of image
//! files. Files are taken as given; directories contribute the supported
//! images they contain, sorted by file name.
//!
//! ```text
//! photos/                 scan(["photos"], recursive = false)
//! ├── b.jpg          →    photos/a.png
//! ├── a.png               photos/b.jpg
//! ├── notes.txt
//! └── 2023/               (only with recursive = true)
//!     └── c.webp     →    photos/2023/c.webp
//! ```
//!
//! Directory contents are listed before their subdirectories are descended
//! into, so output order does not depend on how the filesystem returns entries.

use crate::formats::is_supported_input;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Collect source images from files and directories, in input order.
///
/// Duplicates are dropped (first occurrence wins). Explicit files with an
/// unsupported extension are skipped with a warning.
pub fn collect_sources(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    let mut push = |path: PathBuf| {
        if seen.insert(path.clone()) {
            sources.push(path);
        }
    };

    for input in inputs {
        if input.is_file() {
            if is_supported_input(input) {
                push(input.clone());
            } else {
                warn!(path = %input.display(), "not a supported image, ignoring");
            }
        } else if input.is_dir() {
            for path in scan_dir(input, recursive)? {
                push(path);
            }
        } else {
            return Err(ScanError::NotFound(input.clone()));
        }
    }

    debug!(count = sources.len(), "collected sources");
    Ok(sources)
}

/// Supported images inside `dir`, sorted by name.
pub fn scan_dir(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by(|a, b| {
            // Files before directories, then by name.
            let a_dir = a.file_type().is_dir();
            let b_dir = b.file_type().is_dir();
            a_dir.cmp(&b_dir).then_with(|| a.file_name().cmp(b.file_name()))
        });

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
