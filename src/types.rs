//! Shared types passed between the CLI, the batch runner and the output layer.
//!
//! Jobs flow in, results flow out. The runner owns jobs while it processes
//! them; everything handed back to callers is a clone.

use crate::formats::OutputFormat;
use crate::imaging::{Background, ErrorKind, Operation, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Replace the existing file (logged as a warning).
    Overwrite,
    /// Write `name (1).ext`, `name (2).ext`, … instead.
    #[default]
    AutoIncrement,
    /// Leave the existing file and report the job as skipped.
    Skip,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollisionPolicy::Overwrite => "overwrite",
            CollisionPolicy::AutoIncrement => "auto-increment",
            CollisionPolicy::Skip => "skip",
        })
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "auto-increment" | "increment" => Ok(CollisionPolicy::AutoIncrement),
            "skip" => Ok(CollisionPolicy::Skip),
            other => Err(format!(
                "unknown collision policy '{other}' (expected overwrite, auto-increment or skip)"
            )),
        }
    }
}

/// Output settings shared by every job of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub quality: Quality,
    /// `None` writes each output beside its source.
    pub output_dir: Option<PathBuf>,
    pub naming: String,
    pub on_collision: CollisionPolicy,
    pub background: Background,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: Quality::default(),
            output_dir: None,
            naming: crate::naming::DEFAULT_TEMPLATE.to_string(),
            on_collision: CollisionPolicy::default(),
            background: Background::default(),
        }
    }
}

/// One file to process and how.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub source: PathBuf,
    /// Applied left to right.
    pub operations: Vec<Operation>,
    pub format: OutputFormat,
    pub quality: Quality,
    pub output_dir: PathBuf,
    pub naming: String,
    pub on_collision: CollisionPolicy,
    pub background: Background,
}

impl ImageJob {
    pub fn new(source: impl Into<PathBuf>, operations: Vec<Operation>, settings: &OutputSettings) -> Self {
        let source = source.into();
        let output_dir = settings.output_dir.clone().unwrap_or_else(|| {
            source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });
        Self {
            source,
            operations,
            format: settings.format,
            quality: settings.quality,
            output_dir,
            naming: settings.naming.clone(),
            on_collision: settings.on_collision,
            background: settings.background,
        }
    }
}

/// Jobs for the two-checkbox mode: per file, grayscale and/or invert.
///
/// With both selected each file yields `[grayscale]` then
/// `[grayscale, invert]`, so a folder gets a `- Grayscale` and an
/// `- Inverted` copy of every image. Errors when neither is selected.
pub fn legacy_jobs(
    sources: &[PathBuf],
    grayscale: bool,
    invert: bool,
    settings: &OutputSettings,
) -> Result<Vec<ImageJob>, String> {
    let chains: Vec<Vec<Operation>> = match (grayscale, invert) {
        (true, true) => vec![
            vec![Operation::Grayscale],
            vec![Operation::Grayscale, Operation::Invert],
        ],
        (true, false) => vec![vec![Operation::Grayscale]],
        (false, true) => vec![vec![Operation::Invert]],
        (false, false) => return Err("select at least one of grayscale or invert".to_string()),
    };
    Ok(sources
        .iter()
        .flat_map(|source| {
            chains
                .iter()
                .map(move |ops| ImageJob::new(source.clone(), ops.clone(), settings))
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Skipped)
    }
}

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub detail: String,
}

/// Outcome of one job, reported exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Position of the job in the queue (0-based).
    pub index: usize,
    pub source: PathBuf,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl OperationResult {
    pub fn pending(index: usize, source: impl Into<PathBuf>) -> Self {
        Self {
            index,
            source: source.into(),
            status: JobStatus::Pending,
            failure: None,
            skip_reason: None,
            output: None,
            input_bytes: 0,
            output_bytes: 0,
        }
    }

    pub fn succeeded(mut self, output: PathBuf, output_bytes: u64) -> Self {
        self.status = JobStatus::Succeeded;
        self.output = Some(output);
        self.output_bytes = output_bytes;
        self
    }

    pub fn failed(mut self, kind: ErrorKind, detail: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.failure = Some(Failure {
            kind,
            detail: detail.into(),
        });
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.status = JobStatus::Skipped;
        self.skip_reason = Some(reason.into());
        self
    }
}

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    /// Stop requested; observed before the next job starts.
    Stopping,
    Stopped,
    Completed,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        matches!(self, RunState::Stopped | RunState::Completed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
            RunState::Completed => "completed",
        })
    }
}

/// Point-in-time view of a batch, safe to hand to another thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSnapshot {
    pub state: RunState,
    /// Index of the job being processed, if any.
    pub current: Option<usize>,
    pub completed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_policy_parses_and_displays() {
        for policy in [
            CollisionPolicy::Overwrite,
            CollisionPolicy::AutoIncrement,
            CollisionPolicy::Skip,
        ] {
            assert_eq!(policy.to_string().parse::<CollisionPolicy>().unwrap(), policy);
        }
        assert!("replace".parse::<CollisionPolicy>().is_err());
    }

    #[test]
    fn job_defaults_output_dir_to_source_parent() {
        let job = ImageJob::new("photos/a.png", vec![], &OutputSettings::default());
        assert_eq!(job.output_dir, PathBuf::from("photos"));
    }

    #[test]
    fn job_uses_explicit_output_dir() {
        let settings = OutputSettings {
            output_dir: Some(PathBuf::from("out")),
            ..OutputSettings::default()
        };
        let job = ImageJob::new("photos/a.png", vec![Operation::Invert], &settings);
        assert_eq!(job.output_dir, PathBuf::from("out"));
        assert_eq!(job.operations, vec![Operation::Invert]);
    }

    #[test]
    fn result_transitions_record_details() {
        let r = OperationResult::pending(2, "x.png").failed(ErrorKind::Decode, "bad header");
        assert_eq!(r.status, JobStatus::Failed);
        assert_eq!(r.failure.as_ref().unwrap().kind, ErrorKind::Decode);
        assert!(r.status.is_terminal());

        let r = OperationResult::pending(0, "y.png").skipped("exists");
        assert_eq!(r.skip_reason.as_deref(), Some("exists"));
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn result_serializes_without_empty_fields() {
        let r = OperationResult::pending(0, "a.png").succeeded(PathBuf::from("a - Inverted.png"), 10);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert!(json.get("failure").is_none());
        assert_eq!(json["output"], "a - Inverted.png");
    }

    #[test]
    fn legacy_jobs_pair_grayscale_and_inverted_per_file() {
        let sources = vec![PathBuf::from("in/a.png"), PathBuf::from("in/b.jpg")];
        let jobs = legacy_jobs(&sources, true, true, &OutputSettings::default()).unwrap();
        let chains: Vec<(&Path, &[Operation])> = jobs
            .iter()
            .map(|j| (j.source.as_path(), j.operations.as_slice()))
            .collect();
        assert_eq!(
            chains,
            vec![
                (Path::new("in/a.png"), &[Operation::Grayscale][..]),
                (Path::new("in/a.png"), &[Operation::Grayscale, Operation::Invert][..]),
                (Path::new("in/b.jpg"), &[Operation::Grayscale][..]),
                (Path::new("in/b.jpg"), &[Operation::Grayscale, Operation::Invert][..]),
            ]
        );
        assert!(jobs.iter().all(|j| j.output_dir == Path::new("in")));
    }

    #[test]
    fn legacy_jobs_single_option() {
        let sources = vec![PathBuf::from("a.png")];
        let jobs = legacy_jobs(&sources, false, true, &OutputSettings::default()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].operations, vec![Operation::Invert]);
    }

    #[test]
    fn legacy_jobs_require_an_option() {
        assert!(legacy_jobs(&[PathBuf::from("a.png")], false, false, &OutputSettings::default()).is_err());
    }
}
