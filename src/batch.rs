//! Batch runner: one worker, one job at a time, cancellable between jobs.
//!
//! ## Lifecycle
//!
//! ```text
//! idle ──start──▶ running ──▶ completed
//!                  │   ▲
//!            pause │   │ resume
//!                  ▼   │
//!                 paused
//!
//! any ──stop──▶ stopping ──(next checkpoint)──▶ stopped
//! ```
//!
//! Pause and stop are cooperative: the worker looks at the control state
//! only *between* jobs, so the job in flight always finishes and its result
//! is kept. Jobs never reached after a stop are reported as skipped, so the
//! summary always accounts for every queued job:
//!
//! ```text
//! succeeded + failed + skipped == total
//! ```
//!
//! ## Front ends
//!
//! - [`run`] processes a queue on the calling thread and reports through
//!   two callbacks (`on_progress`, `on_item_done`).
//! - [`BatchRunner::spawn`] moves the queue onto a dedicated worker thread
//!   and publishes [`BatchEvent`]s on a bounded channel. The caller steers it
//!   through the returned [`BatchHandle`].
//!
//! The receiver of a spawned batch must be drained: when the channel is
//! full the worker waits for room.

use crate::imaging::{
    BackendError, DecodedImage, ImageBackend, apply, metadata, output_suffix, prepare_for_format,
};
use crate::naming::{self, NameParts, OutputTarget};
use crate::types::{BatchSnapshot, ImageJob, JobStatus, OperationResult, RunState};
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Skip reason recorded for jobs a stop request kept from running.
pub const STOPPED_REASON: &str = "batch stopped";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to start batch worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Batch worker panicked")]
    WorkerPanicked,
}

/// Progress notifications from a spawned batch, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { total: usize },
    ItemStarted { index: usize, source: PathBuf },
    ItemDone(OperationResult),
    Progress { completed: usize, total: usize },
    StateChanged(RunState),
    Finished(BatchSummary),
}

/// Final accounting of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub state: RunState,
    /// One entry per queued job, in queue order.
    pub results: Vec<OperationResult>,
}

impl BatchSummary {
    fn new(total: usize, state: RunState, results: Vec<OperationResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total,
            succeeded: count(JobStatus::Succeeded),
            failed: count(JobStatus::Failed),
            skipped: count(JobStatus::Skipped),
            state,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| r.status == JobStatus::Failed)
    }
}

#[derive(Debug)]
struct ControlState {
    state: RunState,
    current: Option<usize>,
    completed: usize,
    total: usize,
}

/// Shared pause/resume/stop switch for one batch.
///
/// Cloning yields another handle to the same switch.
#[derive(Debug, Clone)]
pub struct BatchControl {
    inner: Arc<(Mutex<ControlState>, Condvar)>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(ControlState {
                    state: RunState::Idle,
                    current: None,
                    completed: 0,
                    total: 0,
                }),
                Condvar::new(),
            )),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change state if the current one is in `from`. Returns whether it changed.
    fn transition(&self, from: &[RunState], to: RunState) -> bool {
        let mut guard = self.lock();
        if !from.contains(&guard.state) {
            return false;
        }
        guard.state = to;
        self.inner.1.notify_all();
        true
    }

    /// Hold the worker before its next job. Allowed before the batch starts.
    pub fn pause(&self) -> bool {
        self.transition(&[RunState::Idle, RunState::Running], RunState::Paused)
    }

    pub fn resume(&self) -> bool {
        self.transition(&[RunState::Paused], RunState::Running)
    }

    /// Ask the worker to stop before its next job.
    pub fn stop(&self) -> bool {
        self.transition(
            &[RunState::Idle, RunState::Running, RunState::Paused],
            RunState::Stopping,
        )
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        let guard = self.lock();
        BatchSnapshot {
            state: guard.state,
            current: guard.current,
            completed: guard.completed,
            total: guard.total,
        }
    }

    /// Reset the counters for a new run. A pause or stop requested before
    /// the start is kept; a control finished by an earlier run starts over.
    fn begin(&self, total: usize) {
        let mut guard = self.lock();
        guard.total = total;
        guard.completed = 0;
        guard.current = None;
        if guard.state == RunState::Idle || guard.state.is_finished() {
            guard.state = RunState::Running;
        }
    }

    /// Block while paused. Returns `false` once a stop has been requested.
    fn checkpoint(&self, emit: &mut dyn FnMut(BatchEvent)) -> bool {
        let paused = self.lock().state == RunState::Paused;
        if paused {
            emit(BatchEvent::StateChanged(RunState::Paused));
            let guard = self
                .inner
                .1
                .wait_while(self.lock(), |s| s.state == RunState::Paused)
                .unwrap_or_else(PoisonError::into_inner);
            let state = guard.state;
            drop(guard);
            if state == RunState::Running {
                emit(BatchEvent::StateChanged(RunState::Running));
            }
        }
        self.lock().state != RunState::Stopping
    }

    fn set_current(&self, index: Option<usize>, completed: usize) {
        let mut guard = self.lock();
        guard.current = index;
        guard.completed = completed;
    }

    fn finish(&self, state: RunState) {
        let mut guard = self.lock();
        guard.state = state;
        guard.current = None;
        self.inner.1.notify_all();
    }
}

/// Process `jobs` in order on the calling thread.
///
/// After each processed job `on_item_done` and then `on_progress(completed,
/// total)` are called exactly once. Jobs skipped because of a stop appear in
/// the summary only.
pub fn run<B, P, D>(
    backend: &B,
    jobs: Vec<ImageJob>,
    control: &BatchControl,
    mut on_progress: P,
    mut on_item_done: D,
) -> BatchSummary
where
    B: ImageBackend + ?Sized,
    P: FnMut(usize, usize),
    D: FnMut(&OperationResult),
{
    run_with_events(backend, jobs, control, &mut |event| match event {
        BatchEvent::ItemDone(result) => on_item_done(&result),
        BatchEvent::Progress { completed, total } => on_progress(completed, total),
        _ => {}
    })
}

fn run_with_events<B: ImageBackend + ?Sized>(
    backend: &B,
    jobs: Vec<ImageJob>,
    control: &BatchControl,
    emit: &mut dyn FnMut(BatchEvent),
) -> BatchSummary {
    let total = jobs.len();
    control.begin(total);
    info!(total, "batch started");
    emit(BatchEvent::Started { total });

    let mut results = Vec::with_capacity(total);
    let mut completed = 0;
    let mut queue = jobs.into_iter().enumerate();
    let mut stopped = false;

    while let Some((index, job)) = queue.next() {
        if !control.checkpoint(emit) {
            let remaining = std::iter::once((index, job)).chain(queue.by_ref());
            for (index, job) in remaining {
                results.push(OperationResult::pending(index, job.source).skipped(STOPPED_REASON));
            }
            stopped = true;
            break;
        }

        control.set_current(Some(index), completed);
        emit(BatchEvent::ItemStarted {
            index,
            source: job.source.clone(),
        });
        let result = process_job(backend, job, index);
        completed += 1;
        control.set_current(None, completed);
        emit(BatchEvent::ItemDone(result.clone()));
        emit(BatchEvent::Progress { completed, total });
        results.push(result);
    }

    let state = if stopped {
        RunState::Stopped
    } else {
        RunState::Completed
    };
    control.finish(state);
    emit(BatchEvent::StateChanged(state));

    let summary = BatchSummary::new(total, state, results);
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        state = %state,
        "batch finished"
    );
    summary
}

enum JobOutcome {
    Written { path: PathBuf, bytes: u64 },
    Blocked { path: PathBuf },
}

fn process_job<B: ImageBackend + ?Sized>(backend: &B, job: ImageJob, index: usize) -> OperationResult {
    let mut result = OperationResult::pending(index, job.source.clone());
    result.status = JobStatus::Running;
    debug!(index, source = %job.source.display(), "processing");

    let bytes = match std::fs::read(&job.source) {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = BackendError::from(e);
            warn!(source = %job.source.display(), "{err}");
            return result.failed(err.kind(), err.to_string());
        }
    };
    result.input_bytes = bytes.len() as u64;

    match execute(backend, &job, bytes) {
        Ok(JobOutcome::Written { path, bytes }) => result.succeeded(path, bytes),
        Ok(JobOutcome::Blocked { path }) => {
            warn!(output = %path.display(), "output exists, skipping");
            result.skipped(format!("output exists: {}", path.display()))
        }
        Err(err) => {
            warn!(source = %job.source.display(), "{err}");
            result.failed(err.kind(), err.to_string())
        }
    }
}

fn execute<B: ImageBackend + ?Sized>(
    backend: &B,
    job: &ImageJob,
    bytes: Vec<u8>,
) -> Result<JobOutcome, BackendError> {
    let stem = job
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts = NameParts {
        stem: &stem,
        suffix: output_suffix(&job.operations),
        format: job.format,
        now: Local::now().naive_local(),
    };
    let candidate = naming::output_candidate(&job.output_dir, &job.naming, &parts)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let path = match naming::resolve_collision(candidate, job.on_collision) {
        OutputTarget::Fresh(path) => path,
        OutputTarget::Replace(path) => {
            warn!(output = %path.display(), "overwriting existing file");
            path
        }
        OutputTarget::Skip(path) => return Ok(JobOutcome::Blocked { path }),
    };

    let image = backend.decode(&bytes)?;
    drop(bytes);
    let DecodedImage { pixels, exif, .. } = apply(backend, image, &job.operations)?;
    let pixels = prepare_for_format(pixels, job.format, job.background);
    let mut encoded = backend.encode(&pixels, job.format, job.quality)?;
    if let Some(exif) = exif {
        if job.format.carries_exif() {
            encoded = metadata::embed(encoded, job.format, &exif);
        } else {
            debug!(format = %job.format, "source EXIF not written to this format");
        }
    }

    std::fs::create_dir_all(&job.output_dir)?;
    std::fs::write(&path, &encoded)?;
    debug!(output = %path.display(), bytes = encoded.len(), "written");
    Ok(JobOutcome::Written {
        path,
        bytes: encoded.len() as u64,
    })
}

/// Runs batches on a dedicated worker thread.
pub struct BatchRunner<B> {
    backend: Arc<B>,
    event_capacity: usize,
}

impl<B: ImageBackend + 'static> BatchRunner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn spawn(
        &self,
        jobs: Vec<ImageJob>,
    ) -> Result<(BatchHandle, Receiver<BatchEvent>), BatchError> {
        self.spawn_with(jobs, BatchControl::new())
    }

    /// Spawn with an existing control, e.g. one paused before the start.
    pub fn spawn_with(
        &self,
        jobs: Vec<ImageJob>,
        control: BatchControl,
    ) -> Result<(BatchHandle, Receiver<BatchEvent>), BatchError> {
        let (tx, rx): (SyncSender<BatchEvent>, _) = sync_channel(self.event_capacity);
        let backend = Arc::clone(&self.backend);
        let worker_control = control.clone();
        let worker = std::thread::Builder::new()
            .name("batch-worker".to_string())
            .spawn(move || {
                // A dropped receiver only means nobody is listening.
                let mut emit = |event: BatchEvent| {
                    let _ = tx.send(event);
                };
                let summary = run_with_events(backend.as_ref(), jobs, &worker_control, &mut emit);
                emit(BatchEvent::Finished(summary.clone()));
                summary
            })?;
        Ok((BatchHandle { control, worker }, rx))
    }
}

/// Steering wheel for a spawned batch.
pub struct BatchHandle {
    control: BatchControl,
    worker: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub fn control(&self) -> &BatchControl {
        &self.control
    }

    pub fn pause(&self) -> bool {
        self.control.pause()
    }

    pub fn resume(&self) -> bool {
        self.control.resume()
    }

    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        self.control.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and return its summary.
    pub fn join(self) -> Result<BatchSummary, BatchError> {
        self.worker.join().map_err(|_| BatchError::WorkerPanicked)
    }
}
