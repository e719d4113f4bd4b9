//! # Simple Convert
//!
//! Batch image conversion: pick files or folders, chain operations
//! (grayscale, invert, enhancement, resize, format conversion, metadata
//! stripping) and write one output per job.
//!
//! # Architecture
//!
//! ```text
//! inputs ──scan──▶ sources ──jobs──▶ batch runner ──▶ outputs
//!                                      │    ▲
//!                         BatchEvent ◀─┘    └─ pause / resume / stop
//! ```
//!
//! The runner owns the queue and processes it on one worker thread, strictly
//! in order. A failure in one file is recorded on that file's result and the
//! batch moves on. Pixels are only touched through the [`imaging::ImageBackend`]
//! trait, so the runner is tested with a recording mock and the CLI uses the
//! pure-Rust [`imaging::RustBackend`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Turns file and folder arguments into an ordered source list |
//! | [`imaging`] | Operations, the backend trait and the `image`-crate backend |
//! | [`batch`] | Sequential runner, pause/resume/stop control, progress events |
//! | [`naming`] | Output filename templates and collision handling |
//! | [`formats`] | Writable output formats and accepted input extensions |
//! | [`preset`] | Named JSON presets and their store |
//! | [`config`] | `simple-convert.toml` loading, merging and validation |
//! | [`info`] | Single-image inspection |
//! | [`types`] | Jobs, results and run states shared across modules |
//! | [`output`] | CLI output formatting |
//!
//! # Pure-Rust Imaging
//!
//! Decoding and encoding go through the `image` crate with pure-Rust codecs
//! only, so the binary has no system image libraries to install. Formats
//! without such a codec (HEIC, PDF) are not offered.

pub mod batch;
pub mod config;
pub mod formats;
pub mod imaging;
pub mod info;
pub mod naming;
pub mod output;
pub mod preset;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
