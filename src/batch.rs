//! Batch compression of a directory tree.
//!
//! Finds every supported image under a root directory and compresses each one
//! that is above the ceiling, writing the result next to its source under the
//! name from [`naming::compressed_output_path`](crate::naming::compressed_output_path).
//!
//! ## Per-file outcomes
//!
//! | Outcome | When |
//! |---|---|
//! | `Skipped` | The file is already at or under the ceiling |
//! | `Compressed` | A fitting encoding was found and written |
//! | `Failed` | Reading, decoding, the search or the write failed |
//! | `Cancelled` | The cancel token was set before the file started |
//!
//! One file failing never aborts the batch; the driver always returns the full
//! report list.
//!
//! ## Output collisions
//!
//! Two sources can map to the same output name (`a.jpg` and `a.png` both
//! become `a_compressed_q80.jpg` when PNGs are forced to JPEG). Output paths
//! are claimed in discovery order before any worker starts; a file whose
//! output is already claimed by another source fails instead of overwriting it.
//!
//! ## Parallel Processing
//!
//! Files are compressed in parallel on the global rayon pool (sized from
//! `[processing]` in the config). The search for a single file stays
//! sequential. Progress is reported as [`BatchEvent`]s over an optional
//! channel so the caller can print while workers run.

use crate::compress::{AdaptiveCompressor, CompressError, target_format};
use crate::imaging::{
    BackendError, CompressionSpec, Format, ImageBackend, Quality, Stage,
    supported_input_extensions, write_atomic,
};
use crate::naming::compressed_output_path;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("a batch is already running")]
    AlreadyRunning,
}

/// Errors that fail a single file without stopping the batch.
#[derive(Error, Debug)]
enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Compress(#[from] CompressError),
    #[error(transparent)]
    Write(#[from] BackendError),
    #[error("output path {} collides with {}", .output.display(), .owner.display())]
    OutputCollision { output: PathBuf, owner: PathBuf },
}

/// Shared flag for cooperative cancellation, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Handler for an interrupt signal: the first call cancels the token so
    /// files in progress finish and the rest report `Cancelled`; a second
    /// call exits the process.
    pub fn interrupt_handler(&self) -> impl Fn() + Send + 'static {
        let token = self.clone();
        move || {
            if token.is_cancelled() {
                std::process::exit(130);
            }
            eprintln!("Interrupted: finishing files in progress, cancelling the rest");
            token.cancel();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Compressed {
        output: PathBuf,
        original_size: u64,
        compressed_size: u64,
        quality: Quality,
        format: Format,
        stage: Stage,
        width: u32,
        height: u32,
    },
    Skipped {
        size: u64,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Totals over a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Size of every file that was read (compressed or skipped).
    pub original_bytes: u64,
    /// Size of every output written.
    pub compressed_bytes: u64,
    /// Bytes saved by the compressed files.
    pub saved_bytes: u64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match &report.outcome {
                FileOutcome::Compressed {
                    original_size,
                    compressed_size,
                    ..
                } => {
                    summary.compressed += 1;
                    summary.original_bytes += original_size;
                    summary.compressed_bytes += compressed_size;
                    summary.saved_bytes += original_size.saturating_sub(*compressed_size);
                }
                FileOutcome::Skipped { size } => {
                    summary.skipped += 1;
                    summary.original_bytes += size;
                }
                FileOutcome::Failed { .. } => summary.failed += 1,
                FileOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub summary: BatchSummary,
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { root: PathBuf, total: usize },
    FileFinished {
        /// 1-based position in discovery order.
        index: usize,
        total: usize,
        report: FileReport,
    },
}

/// Find every supported image under `root`, sorted by path.
///
/// Extensions are matched case-insensitively. With `recursive` off only the
/// top level of `root` is searched.
pub fn discover_images(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, BatchError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                supported_input_extensions()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(e))
            });
        if supported {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Output path of every file the batch expects to compress, mapped to the
/// first source (in discovery order) that produces it.
///
/// The output format is predicted from the extension; files at or under the
/// ceiling produce no output and claim nothing.
fn claim_outputs(files: &[PathBuf], spec: &CompressionSpec) -> HashMap<PathBuf, PathBuf> {
    let mut claims = HashMap::new();
    for path in files {
        let over_ceiling = std::fs::metadata(path).is_ok_and(|m| m.len() > spec.ceiling.get());
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension);
        if let (true, Some(format)) = (over_ceiling, format) {
            let (output_format, _) = target_format(format, spec.png_strategy);
            claims
                .entry(compressed_output_path(path, spec.quality, output_format))
                .or_insert_with(|| path.clone());
        }
    }
    claims
}

/// Take `output` for `source`, or fail if another source already owns it.
fn claim_output(
    claims: &Mutex<HashMap<PathBuf, PathBuf>>,
    output: &Path,
    source: &Path,
) -> Result<(), FileError> {
    let mut claims = claims.lock().unwrap_or_else(PoisonError::into_inner);
    let owner = claims
        .entry(output.to_path_buf())
        .or_insert_with(|| source.to_path_buf());
    if owner.as_path() == source {
        Ok(())
    } else {
        Err(FileError::OutputCollision {
            output: output.to_path_buf(),
            owner: owner.clone(),
        })
    }
}

/// Clears the running flag when a batch ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BatchDriver<B> {
    compressor: AdaptiveCompressor<B>,
    running: AtomicBool,
}

impl<B: ImageBackend> BatchDriver<B> {
    pub fn new(compressor: AdaptiveCompressor<B>) -> Self {
        Self {
            compressor,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Compress every image under `root`. Only one batch may run at a time.
    pub fn run(
        &self,
        root: &Path,
        recursive: bool,
        spec: &CompressionSpec,
        cancel: &CancelToken,
        events: Option<Sender<BatchEvent>>,
    ) -> Result<BatchReport, BatchError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BatchError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let files = discover_images(root, recursive)?;
        let total = files.len();
        info!(root = %root.display(), total, "batch started");
        if let Some(tx) = &events {
            tx.send(BatchEvent::Started {
                root: root.to_path_buf(),
                total,
            })
            .ok();
        }

        let claims = Mutex::new(claim_outputs(&files, spec));
        let reports: Vec<FileReport> = files
            .par_iter()
            .enumerate()
            .map(|(i, path)| {
                let report = FileReport {
                    path: path.clone(),
                    outcome: self.process_file(path, spec, &claims, cancel),
                };
                if let Some(tx) = &events {
                    tx.send(BatchEvent::FileFinished {
                        index: i + 1,
                        total,
                        report: report.clone(),
                    })
                    .ok();
                }
                report
            })
            .collect();

        let summary = BatchSummary::from_reports(&reports);
        info!(
            compressed = summary.compressed,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        Ok(BatchReport {
            files: reports,
            summary,
        })
    }

    fn process_file(
        &self,
        path: &Path,
        spec: &CompressionSpec,
        claims: &Mutex<HashMap<PathBuf, PathBuf>>,
        cancel: &CancelToken,
    ) -> FileOutcome {
        if cancel.is_cancelled() {
            return FileOutcome::Cancelled;
        }
        match self.compress_file(path, spec, claims) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "compression failed");
                FileOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn compress_file(
        &self,
        path: &Path,
        spec: &CompressionSpec,
        claims: &Mutex<HashMap<PathBuf, PathBuf>>,
    ) -> Result<FileOutcome, FileError> {
        let size = std::fs::metadata(path)?.len();
        if size <= spec.ceiling.get() {
            debug!(path = %path.display(), size, "already under ceiling");
            return Ok(FileOutcome::Skipped { size });
        }

        let bytes = std::fs::read(path)?;
        let result = self.compressor.compress_bytes(bytes, spec)?;
        let output = compressed_output_path(path, spec.quality, result.format);
        claim_output(claims, &output, path)?;
        write_atomic(&output, &result.bytes)?;

        Ok(FileOutcome::Compressed {
            output,
            original_size: size,
            compressed_size: result.size(),
            quality: result.quality,
            format: result.format,
            stage: result.stage,
            width: result.width,
            height: result.height,
        })
    }
}
