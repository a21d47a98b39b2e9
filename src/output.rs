//! CLI output formatting for all commands.
//!
//! # Output Format
//!
//! ## Batch
//!
//! ```text
//! Compressing 3 images under photos/
//! [001/003] IMG_0042.jpg
//!     Compressed: 12.4 MB → 9.8 MB (q65, quality-step)
//!     Output: IMG_0042_compressed_q80.jpg
//! [002/003] logo.png
//!     Skipped: 1.2 MB is already under the ceiling
//! [003/003] broken.jpg
//!     Failed: Decode failed: unrecognized or unsupported image format
//!
//! Compressed 1, skipped 1, failed 1
//!     Original: 13.6 MB
//!     Written: 9.8 MB
//!     Saved: 2.6 MB
//! ```
//!
//! ## Compress
//!
//! ```text
//! IMG_0042.jpg
//!     Original: 12.4 MB (4032x3024)
//!     Compressed: 9.8 MB (4032x3024, JPEG q65, quality-step, 4 attempts)
//!     Output: IMG_0042_compressed_q80.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure, with no I/O.

use crate::batch::{BatchEvent, BatchSummary, FileOutcome};
use crate::compress::CompressionResult;
use crate::imaging::Stage;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Direct => "direct",
        Stage::QualityStep => "quality-step",
        Stage::Resize => "resize",
    }
}

/// Human-readable byte count in binary units.
///
/// ```text
/// 512 → "512 B", 2048 → "2.0 KB", 10485760 → "10.0 MB"
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Batch output
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { root, total } => {
            vec![format!(
                "Compressing {} images under {}",
                total,
                root.display()
            )]
        }
        BatchEvent::FileFinished {
            index,
            total,
            report,
        } => {
            let mut lines = vec![format!(
                "[{}/{}] {}",
                format_index(*index),
                format_index(*total),
                file_name(&report.path)
            )];
            lines.extend(format_outcome(&report.outcome));
            lines
        }
    }
}

fn format_outcome(outcome: &FileOutcome) -> Vec<String> {
    match outcome {
        FileOutcome::Compressed {
            output,
            original_size,
            compressed_size,
            quality,
            stage,
            ..
        } => vec![
            format!(
                "{}Compressed: {} \u{2192} {} (q{}, {})",
                indent(1),
                format_bytes(*original_size),
                format_bytes(*compressed_size),
                quality,
                stage_label(*stage)
            ),
            format!("{}Output: {}", indent(1), file_name(output)),
        ],
        FileOutcome::Skipped { size } => vec![format!(
            "{}Skipped: {} is already under the ceiling",
            indent(1),
            format_bytes(*size)
        )],
        FileOutcome::Failed { error } => vec![format!("{}Failed: {}", indent(1), error)],
        FileOutcome::Cancelled => vec![format!("{}Cancelled", indent(1))],
    }
}

/// Format the end-of-batch totals.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut counts = format!(
        "Compressed {}, skipped {}, failed {}",
        summary.compressed, summary.skipped, summary.failed
    );
    if summary.cancelled > 0 {
        counts.push_str(&format!(", cancelled {}", summary.cancelled));
    }
    vec![
        String::new(),
        counts,
        format!("{}Original: {}", indent(1), format_bytes(summary.original_bytes)),
        format!("{}Written: {}", indent(1), format_bytes(summary.compressed_bytes)),
        format!("{}Saved: {}", indent(1), format_bytes(summary.saved_bytes)),
    ]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Single-file output
// ============================================================================

/// Format the outcome of compressing one file.
pub fn format_compress_result(
    source: &Path,
    original_size: u64,
    original_dims: (u32, u32),
    result: &CompressionResult,
    output: &Path,
) -> Vec<String> {
    let detail = if result.passthrough {
        "unchanged, already under the ceiling".to_string()
    } else {
        let attempts = match result.attempts {
            1 => "1 attempt".to_string(),
            n => format!("{} attempts", n),
        };
        format!(
            "{}x{}, {} q{}, {}, {}",
            result.width,
            result.height,
            result.format,
            result.quality,
            stage_label(result.stage),
            attempts
        )
    };
    vec![
        file_name(source),
        format!(
            "{}Original: {} ({}x{})",
            indent(1),
            format_bytes(original_size),
            original_dims.0,
            original_dims.1
        ),
        format!(
            "{}Compressed: {} ({})",
            indent(1),
            format_bytes(result.size()),
            detail
        ),
        format!("{}Output: {}", indent(1), output.display()),
    ]
}

pub fn print_compress_result(
    source: &Path,
    original_size: u64,
    original_dims: (u32, u32),
    result: &CompressionResult,
    output: &Path,
) {
    for line in format_compress_result(source, original_size, original_dims, result, output) {
        println!("{}", line);
    }
}

/// Format the outcome of a stitch.
pub fn format_stitch_result(output: &Path, dims: (u32, u32), size: u64) -> Vec<String> {
    vec![format!(
        "Stitched {}x{} banner \u{2192} {} ({})",
        dims.0,
        dims.1,
        output.display(),
        format_bytes(size)
    )]
}

pub fn print_stitch_result(output: &Path, dims: (u32, u32), size: u64) {
    for line in format_stitch_result(output, dims, size) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::FileReport;
    use crate::imaging::{Format, Quality};
    use std::path::PathBuf;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
    }

    // =========================================================================
    // Batch output tests
    // =========================================================================

    #[test]
    fn started_event_shows_count_and_root() {
        let event = BatchEvent::Started {
            root: PathBuf::from("photos"),
            total: 12,
        };
        assert_eq!(
            format_batch_event(&event),
            vec!["Compressing 12 images under photos"]
        );
    }

    #[test]
    fn compressed_event_shows_sizes_and_output() {
        let event = BatchEvent::FileFinished {
            index: 3,
            total: 12,
            report: FileReport {
                path: PathBuf::from("photos/IMG_0042.jpg"),
                outcome: FileOutcome::Compressed {
                    output: PathBuf::from("photos/IMG_0042_compressed_q80.jpg"),
                    original_size: 3 * 1024 * 1024,
                    compressed_size: 1024 * 1024,
                    quality: Quality::new(65),
                    format: Format::Jpeg,
                    stage: Stage::QualityStep,
                    width: 4032,
                    height: 3024,
                },
            },
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "[003/012] IMG_0042.jpg",
                "    Compressed: 3.0 MB \u{2192} 1.0 MB (q65, quality-step)",
                "    Output: IMG_0042_compressed_q80.jpg",
            ]
        );
    }

    #[test]
    fn skipped_and_failed_events() {
        let skipped = BatchEvent::FileFinished {
            index: 1,
            total: 2,
            report: FileReport {
                path: PathBuf::from("logo.png"),
                outcome: FileOutcome::Skipped { size: 2048 },
            },
        };
        assert_eq!(
            format_batch_event(&skipped)[1],
            "    Skipped: 2.0 KB is already under the ceiling"
        );

        let failed = BatchEvent::FileFinished {
            index: 2,
            total: 2,
            report: FileReport {
                path: PathBuf::from("broken.jpg"),
                outcome: FileOutcome::Failed {
                    error: "Decode failed: bad".into(),
                },
            },
        };
        assert_eq!(
            format_batch_event(&failed),
            vec!["[002/002] broken.jpg", "    Failed: Decode failed: bad"]
        );
    }

    #[test]
    fn summary_mentions_cancelled_only_when_present() {
        let mut summary = BatchSummary {
            total: 3,
            compressed: 1,
            skipped: 1,
            failed: 1,
            cancelled: 0,
            original_bytes: 3 * 1024 * 1024,
            compressed_bytes: 1024 * 1024,
            saved_bytes: 1024 * 1024,
        };
        let lines = format_batch_summary(&summary);
        assert_eq!(lines[1], "Compressed 1, skipped 1, failed 1");
        assert_eq!(lines[4], "    Saved: 1.0 MB");

        summary.cancelled = 2;
        assert_eq!(
            format_batch_summary(&summary)[1],
            "Compressed 1, skipped 1, failed 1, cancelled 2"
        );
    }

    // =========================================================================
    // Single-file output tests
    // =========================================================================

    fn result(passthrough: bool, attempts: u32) -> CompressionResult {
        CompressionResult {
            bytes: vec![0; 2048],
            quality: Quality::new(65),
            width: 800,
            height: 600,
            format: Format::Jpeg,
            stage: Stage::QualityStep,
            attempts,
            passthrough,
        }
    }

    #[test]
    fn compress_result_lists_search_details() {
        let lines = format_compress_result(
            Path::new("in/photo.jpg"),
            4096,
            (800, 600),
            &result(false, 4),
            Path::new("in/photo_compressed_q80.jpg"),
        );
        assert_eq!(
            lines,
            vec![
                "photo.jpg",
                "    Original: 4.0 KB (800x600)",
                "    Compressed: 2.0 KB (800x600, JPEG q65, quality-step, 4 attempts)",
                "    Output: in/photo_compressed_q80.jpg",
            ]
        );
    }

    #[test]
    fn passthrough_result_says_unchanged() {
        let lines = format_compress_result(
            Path::new("photo.jpg"),
            2048,
            (800, 600),
            &result(true, 0),
            Path::new("photo_compressed_q80.jpg"),
        );
        assert_eq!(
            lines[2],
            "    Compressed: 2.0 KB (unchanged, already under the ceiling)"
        );
    }

    #[test]
    fn stitch_result_line() {
        assert_eq!(
            format_stitch_result(Path::new("banner.png"), (800, 1140), 512),
            vec!["Stitched 800x1140 banner \u{2192} banner.png (512 B)"]
        );
    }
}
