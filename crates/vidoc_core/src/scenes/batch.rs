//! Directory-wide auto-segmentation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::assembler::{auto_segment, Segment};
use super::detector::SceneDetector;
use crate::config::SegmentSettings;

/// Extensions picked up from a batch directory (case-insensitive).
pub const BATCH_FORMATS: [&str; 6] = ["mp4", "mov", "mkv", "avi", "webm", "flv"];

/// Result for one file of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Success { segments: Vec<Segment> },
    Error { error: String },
}

impl FileOutcome {
    pub fn segment_count(&self) -> usize {
        match self {
            FileOutcome::Success { segments } => segments.len(),
            FileOutcome::Error { .. } => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }
}

/// Aggregate numbers for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_videos: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_segments: usize,
    /// Percentage formatted with one decimal, `"0%"` for an empty batch.
    pub success_rate: String,
}

/// Video files directly inside `dir`, sorted by name. A missing directory
/// has none.
pub fn discover_videos(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let supported = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| BATCH_FORMATS.contains(&ext.as_str()));
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Segment every video in `input_dir`. One failing file does not stop the
/// batch.
pub fn segment_directory(
    input_dir: &Path,
    out_dir: &Path,
    settings: &SegmentSettings,
    detector: &SceneDetector,
) -> std::io::Result<Vec<(PathBuf, FileOutcome)>> {
    let files = discover_videos(input_dir)?;
    if files.is_empty() {
        tracing::info!("[Batch] No video files found in {}", input_dir.display());
        return Ok(Vec::new());
    }

    tracing::info!("[Batch] Found {} video(s) to process", files.len());
    let total = files.len();
    let mut results = Vec::with_capacity(total);

    for (idx, path) in files.into_iter().enumerate() {
        tracing::info!("[Batch] [{}/{}] Processing {}", idx + 1, total, path.display());
        let outcome = match auto_segment(&path, settings, detector, out_dir) {
            Ok(segments) => {
                tracing::info!("[Batch]   created {} segment(s)", segments.len());
                FileOutcome::Success { segments }
            }
            Err(e) => {
                tracing::warn!("[Batch]   failed: {}", e);
                FileOutcome::Error {
                    error: e.to_string(),
                }
            }
        };
        results.push((path, outcome));
    }

    Ok(results)
}

/// Summarize a batch run.
pub fn summarize(results: &[(PathBuf, FileOutcome)]) -> BatchSummary {
    let total_videos = results.len();
    let successful = results.iter().filter(|(_, o)| o.is_success()).count();
    let total_segments = results.iter().map(|(_, o)| o.segment_count()).sum();
    let success_rate = if total_videos > 0 {
        format!("{:.1}%", successful as f64 / total_videos as f64 * 100.0)
    } else {
        "0%".to_string()
    };

    BatchSummary {
        total_videos,
        successful,
        failed: total_videos - successful,
        total_segments,
        success_rate,
    }
}
