//! Lossless sub-clip extraction.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::models::TimeRange;

/// Errors from cutting segments.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Source video not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid range: start {start:.3}s, end {end:.3}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cuts `[start, end)` of a source into a new file.
pub trait Cutter: Send + Sync {
    fn cut(&self, source: &Path, range: TimeRange, dest: &Path) -> Result<(), SegmentError>;
}

/// Reject ranges with negative start or `end <= start`.
pub fn check_range(range: TimeRange) -> Result<(), SegmentError> {
    if !range.start.is_finite() || !range.end.is_finite() || range.start < 0.0 || range.end <= range.start {
        return Err(SegmentError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    Ok(())
}

/// Stream-copies with `ffmpeg -ss start -to end -i input -c copy`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCutter;

impl FfmpegCutter {
    pub fn args(source: &Path, range: TimeRange, dest: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", range.start),
            "-to".to_string(),
            format!("{:.3}", range.end),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

impl Cutter for FfmpegCutter {
    fn cut(&self, source: &Path, range: TimeRange, dest: &Path) -> Result<(), SegmentError> {
        check_range(range)?;
        if !source.exists() {
            return Err(SegmentError::NotFound(source.to_path_buf()));
        }

        let args = Self::args(source, range, dest);
        tracing::debug!("[Trimmer] $ ffmpeg {}", args.join(" "));

        let output = Command::new("ffmpeg").args(&args).output()?;
        if !output.status.success() {
            return Err(SegmentError::CommandFailed {
                tool: "ffmpeg".to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Cut one range into `out_dir` under a fresh `segment_<8 hex>.<ext>` name.
pub fn trim(
    cutter: &dyn Cutter,
    source: &Path,
    range: TimeRange,
    out_dir: &Path,
) -> Result<PathBuf, SegmentError> {
    check_range(range)?;
    if !source.exists() {
        return Err(SegmentError::NotFound(source.to_path_buf()));
    }
    std::fs::create_dir_all(out_dir)?;

    let dest = out_dir.join(segment_file_name(source));
    cutter.cut(source, range, &dest)?;
    Ok(dest)
}

/// `segment_<8 hex>.<ext>`, keeping the source extension (mp4 when absent).
pub fn segment_file_name(source: &Path) -> String {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "mp4".to_string());
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("segment_{}.{}", &id[..8], ext)
}
