//! Media structures: assets, scenes, time ranges and clips.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing clip and range lengths in seconds.
pub const TIME_EPSILON: f64 = 1e-6;

/// An input video as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Path to the video file.
    pub path: PathBuf,
    /// Duration in seconds (filled in once probed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Lowercase file extension without the dot (e.g. "mp4").
    pub format: String,
}

impl VideoAsset {
    /// Create an asset from a path, deriving the format tag from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = format_tag(&path);
        Self {
            path,
            duration: None,
            format,
        }
    }

    /// Return a copy with the probed duration recorded.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Whether the file currently exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// File name for log output.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Lowercase extension of a path, empty when there is none.
pub fn format_tag(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// A contiguous run of frames, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub start_frame: u64,
    pub end_frame: u64,
}

impl Scene {
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    /// Number of frames in the scene.
    pub fn frame_count(&self) -> u64 {
        self.end_frame - self.start_frame + 1
    }

    /// Index of the middle frame.
    pub fn middle_frame(&self) -> u64 {
        (self.start_frame + self.end_frame) / 2
    }

    /// Scene start in seconds at the given capture rate.
    pub fn start_time(&self, fps: f64) -> f64 {
        self.start_frame as f64 / fps
    }

    /// Scene end in seconds (exclusive) at the given capture rate.
    pub fn end_time(&self, fps: f64) -> f64 {
        (self.end_frame + 1) as f64 / fps
    }

    /// The scene as a half-open time range.
    pub fn to_time_range(&self, fps: f64) -> TimeRange {
        TimeRange::new(self.start_time(fps), self.end_time(fps))
    }
}

/// A half-open interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length in seconds (never negative).
    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Midpoint in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}s, {:.3}s)", self.start, self.end)
    }
}

/// A fixed-length window chosen to illustrate one timeline item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub start: f64,
    pub end: f64,
    /// True when content-aware refinement picked the window, false for the
    /// deterministic fallback.
    #[serde(default)]
    pub refined: bool,
}

impl Clip {
    /// Build a clip of exactly `length` seconds starting at `start` (clamped to 0).
    pub fn from_start(start: f64, length: f64, refined: bool) -> Self {
        let start = start.max(0.0);
        Self {
            start,
            end: start + length,
            refined,
        }
    }

    /// Clip length in seconds.
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Clip midpoint in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// The clip as a time range.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}
