//! Turns scene boundary timestamps into materialized sub-clips.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::detector::SceneDetector;
use super::trimmer::{self, Cutter, FfmpegCutter, SegmentError};
use crate::config::SegmentSettings;
use crate::models::TimeRange;
use crate::video;

/// Which intervals survive the minimum-length rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPlan {
    pub kept: Vec<TimeRange>,
    /// Intervals shorter than the minimum. Their time is not covered by any
    /// kept segment.
    pub dropped: Vec<TimeRange>,
}

/// Build the interval plan from raw boundaries.
///
/// Boundaries are sorted, de-duplicated and limited to `(0, duration)`;
/// `0` and `duration` are added as outer edges. Short intervals are dropped,
/// never merged into a neighbour. The kept list is truncated to
/// `max_segments` when set.
pub fn plan_segments(
    boundaries: &[f64],
    duration: f64,
    min_length: f64,
    max_segments: Option<usize>,
) -> SegmentPlan {
    let mut inner: Vec<f64> = boundaries
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t > 0.0 && *t < duration)
        .collect();
    inner.sort_by(f64::total_cmp);
    inner.dedup();

    let mut edges = Vec::with_capacity(inner.len() + 2);
    edges.push(0.0);
    edges.extend(inner);
    if duration > 0.0 {
        edges.push(duration);
    }

    let mut plan = SegmentPlan::default();
    for pair in edges.windows(2) {
        let range = TimeRange::new(pair[0], pair[1]);
        if range.length() >= min_length {
            plan.kept.push(range);
        } else {
            plan.dropped.push(range);
        }
    }

    if let Some(max) = max_segments {
        plan.kept.truncate(max);
    }
    plan
}

/// A materialized sub-clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub range: TimeRange,
    pub path: PathBuf,
}

/// Materializes planned intervals through a [`Cutter`].
pub struct SegmentAssembler {
    cutter: Arc<dyn Cutter>,
    min_length: f64,
    max_segments: Option<usize>,
}

impl SegmentAssembler {
    pub fn new(min_length: f64, max_segments: Option<usize>) -> Self {
        Self {
            cutter: Arc::new(FfmpegCutter),
            min_length: min_length.max(0.0),
            max_segments,
        }
    }

    pub fn from_settings(settings: &SegmentSettings) -> Self {
        Self::new(settings.min_length, settings.max_segments)
    }

    pub fn with_cutter(mut self, cutter: Arc<dyn Cutter>) -> Self {
        self.cutter = cutter;
        self
    }

    /// Cut each planned interval of `source` into `out_dir`.
    ///
    /// A missing source fails immediately. An interval that fails to cut is
    /// logged and skipped.
    pub fn assemble(
        &self,
        source: &Path,
        boundaries: &[f64],
        duration: f64,
        out_dir: &Path,
    ) -> Result<Vec<Segment>, SegmentError> {
        if !source.exists() {
            return Err(SegmentError::NotFound(source.to_path_buf()));
        }

        let plan = plan_segments(boundaries, duration, self.min_length, self.max_segments);
        for range in &plan.dropped {
            tracing::info!(
                "[Assembler] Dropping {} ({:.3}s < {:.3}s minimum); this span is not covered",
                range,
                range.length(),
                self.min_length
            );
        }

        let mut segments = Vec::with_capacity(plan.kept.len());
        for range in plan.kept {
            match trimmer::trim(self.cutter.as_ref(), source, range, out_dir) {
                Ok(path) => {
                    tracing::debug!("[Assembler] {} -> {}", range, path.display());
                    segments.push(Segment { range, path });
                }
                Err(SegmentError::NotFound(p)) => return Err(SegmentError::NotFound(p)),
                Err(e) => {
                    tracing::warn!("[Assembler] Skipping {}: {}", range, e);
                }
            }
        }
        Ok(segments)
    }
}

/// Detect scenes in `source` and cut it at every scene change.
pub fn auto_segment(
    source: &Path,
    settings: &SegmentSettings,
    detector: &SceneDetector,
    out_dir: &Path,
) -> Result<Vec<Segment>, SegmentError> {
    if !source.exists() {
        return Err(SegmentError::NotFound(source.to_path_buf()));
    }

    // An unreadable file is reported like a missing one.
    let duration = video::probe_duration(source).map_err(|e| {
        tracing::warn!("[Segment] Cannot probe {}: {}", source.display(), e);
        SegmentError::NotFound(source.to_path_buf())
    })?;
    let scenes = detector.detect(source);
    SegmentAssembler::from_settings(settings).assemble(source, &scenes.cut_times(), duration, out_dir)
}
