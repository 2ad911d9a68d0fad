//! What steps read ([`Context`]) and what they leave behind ([`JobState`]).

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::jobs::JobPaths;
use crate::logging::JobLogger;
use crate::models::{ClipArtifact, ProcessedDocument, Transcript, VideoAsset};
use crate::scenes::Segment;

use super::errors::ItemError;
use super::reporter::ProgressReporter;

/// Per-job inputs shared by every step. Steps never mutate it.
pub struct Context {
    pub job_id: String,
    /// The uploaded video.
    pub video: PathBuf,
    pub settings: Settings,
    pub paths: JobPaths,
    /// `<output>/<job_id>`.
    pub output_dir: PathBuf,
    /// Scratch directory under the temp root.
    pub work_dir: PathBuf,
    pub logger: Arc<JobLogger>,
    reporter: Option<Arc<ProgressReporter>>,
}

impl Context {
    pub fn new(
        job_id: impl Into<String>,
        video: impl Into<PathBuf>,
        settings: Settings,
        paths: JobPaths,
        output_dir: PathBuf,
        work_dir: PathBuf,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            video: video.into(),
            settings,
            paths,
            output_dir,
            work_dir,
            logger,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Persist `phase` at `percent` and echo it to the job log.
    pub fn report_progress(&self, phase: &str, percent: u8) {
        if let Some(ref reporter) = self.reporter {
            reporter.running(phase, percent);
        }
        self.logger.progress(u32::from(percent));
    }
}

/// Results accumulated across steps. Each step fills in its own fields and
/// leaves earlier ones untouched.
#[derive(Debug, Default)]
pub struct JobState {
    pub job_id: String,
    pub started_at: Option<String>,
    /// Set by Prepare.
    pub asset: Option<VideoAsset>,
    /// Set by Segment when sub-clips are persisted.
    pub segments: Option<Vec<Segment>>,
    pub transcript: Option<Transcript>,
    pub document: Option<ProcessedDocument>,
    /// One outcome per timeline item, in timeline order.
    pub clip_outcomes: Vec<Result<ClipArtifact, ItemError>>,
    /// Items whose clip fell back to the deterministic window.
    pub refinement_failures: Vec<ItemError>,
    /// Written documentation files.
    pub exported: Vec<PathBuf>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// GIFs that were produced, in timeline order.
    pub fn artifacts(&self) -> Vec<ClipArtifact> {
        self.clip_outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().ok().cloned())
            .collect()
    }

    pub fn item_errors(&self) -> impl Iterator<Item = &ItemError> {
        self.clip_outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().err())
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Step was skipped (not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::EncodeError;
    use crate::models::Clip;

    #[test]
    fn artifacts_skip_failed_items() {
        let mut state = JobState::new("job");
        let artifact = |i: usize| ClipArtifact {
            item_index: i,
            clip: Clip::from_start(0.0, 3.0, false),
            gif: PathBuf::from(format!("gifs/clip_{:03}.gif", i + 1)),
        };
        state.clip_outcomes = vec![
            Ok(artifact(0)),
            Err(ItemError::Encoding {
                item_index: 1,
                source: EncodeError::NoFrames { start: 0.0, end: 3.0 },
            }),
            Ok(artifact(2)),
        ];

        let indices: Vec<usize> = state.artifacts().iter().map(|a| a.item_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(state.item_errors().map(|e| e.item_index()).collect::<Vec<_>>(), vec![1]);
        assert!(state.started_at.is_some());
    }
}
