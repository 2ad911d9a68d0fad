//! Runs one job end to end and records its status.

use std::path::PathBuf;
use std::sync::Arc;

use crate::clips::ClipSelector;
use crate::config::Settings;
use crate::export::{GifEncoder, GifskiEncoder};
use crate::jobs::{JobHandler, JobPaths, JobTicket, StatusRecord, StatusStore};
use crate::logging::{JobLogger, LogConfig, LogSink};
use crate::models::{ClipArtifact, ProblemCode, VideoAsset};
use crate::nlp::{DocumentProcessor, NlpError, RuleBasedProcessor};
use crate::scenes::{Cutter, FfmpegCutter, SceneDetector};
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::validation::{DurationProbe, ProbeValidator, UploadValidator, ValidationReport};
use crate::video;

use super::errors::{PipelineError, PipelineResult};
use super::pipeline::Pipeline;
use super::reporter::ProgressReporter;
use super::steps::{ClipsStep, ExportStep, NlpStep, PrepareStep, SegmentStep, TranscribeStep};
use super::types::{Context, JobState};

/// Collaborators the pipeline calls out to.
pub struct Services {
    pub validator: Arc<dyn UploadValidator>,
    pub duration_probe: DurationProbe,
    pub transcriber: Arc<dyn Transcriber>,
    pub processor: Arc<dyn DocumentProcessor>,
    pub clip_selector: Arc<ClipSelector>,
    pub encoder: Arc<dyn GifEncoder>,
    pub scene_detector: Arc<SceneDetector>,
    pub cutter: Arc<dyn Cutter>,
}

impl Services {
    /// Default implementations backed by ffprobe, ffmpeg, whisper and gifski.
    pub fn from_settings(settings: &Settings) -> Result<Self, NlpError> {
        let scene_detector = SceneDetector::new(settings.segments.threshold).with_analysis_size(
            settings.scenes.analysis_width,
            settings.scenes.analysis_height,
        );
        Ok(Self {
            validator: Arc::new(ProbeValidator::new(&settings.validation)),
            duration_probe: Arc::new(video::probe_duration),
            transcriber: Arc::new(WhisperTranscriber::new(&settings.transcription)),
            processor: Arc::new(RuleBasedProcessor::new()?),
            clip_selector: Arc::new(ClipSelector::from_settings(&settings.clips)),
            encoder: Arc::new(GifskiEncoder::new()),
            scene_detector: Arc::new(scene_detector),
            cutter: Arc::new(FfmpegCutter),
        })
    }
}

/// Steps in execution order. Segment is included only when sub-clips are
/// persisted.
pub fn create_standard_pipeline(services: &Services, settings: &Settings) -> Pipeline {
    let mut pipeline =
        Pipeline::new().with_step(PrepareStep::new(Arc::clone(&services.duration_probe)));
    if settings.segments.persist {
        pipeline.add_step(SegmentStep::new(
            Arc::clone(&services.scene_detector),
            Arc::clone(&services.cutter),
        ));
    }
    pipeline
        .with_step(TranscribeStep::new(Arc::clone(&services.transcriber)))
        .with_step(NlpStep::new(Arc::clone(&services.processor)))
        .with_step(ClipsStep::new(
            Arc::clone(&services.clip_selector),
            Arc::clone(&services.encoder),
        ))
        .with_step(ExportStep::new())
}

/// What a finished job produced.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub status: StatusRecord,
    pub output_dir: PathBuf,
    pub artifacts: Vec<ClipArtifact>,
    /// Per-item failures, rendered.
    pub item_errors: Vec<String>,
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

/// Drives jobs through the standard pipeline and owns their status writes.
pub struct JobRunner {
    settings: Settings,
    paths: JobPaths,
    store: Arc<dyn StatusStore>,
    services: Services,
    log_sink: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl JobRunner {
    pub fn new(settings: Settings, store: Arc<dyn StatusStore>, services: Services) -> Self {
        let paths = JobPaths::from_settings(&settings.paths);
        Self {
            settings,
            paths,
            store,
            services,
            log_sink: None,
        }
    }

    pub fn with_paths(mut self, paths: JobPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Mirror every job log line to `sink` (e.g. a terminal).
    pub fn with_log_sink(mut self, sink: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Run `ticket` to a terminal status.
    ///
    /// The upload is validated before anything beyond `Queued` is written;
    /// a rejected upload produces exactly one `Error` record. Any fatal
    /// failure is recorded with its message and trace and also returned.
    pub fn run(&self, ticket: &JobTicket) -> PipelineResult<JobReport> {
        let job_id = ticket.job_id.as_str();
        let reporter = ProgressReporter::attach(job_id, Arc::clone(&self.store))
            .map_err(|e| PipelineError::setup_failed(job_id, format!("status store: {}", e)))?;
        let reporter = Arc::new(reporter);
        if reporter.current().is_terminal() {
            return Err(PipelineError::setup_failed(
                job_id,
                format!("job already {}", reporter.current().status),
            ));
        }

        let logger = match self.open_logger(job_id) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                let e = PipelineError::setup_failed(job_id, format!("creating job log: {}", e));
                reporter.fail(&e.to_string(), Some(e.trace()));
                return Err(e);
            }
        };

        match self.execute(ticket, &reporter, &logger) {
            Ok(report) => Ok(report),
            Err(e) => {
                logger.error(&e.to_string());
                reporter.fail(&e.to_string(), Some(failure_trace(&e, &logger)));
                logger.close();
                Err(e)
            }
        }
    }

    fn open_logger(&self, job_id: &str) -> std::io::Result<JobLogger> {
        let sink: Option<LogSink> = self.log_sink.as_ref().map(|sink| {
            let sink = Arc::clone(sink);
            Box::new(move |line: &str| sink(line)) as LogSink
        });
        JobLogger::new(
            job_id,
            &self.paths.logs_dir,
            LogConfig::from_settings(&self.settings.logging),
            sink,
        )
    }

    fn execute(
        &self,
        ticket: &JobTicket,
        reporter: &Arc<ProgressReporter>,
        logger: &Arc<JobLogger>,
    ) -> PipelineResult<JobReport> {
        let job_id = ticket.job_id.as_str();
        let setup = |what: &str, e: &dyn std::fmt::Display| {
            PipelineError::setup_failed(job_id, format!("{}: {}", what, e))
        };

        logger.phase("Validate");
        let asset = VideoAsset::new(&ticket.video);
        let validation = self.services.validator.validate(&asset);
        if !validation.ok {
            let message = validation_message(&asset, &validation);
            return Err(PipelineError::validation_failed(job_id, message));
        }
        logger.validation(&format!("{} accepted", asset.display_name()));

        let output_dir = self
            .paths
            .job_output_dir(job_id)
            .map_err(|e| setup("output directory", &e))?;
        let work_dir = self
            .paths
            .job_temp_dir(job_id)
            .map_err(|e| setup("work directory", &e))?;

        let ctx = Context::new(
            job_id,
            &ticket.video,
            self.settings.clone(),
            self.paths.clone(),
            output_dir.clone(),
            work_dir.clone(),
            Arc::clone(logger),
        )
        .with_reporter(Arc::clone(reporter));
        let mut state = JobState::new(job_id);

        let pipeline = create_standard_pipeline(&self.services, &self.settings);
        let result = pipeline.run(&ctx, &mut state);

        if work_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&work_dir) {
                logger.warn(&format!("Could not remove {}: {}", work_dir.display(), e));
            }
        }
        let run = result?;

        reporter.complete();
        let item_errors: Vec<String> = state.item_errors().map(|e| e.to_string()).collect();
        let artifacts = state.artifacts();
        logger.success(&format!(
            "Job complete: {} clip(s), {} item failure(s)",
            artifacts.len(),
            item_errors.len()
        ));
        logger.close();

        Ok(JobReport {
            job_id: job_id.to_string(),
            status: reporter.current(),
            output_dir,
            artifacts,
            item_errors,
            steps_completed: run.steps_completed,
            steps_skipped: run.steps_skipped,
        })
    }
}

impl JobHandler for JobRunner {
    fn handle(&self, ticket: &JobTicket) {
        match self.run(ticket) {
            Ok(report) => tracing::info!(
                "[Runner] Job {} completed with {} clip(s)",
                report.job_id,
                report.artifacts.len()
            ),
            Err(e) => tracing::warn!("[Runner] Job {} failed: {}", ticket.job_id, e),
        }
    }
}

/// Error chain followed by the last lines of the job log.
fn failure_trace(error: &PipelineError, logger: &JobLogger) -> String {
    let mut trace = error.trace();
    let recent = logger.recent_lines();
    if !recent.is_empty() {
        trace.push_str("\nrecent log:\n");
        trace.push_str(&recent.join("\n"));
    }
    trace
}

fn validation_message(asset: &VideoAsset, report: &ValidationReport) -> String {
    if report.has(ProblemCode::FileNotFound) {
        format!("Input video not found: {}", asset.path.display())
    } else {
        format!(
            "Input video {} rejected: {}",
            asset.display_name(),
            report.describe()
        )
    }
}
