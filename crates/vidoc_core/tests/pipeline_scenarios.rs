//! End-to-end job scenarios driven through the public API with in-process
//! collaborators, so no external tools are needed.

use std::path::Path;
use std::sync::Arc;

use image::{GrayImage, Luma};
use parking_lot::Mutex;

use vidoc_core::clips::{ClipSelector, FrameSampler, NoTextDetector, SampledFrame, SamplingError};
use vidoc_core::config::Settings;
use vidoc_core::export::{EncodeError, GifEncoder, GifRequest, JSON_FILE_NAME};
use vidoc_core::jobs::{
    JobPaths, JobStatus, JobTicket, MemoryStatusStore, StatusRecord, StatusStore, StoreResult,
};
use vidoc_core::models::{ProblemCode, TimeRange, Transcript, Utterance, VideoAsset};
use vidoc_core::nlp::RuleBasedProcessor;
use vidoc_core::orchestrator::{JobRunner, PipelineError, Services};
use vidoc_core::scenes::{plan_segments, Cutter, SceneDetector, SegmentError};
use vidoc_core::transcription::{Transcriber, TranscriptionError};
use vidoc_core::validation::{ProbeValidator, UploadValidator, ValidationReport};
use vidoc_core::video::ProbeError;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

struct AcceptAll;

impl UploadValidator for AcceptAll {
    fn validate(&self, _asset: &VideoAsset) -> ValidationReport {
        ValidationReport::valid()
    }
}

struct ScriptedTranscriber {
    lines: Vec<(f64, f64, &'static str)>,
}

impl Transcriber for ScriptedTranscriber {
    fn transcribe(&self, media: &Path, _work_dir: &Path) -> Result<Transcript, TranscriptionError> {
        if !media.exists() {
            return Err(TranscriptionError::NotFound(media.to_path_buf()));
        }
        Ok(Transcript {
            utterances: self
                .lines
                .iter()
                .map(|(start, end, text)| Utterance {
                    start: *start,
                    end: *end,
                    text: text.to_string(),
                    confidence: 0.9,
                })
                .collect(),
            duration: 60.0,
            language: "en".into(),
            model: "scripted".into(),
        })
    }
}

struct NoFrames;

impl FrameSampler for NoFrames {
    fn sample(&self, _: &Path, start: f64, end: f64, _: f64) -> Result<Vec<SampledFrame>, SamplingError> {
        Err(SamplingError::NoFrames { start, end })
    }
}

/// Writes a placeholder GIF, except for one output name.
struct SelectiveEncoder {
    fail_name: &'static str,
}

impl GifEncoder for SelectiveEncoder {
    fn encode(&self, request: &GifRequest) -> Result<std::path::PathBuf, EncodeError> {
        let name = request
            .output
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name == self.fail_name {
            return Err(EncodeError::CommandFailed {
                tool: "gifski".into(),
                exit_code: 1,
                message: "encoder crashed".into(),
            });
        }
        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&request.output, b"GIF89a")?;
        Ok(request.output.clone())
    }
}

/// Panics on one output name, otherwise behaves like [`SelectiveEncoder`].
struct PanickingEncoder {
    panic_name: &'static str,
}

impl GifEncoder for PanickingEncoder {
    fn encode(&self, request: &GifRequest) -> Result<std::path::PathBuf, EncodeError> {
        if request.output.ends_with(self.panic_name) {
            panic!("palette overflow in {}", self.panic_name);
        }
        SelectiveEncoder { fail_name: "" }.encode(request)
    }
}

struct NoGifs;

impl GifEncoder for NoGifs {
    fn encode(&self, request: &GifRequest) -> Result<std::path::PathBuf, EncodeError> {
        Err(EncodeError::NoFrames {
            start: request.clip.start,
            end: request.clip.end,
        })
    }
}

struct NeverCut;

impl Cutter for NeverCut {
    fn cut(&self, _: &Path, range: TimeRange, _: &Path) -> Result<(), SegmentError> {
        panic!("segmentation is disabled, {} should not be cut", range);
    }
}

/// Keeps every record written, in order.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStatusStore,
    history: Mutex<Vec<StatusRecord>>,
}

impl StatusStore for RecordingStore {
    fn get(&self, job_id: &str) -> StoreResult<Option<StatusRecord>> {
        self.inner.get(job_id)
    }

    fn put(&self, job_id: &str, record: &StatusRecord) -> StoreResult<()> {
        self.history.lock().push(record.clone());
        self.inner.put(job_id, record)
    }

    fn remove(&self, job_id: &str) -> StoreResult<()> {
        self.inner.remove(job_id)
    }

    fn job_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.job_ids()
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.segments.persist = false;
    settings
}

fn services(settings: &Settings, validator: Arc<dyn UploadValidator>) -> Services {
    Services {
        validator,
        duration_probe: Arc::new(|_: &Path| Ok::<f64, ProbeError>(60.0)),
        transcriber: Arc::new(ScriptedTranscriber {
            lines: vec![
                (1.0, 4.0, "Click the File menu at the top"),
                (10.0, 14.0, "Select the export option from the list"),
                (20.0, 24.0, "Press the green button to confirm"),
            ],
        }),
        processor: Arc::new(RuleBasedProcessor::new().unwrap()),
        clip_selector: Arc::new(ClipSelector::new(
            &settings.clips,
            Arc::new(NoFrames),
            Arc::new(NoTextDetector),
        )),
        encoder: Arc::new(SelectiveEncoder {
            fail_name: "clip_002.gif",
        }),
        scene_detector: Arc::new(SceneDetector::new(0.3)),
        cutter: Arc::new(NeverCut),
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

#[test]
fn three_flat_shots_become_three_scenes() {
    let frames = (0..100u32).map(|i| {
        let level = match i {
            0..=29 => 0,
            30..=64 => 255,
            _ => 128,
        };
        GrayImage::from_pixel(8, 8, Luma([level]))
    });

    let scenes = SceneDetector::new(0.3).segment_frames(frames);
    let ranges: Vec<TimeRange> = scenes.iter().map(|s| s.to_time_range(10.0)).collect();
    assert_eq!(
        ranges,
        vec![
            TimeRange::new(0.0, 3.0),
            TimeRange::new(3.0, 6.5),
            TimeRange::new(6.5, 10.0)
        ]
    );

    let cuts: Vec<f64> = ranges.iter().skip(1).map(|r| r.start).collect();
    let plan = plan_segments(&cuts, 10.0, 1.0, None);
    assert_eq!(plan.kept, ranges);
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[test]
fn failed_encode_only_drops_that_item() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("lesson.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let settings = settings();
    let store = Arc::new(MemoryStatusStore::default());
    let runner = JobRunner::new(
        settings.clone(),
        store.clone(),
        services(&settings, Arc::new(AcceptAll)),
    )
    .with_paths(JobPaths::under(dir.path()));

    let report = runner.run(&JobTicket::new("job-encode", &video)).unwrap();

    assert_eq!(report.status.status, JobStatus::Completed);
    assert_eq!(report.status.progress, 100);
    let indices: Vec<usize> = report.artifacts.iter().map(|a| a.item_index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(report.item_errors.iter().any(|e| e.contains("encoder crashed")));
    assert!(report.output_dir.join("gifs/clip_001.gif").exists());
    assert!(!report.output_dir.join("gifs/clip_002.gif").exists());

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(report.output_dir.join(JSON_FILE_NAME)).unwrap(),
    )
    .unwrap();
    assert_eq!(
        json["metadata"]["created_gifs"],
        serde_json::json!(["gifs/clip_001.gif", "gifs/clip_003.gif"])
    );
    assert_eq!(json["timeline"].as_array().unwrap().len(), 3);
    assert!(json["timeline"][1].get("gif").is_none());

    let stored = store.get("job-encode").unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
}

#[test]
fn panicking_encode_only_drops_that_item() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("lesson.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let settings = settings();
    let mut services = services(&settings, Arc::new(AcceptAll));
    services.encoder = Arc::new(PanickingEncoder {
        panic_name: "clip_002.gif",
    });
    let store = Arc::new(MemoryStatusStore::default());
    let runner = JobRunner::new(settings.clone(), store.clone(), services)
        .with_paths(JobPaths::under(dir.path()));

    let report = runner.run(&JobTicket::new("job-panic", &video)).unwrap();

    assert_eq!(report.status.status, JobStatus::Completed);
    let indices: Vec<usize> = report.artifacts.iter().map(|a| a.item_index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(report.item_errors.iter().any(|e| e.contains("palette overflow")));
    assert!(!report.output_dir.join("gifs/clip_002.gif").exists());
    assert_eq!(
        store.get("job-panic").unwrap().unwrap().status,
        JobStatus::Completed
    );
}

#[test]
fn clip_progress_counts_only_produced_gifs() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("lesson.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let settings = settings();
    let mut services = services(&settings, Arc::new(AcceptAll));
    services.encoder = Arc::new(NoGifs);
    let store = Arc::new(RecordingStore::default());
    let runner = JobRunner::new(settings.clone(), store.clone(), services)
        .with_paths(JobPaths::under(dir.path()));

    let report = runner.run(&JobTicket::new("job-nogifs", &video)).unwrap();
    assert_eq!(report.status.status, JobStatus::Completed);
    assert!(report.artifacts.is_empty());

    let history = store.history.lock();
    let clip_progress: Vec<u8> = history
        .iter()
        .filter(|r| r.phase == "Generating clips")
        .map(|r| r.progress)
        .collect();
    assert!(!clip_progress.is_empty());
    assert!(clip_progress.iter().all(|p| *p == 70));

    let export = history
        .iter()
        .position(|r| r.phase == "Exporting")
        .unwrap();
    let last_clip = history
        .iter()
        .rposition(|r| r.phase == "Generating clips")
        .unwrap();
    assert!(last_clip < export);
}

#[test]
fn missing_upload_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings();
    let store = Arc::new(RecordingStore::default());
    let validator = Arc::new(ProbeValidator::new(&settings.validation).with_probe(Arc::new(
        |_: &Path| Ok::<f64, ProbeError>(10.0),
    )));
    let runner = JobRunner::new(settings.clone(), store.clone(), services(&settings, validator))
        .with_paths(JobPaths::under(dir.path()));

    let missing = dir.path().join("gone.mp4");
    let err = runner.run(&JobTicket::new("job-missing", &missing)).unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailed { .. }));

    let history = store.history.lock();
    assert!(history.iter().all(|r| r.status != JobStatus::Running));
    let last = history.last().unwrap();
    assert_eq!(last.status, JobStatus::Error);
    assert!(last
        .error_message
        .as_deref()
        .unwrap()
        .contains("not found"));
    assert_eq!(
        history.iter().filter(|r| r.status == JobStatus::Error).count(),
        1
    );
}

#[test]
fn rejected_format_is_reported_by_code() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("notes.txt");
    std::fs::write(&upload, b"text").unwrap();

    let settings = settings();
    let validator = ProbeValidator::new(&settings.validation).with_probe(Arc::new(|_: &Path| Ok::<f64, ProbeError>(5.0)));
    let report = validator.validate(&VideoAsset::new(&upload));
    assert!(!report.ok);
    assert!(report.has(ProblemCode::InvalidFormat));

    let store = Arc::new(MemoryStatusStore::default());
    let runner = JobRunner::new(
        settings.clone(),
        store.clone(),
        services(&settings, Arc::new(validator)),
    )
    .with_paths(JobPaths::under(dir.path()));
    let err = runner.run(&JobTicket::new("job-format", &upload)).unwrap_err();
    assert!(err.to_string().contains("invalid_format"));

    let record = store.get("job-format").unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
}

#[test]
fn finished_job_is_not_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("lesson.mp4");
    std::fs::write(&video, b"video").unwrap();

    let settings = settings();
    let store = Arc::new(MemoryStatusStore::default());
    let runner = JobRunner::new(
        settings.clone(),
        store.clone(),
        services(&settings, Arc::new(AcceptAll)),
    )
    .with_paths(JobPaths::under(dir.path()));

    let ticket = JobTicket::new("job-twice", &video);
    runner.run(&ticket).unwrap();
    let err = runner.run(&ticket).unwrap_err();
    assert!(matches!(err, PipelineError::SetupFailed { .. }));
    assert_eq!(
        store.get("job-twice").unwrap().unwrap().status,
        JobStatus::Completed
    );
}
