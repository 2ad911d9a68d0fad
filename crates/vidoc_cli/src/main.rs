//! `vidoc` CLI - turn screen recordings into step-by-step documentation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use vidoc_core::config::{ConfigManager, Settings};
use vidoc_core::jobs::{
    intake, new_job_id, FileStatusStore, JobCleaner, JobPaths, JobTicket, StatusStore, WorkerPool,
};
use vidoc_core::logging::{init_tracing, LogLevel};
use vidoc_core::orchestrator::{JobRunner, Services};
use vidoc_core::scenes::{
    auto_segment, discover_videos, segment_directory, summarize, FileOutcome, KeyframeExtractor,
    SceneDetector,
};

#[derive(Parser)]
#[command(name = "vidoc")]
#[command(about = "Turn a screen recording into documentation with illustrative GIFs")]
#[command(version)]
struct Cli {
    /// Settings file (created with defaults when missing)
    #[arg(short, long, global = true, default_value = ".config/vidoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one video and wait for it to finish
    Run {
        /// Video file to document
        video: PathBuf,

        /// Job id to use instead of a generated one
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Queue several videos on the worker pool and wait for all of them
    Submit {
        /// Video files to document
        #[arg(required = true)]
        videos: Vec<PathBuf>,
    },

    /// Print the status record of a job
    Status {
        /// Job id
        job_id: String,
    },

    /// Split a video, or every video in a directory, at scene changes
    Segment {
        /// Video file or directory of videos
        input: PathBuf,

        /// Scene change threshold (0-1]
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Shortest segment kept, in seconds
        #[arg(long)]
        min_length: Option<f64>,

        /// Keep at most this many segments per video
        #[arg(long)]
        max_segments: Option<usize>,
    },

    /// List the scenes of a video
    Scenes {
        /// Video file
        video: PathBuf,

        /// Scene change threshold (0-1]
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Save one sharp still per scene
    Keyframes {
        /// Video file
        video: PathBuf,

        /// Directory for scene_NNN.jpg files
        out_dir: PathBuf,

        /// Laplacian variance below which a frame counts as blurry
        #[arg(long, default_value = "120")]
        blur_threshold: f64,
    },

    /// Delete artifacts of finished jobs older than the TTL
    Clean {
        /// Override the configured TTL in seconds
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let settings = config.settings().clone();

    init_tracing(LogLevel::parse(&settings.logging.level).unwrap_or(LogLevel::Info));
    config.ensure_dirs_exist()?;

    match cli.command {
        Commands::Run { video, job_id } => cmd_run(settings, &video, job_id),
        Commands::Submit { videos } => cmd_submit(settings, &videos),
        Commands::Status { job_id } => cmd_status(&settings, &job_id),
        Commands::Segment {
            input,
            threshold,
            min_length,
            max_segments,
        } => cmd_segment(settings, &input, threshold, min_length, max_segments),
        Commands::Scenes { video, threshold } => cmd_scenes(&settings, &video, threshold),
        Commands::Keyframes {
            video,
            out_dir,
            blur_threshold,
        } => cmd_keyframes(&settings, &video, &out_dir, blur_threshold),
        Commands::Clean { ttl_secs } => cmd_clean(&settings, ttl_secs),
    }
}

fn status_store(paths: &JobPaths) -> Arc<dyn StatusStore> {
    Arc::new(FileStatusStore::new(&paths.jobs_dir))
}

/// Pool running the standard pipeline. With `echo`, job log lines are
/// mirrored to stderr.
fn start_pool(settings: Settings, store: &Arc<dyn StatusStore>, echo: bool) -> Result<WorkerPool> {
    let services = Services::from_settings(&settings)?;
    let count = settings.workers.count;
    let mut runner = JobRunner::new(settings, Arc::clone(store), services);
    if echo {
        runner = runner.with_log_sink(Arc::new(|line: &str| eprintln!("{}", line)));
    }
    Ok(WorkerPool::new(count, Arc::new(runner), Arc::clone(store))?)
}

fn print_status(store: &dyn StatusStore, job_id: &str) -> Result<()> {
    match store.get(job_id)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("{}: not yet present", job_id),
    }
    Ok(())
}

fn cmd_run(settings: Settings, video: &Path, job_id: Option<String>) -> Result<()> {
    let paths = JobPaths::from_settings(&settings.paths);
    let store = status_store(&paths);
    let job_id = job_id.unwrap_or_else(new_job_id);

    let pool = start_pool(settings, &store, true)?;
    pool.submit(JobTicket::new(&job_id, video))?;
    pool.shutdown();

    print_status(store.as_ref(), &job_id)?;
    if let Ok(dir) = paths.job_output_dir(&job_id) {
        println!("Output: {}", dir.display());
    }
    Ok(())
}

fn cmd_submit(settings: Settings, videos: &[PathBuf]) -> Result<()> {
    let paths = JobPaths::from_settings(&settings.paths);
    let store = status_store(&paths);
    let pool = start_pool(settings, &store, false)?;

    let mut job_ids = Vec::with_capacity(videos.len());
    for video in videos {
        let job_id = new_job_id();
        let upload = match intake(&paths, &job_id, video) {
            Ok(upload) => upload,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", video.display(), e);
                continue;
            }
        };
        pool.submit(JobTicket::new(&job_id, upload))?;
        println!("{} <- {}", job_id, video.display());
        job_ids.push(job_id);
    }
    pool.shutdown();

    for job_id in &job_ids {
        print_status(store.as_ref(), job_id)?;
    }
    Ok(())
}

fn cmd_status(settings: &Settings, job_id: &str) -> Result<()> {
    let paths = JobPaths::from_settings(&settings.paths);
    print_status(status_store(&paths).as_ref(), job_id)
}

fn cmd_segment(
    mut settings: Settings,
    input: &Path,
    threshold: Option<f64>,
    min_length: Option<f64>,
    max_segments: Option<usize>,
) -> Result<()> {
    if let Some(threshold) = threshold {
        settings.segments.threshold = threshold;
    }
    if let Some(min_length) = min_length {
        settings.segments.min_length = min_length;
    }
    if max_segments.is_some() {
        settings.segments.max_segments = max_segments;
    }

    let detector = SceneDetector::new(settings.segments.threshold).with_analysis_size(
        settings.scenes.analysis_width,
        settings.scenes.analysis_height,
    );
    let out_dir = PathBuf::from(&settings.paths.segments_folder);

    if input.is_dir() {
        if discover_videos(input)?.is_empty() {
            bail!("no video files in {}", input.display());
        }
        let results = segment_directory(input, &out_dir, &settings.segments, &detector)?;
        for (path, outcome) in &results {
            match outcome {
                FileOutcome::Success { segments } => {
                    println!("{}: {} segment(s)", path.display(), segments.len())
                }
                FileOutcome::Error { error } => println!("{}: error: {}", path.display(), error),
            }
        }
        println!("{}", serde_json::to_string_pretty(&summarize(&results))?);
    } else {
        let segments = auto_segment(input, &settings.segments, &detector, &out_dir)?;
        for segment in &segments {
            println!("{} -> {}", segment.range, segment.path.display());
        }
        println!("{} segment(s) in {}", segments.len(), out_dir.display());
    }
    Ok(())
}

fn cmd_scenes(settings: &Settings, video: &Path, threshold: Option<f64>) -> Result<()> {
    if !video.is_file() {
        bail!("video not found: {}", video.display());
    }
    let mut scene_settings = settings.scenes.clone();
    if let Some(threshold) = threshold {
        scene_settings.threshold = threshold;
    }
    let detector = SceneDetector::from_settings(&scene_settings);

    let list = detector.detect(video);
    for (idx, scene) in list.scenes.iter().enumerate() {
        println!(
            "{:>3}  frames {:>6}-{:<6}  {}",
            idx + 1,
            scene.start_frame,
            scene.end_frame,
            scene.to_time_range(list.fps)
        );
    }
    println!("{} scene(s) at {:.3} fps", list.scenes.len(), list.fps);
    Ok(())
}

fn cmd_keyframes(
    settings: &Settings,
    video: &Path,
    out_dir: &Path,
    blur_threshold: f64,
) -> Result<()> {
    let scenes = SceneDetector::from_settings(&settings.scenes).detect(video);
    let written = KeyframeExtractor::new(blur_threshold).extract(video, &scenes, out_dir)?;
    for path in &written {
        println!("{}", path.display());
    }
    println!("{}/{} keyframe(s) saved", written.len(), scenes.scenes.len());
    Ok(())
}

fn cmd_clean(settings: &Settings, ttl_secs: Option<u64>) -> Result<()> {
    let paths = JobPaths::from_settings(&settings.paths);
    let ttl = Duration::from_secs(ttl_secs.unwrap_or(settings.cleanup.ttl_secs));
    let report = JobCleaner::new(paths.clone(), status_store(&paths), ttl).sweep()?;

    for job_id in &report.removed {
        println!("removed {}", job_id);
    }
    for failure in &report.failures {
        println!("could not remove {}", failure);
    }
    println!(
        "{} removed, {} kept, {} failure(s)",
        report.removed.len(),
        report.kept,
        report.failures.len()
    );
    Ok(())
}
