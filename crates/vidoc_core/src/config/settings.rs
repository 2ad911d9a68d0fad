//! Typed view of `vidoc.toml`.
//!
//! One struct per table. Every field has a serde default so a partial file,
//! or none at all, still yields complete settings.

use serde::{Deserialize, Serialize};

/// The whole settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Folder locations.
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Upload validation rules.
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Speech-to-text settings.
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Scene detection settings.
    #[serde(default)]
    pub scenes: SceneSettings,

    /// Persisted sub-clip settings.
    #[serde(default)]
    pub segments: SegmentSettings,

    /// Clip selection settings.
    #[serde(default)]
    pub clips: ClipSettings,

    /// GIF rendering settings.
    #[serde(default)]
    pub gif: GifSettings,

    /// Background worker settings.
    #[serde(default)]
    pub workers: WorkerSettings,

    /// Artifact cleanup settings.
    #[serde(default)]
    pub cleanup: CleanupSettings,
}

/// Folder locations for uploads, outputs, job records and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Where submitted videos are copied before processing.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,

    /// Where standalone segmentation writes sub-clips.
    #[serde(default = "default_segments_folder")]
    pub segments_folder: String,

    /// Root of per-job output directories.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Status record directory.
    #[serde(default = "default_jobs_folder")]
    pub jobs_folder: String,

    /// Per-job `<job_id>.log` files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Parent of the per-job scratch directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,
}

fn default_upload_folder() -> String {
    "data/input_videos".to_string()
}

fn default_segments_folder() -> String {
    "data/segments".to_string()
}

fn default_output_folder() -> String {
    "output".to_string()
}

fn default_jobs_folder() -> String {
    ".jobs".to_string()
}

fn default_logs_folder() -> String {
    "output/logs".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            upload_folder: default_upload_folder(),
            segments_folder: default_segments_folder(),
            output_folder: default_output_folder(),
            jobs_folder: default_jobs_folder(),
            logs_folder: default_logs_folder(),
            temp_root: default_temp_root(),
        }
    }
}

/// `[logging]`: per-job log behaviour and the process log level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format (filters progress noise).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show when a command fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// In compact mode, log progress once per this many percent.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Default tracing level (overridden by `RUST_LOG`).
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            level: default_level(),
        }
    }
}

/// Upload validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Accepted lowercase extensions.
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,

    /// Longest accepted video, in seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f64,
}

fn default_allowed_formats() -> Vec<String> {
    vec!["mp4".to_string(), "mov".to_string(), "webm".to_string()]
}

fn default_max_duration() -> f64 {
    900.0
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            allowed_formats: default_allowed_formats(),
            max_duration_secs: default_max_duration(),
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Whisper model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Python interpreter that has `whisper` installed.
    #[serde(default = "default_python")]
    pub python: String,

    /// Force a language instead of auto-detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

fn default_model() -> String {
    "small".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            python: default_python(),
            language: None,
        }
    }
}

/// Scene detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSettings {
    /// Histogram distance above which a cut is declared.
    #[serde(default = "default_scene_threshold")]
    pub threshold: f64,

    /// Width frames are scaled to before analysis.
    #[serde(default = "default_analysis_width")]
    pub analysis_width: u32,

    /// Height frames are scaled to before analysis.
    #[serde(default = "default_analysis_height")]
    pub analysis_height: u32,
}

fn default_scene_threshold() -> f64 {
    0.35
}

fn default_analysis_width() -> u32 {
    160
}

fn default_analysis_height() -> u32 {
    90
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            threshold: default_scene_threshold(),
            analysis_width: default_analysis_width(),
            analysis_height: default_analysis_height(),
        }
    }
}

/// Persisted sub-clip settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSettings {
    /// Cut the source into sub-clips as part of every job.
    #[serde(default)]
    pub persist: bool,

    /// Scene threshold used for segmentation.
    #[serde(default = "default_segment_threshold")]
    pub threshold: f64,

    /// Shortest interval kept, in seconds.
    #[serde(default = "default_min_length")]
    pub min_length: f64,

    /// Upper bound on the number of sub-clips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_segments: Option<usize>,
}

fn default_segment_threshold() -> f64 {
    0.4
}

fn default_min_length() -> f64 {
    1.0
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            persist: false,
            threshold: default_segment_threshold(),
            min_length: default_min_length(),
            max_segments: None,
        }
    }
}

/// Clip selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSettings {
    /// Requested clip length in seconds.
    #[serde(default = "default_target")]
    pub target: f64,

    #[serde(default = "default_min_len")]
    pub min_len: f64,

    #[serde(default = "default_max_len")]
    pub max_len: f64,

    /// Frames sampled per second during refinement.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Score added per sample that shows on-screen text.
    #[serde(default = "default_ocr_weight")]
    pub ocr_weight: f64,

    /// Use tesseract for text presence.
    #[serde(default)]
    pub ocr_enabled: bool,
}

fn default_target() -> f64 {
    3.0
}

fn default_min_len() -> f64 {
    2.0
}

fn default_max_len() -> f64 {
    4.0
}

fn default_sample_rate() -> f64 {
    2.0
}

fn default_ocr_weight() -> f64 {
    3.0
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            target: default_target(),
            min_len: default_min_len(),
            max_len: default_max_len(),
            sample_rate: default_sample_rate(),
            ocr_weight: default_ocr_weight(),
            ocr_enabled: false,
        }
    }
}

/// GIF rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GifSettings {
    #[serde(default = "default_gif_fps")]
    pub fps: u32,

    /// Output width; source width when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// gifski quality (1-100).
    #[serde(default = "default_gif_quality")]
    pub quality: u8,
}

fn default_gif_fps() -> u32 {
    15
}

fn default_gif_quality() -> u8 {
    80
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            fps: default_gif_fps(),
            width: None,
            quality: default_gif_quality(),
        }
    }
}

/// Background worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Number of jobs processed concurrently.
    #[serde(default = "default_worker_count")]
    pub count: usize,
}

fn default_worker_count() -> usize {
    2
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
        }
    }
}

/// Artifact cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupSettings {
    /// Age after which finished jobs' artifacts are removed.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    86_400
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// A table of the settings file, for [`ConfigManager::update_section`](super::ConfigManager::update_section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Validation,
    Transcription,
    Scenes,
    Segments,
    Clips,
    Gif,
    Workers,
    Cleanup,
}

impl ConfigSection {
    /// Every section in file order.
    pub const ALL: [ConfigSection; 10] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Validation,
        ConfigSection::Transcription,
        ConfigSection::Scenes,
        ConfigSection::Segments,
        ConfigSection::Clips,
        ConfigSection::Gif,
        ConfigSection::Workers,
        ConfigSection::Cleanup,
    ];

    /// Table header without brackets.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Validation => "validation",
            ConfigSection::Transcription => "transcription",
            ConfigSection::Scenes => "scenes",
            ConfigSection::Segments => "segments",
            ConfigSection::Clips => "clips",
            ConfigSection::Gif => "gif",
            ConfigSection::Workers => "workers",
            ConfigSection::Cleanup => "cleanup",
        }
    }

    /// Comment line written above the section.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Input, output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Validation => "Upload validation",
            ConfigSection::Transcription => "Speech-to-text",
            ConfigSection::Scenes => "Scene detection",
            ConfigSection::Segments => "Sub-clip segmentation",
            ConfigSection::Clips => "Illustrative clip selection",
            ConfigSection::Gif => "GIF rendering",
            ConfigSection::Workers => "Background workers",
            ConfigSection::Cleanup => "Finished job cleanup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        for section in ConfigSection::ALL {
            assert!(
                toml.contains(&format!("[{}]", section.table_name())),
                "missing [{}]",
                section.table_name()
            );
        }
        assert!(toml.contains("upload_folder"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.output_folder, settings.paths.output_folder);
        assert_eq!(parsed.clips.target, settings.clips.target);
        assert_eq!(parsed.gif.width, None);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\noutput_folder = \"custom_output\"\n[clips]\ntarget = 5.0";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.paths.output_folder, "custom_output");
        assert_eq!(parsed.paths.jobs_folder, ".jobs");
        assert_eq!(parsed.clips.target, 5.0);
        assert_eq!(parsed.clips.min_len, 2.0);
        assert!(parsed.logging.compact);
        assert_eq!(parsed.validation.allowed_formats, vec!["mp4", "mov", "webm"]);
    }
}
