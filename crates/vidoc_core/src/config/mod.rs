//! Configuration management.
//!
//! TOML settings split into sections (`[paths]`, `[clips]`, ...), written
//! atomically and updatable one section at a time.
//!
//! # Example
//!
//! ```no_run
//! use vidoc_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/vidoc.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().clips.ocr_enabled = true;
//! config.update_section(ConfigSection::Clips).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CleanupSettings, ClipSettings, ConfigSection, GifSettings, LoggingSettings, PathSettings,
    SceneSettings, SegmentSettings, Settings, TranscriptionSettings, ValidationSettings,
    WorkerSettings,
};
