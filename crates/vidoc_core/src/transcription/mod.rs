//! Speech-to-text.

mod whisper;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Transcript;

pub use whisper::{parse_whisper_output, WhisperTranscriber};

/// Errors from transcription.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse transcription output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a media file into a timed transcript.
pub trait Transcriber: Send + Sync {
    /// Transcribe `media`, using `work_dir` for intermediate files.
    fn transcribe(&self, media: &Path, work_dir: &Path) -> Result<Transcript, TranscriptionError>;
}
