//! Job, step and item errors.
//!
//! A [`PipelineError`] ends the job. It wraps the [`StepError`] that caused
//! it, which in turn keeps the collaborator error as its source. An
//! [`ItemError`] only costs one timeline item its GIF.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::io;

use thiserror::Error;

use crate::clips::RefineError;
use crate::export::{EncodeError, ExportError};
use crate::nlp::NlpError;
use crate::scenes::SegmentError;
use crate::transcription::TranscriptionError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Job-level failure. Always terminal.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The upload validator rejected the input.
    #[error("Job '{job_id}' failed validation: {message}")]
    ValidationFailed { job_id: String, message: String },

    /// A step failed during execution.
    #[error("Job '{job_id}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Failed to set up job (create directories, logger, etc.).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },

    /// A step panicked.
    #[error("Job '{job_id}' panicked in step '{step_name}': {message}")]
    Panicked {
        job_id: String,
        step_name: String,
        message: String,
        backtrace: String,
    },
}

impl PipelineError {
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn validation_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Text stored as `error_trace`.
    ///
    /// For ordinary failures this is the failing step followed by the error
    /// and one `caused by:` line per source. For panics it is the payload and
    /// a backtrace captured where the panic was caught.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Panicked {
                step_name,
                message,
                backtrace,
                ..
            } => {
                let _ = writeln!(out, "step: {}", step_name);
                let _ = writeln!(out, "panic: {}", message);
                out.push_str(backtrace);
            }
            other => {
                if let Self::StepFailed { step_name, .. } = other {
                    let _ = writeln!(out, "step: {}", step_name);
                }
                let _ = writeln!(out, "{}", other);
                let mut source = other.source();
                while let Some(cause) = source {
                    let _ = writeln!(out, "caused by: {}", cause);
                    source = cause.source();
                }
            }
        }
        out
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Input not found: {path}")]
    InputNotFound { path: String },

    #[error("Invalid time range: {start:.3}s to {end:.3}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Duration {duration:.1}s exceeds the {max:.1}s limit")]
    DurationExceeded { duration: f64, max: f64 },

    #[error("Transcription failed: {source}")]
    TranscriptionFailure {
        #[source]
        source: TranscriptionError,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {what}: {message}")]
    ParseError { what: String, message: String },

    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StepError {
    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn parse_error(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a lower-level error under a short description.
    pub fn caused_by(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<TranscriptionError> for StepError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::NotFound(path) => Self::input_not_found(path.display().to_string()),
            source => Self::TranscriptionFailure { source },
        }
    }
}

impl From<SegmentError> for StepError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::NotFound(path) => Self::input_not_found(path.display().to_string()),
            SegmentError::InvalidRange { start, end } => Self::InvalidRange { start, end },
            SegmentError::CommandFailed {
                tool,
                exit_code,
                message,
            } => Self::CommandFailed {
                tool,
                exit_code,
                message,
            },
            SegmentError::Io(source) => Self::io_error("cutting segments", source),
        }
    }
}

impl From<NlpError> for StepError {
    fn from(err: NlpError) -> Self {
        Self::caused_by("Document processing failed", err)
    }
}

impl From<ExportError> for StepError {
    fn from(err: ExportError) -> Self {
        Self::caused_by("Export failed", err)
    }
}

/// Per-item failure in clip generation. Logged and skipped.
#[derive(Error, Debug)]
pub enum ItemError {
    /// Refinement fell back to the deterministic clip.
    #[error("Item {item_index}: clip refinement failed: {source}")]
    Refinement {
        item_index: usize,
        #[source]
        source: RefineError,
    },

    /// The GIF for this item could not be produced.
    #[error("Item {item_index}: GIF encoding failed: {source}")]
    Encoding {
        item_index: usize,
        #[source]
        source: EncodeError,
    },
}

impl ItemError {
    pub fn item_index(&self) -> usize {
        match self {
            Self::Refinement { item_index, .. } | Self::Encoding { item_index, .. } => *item_index,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::command_failed("gifski", 1, "no frames");
        let msg = err.to_string();
        assert!(msg.contains("gifski"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("no frames"));
    }

    #[test]
    fn trace_lists_source_chain() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = PipelineError::step_failed(
            "job-1",
            "Transcribe",
            StepError::from(TranscriptionError::Io(io)),
        );
        let trace = err.trace();
        assert!(trace.starts_with("step: Transcribe\n"));
        assert!(trace.contains("caused by: Transcription failed"));
        assert!(trace.contains("caused by: I/O error: denied"));
    }

    #[test]
    fn missing_inputs_map_to_not_found() {
        let err = StepError::from(SegmentError::NotFound("/v/a.mp4".into()));
        assert!(matches!(err, StepError::InputNotFound { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn panic_trace_carries_payload() {
        let err = PipelineError::Panicked {
            job_id: "j".into(),
            step_name: "Clips".into(),
            message: "index out of bounds".into(),
            backtrace: "   0: frame".into(),
        };
        assert!(err.trace().contains("panic: index out of bounds"));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn every_pipeline_error_has_a_message() {
        let errors = [
            PipelineError::validation_failed("j", "Input video not found: x"),
            PipelineError::setup_failed("j", "no space"),
            PipelineError::step_failed("j", "Nlp", StepError::other("bad")),
        ];
        for err in errors {
            assert!(!err.to_string().trim().is_empty());
        }
    }
}
