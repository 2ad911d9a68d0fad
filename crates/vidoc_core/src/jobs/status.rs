//! Job status records and their state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Completed and Error are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected status changes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Job {job_id} is already {status}")]
    Terminal { job_id: String, status: JobStatus },

    #[error("Job {job_id} cannot go from {from} to {to}")]
    Invalid {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} progress cannot drop from {from} to {to}")]
    ProgressRegressed { job_id: String, from: u8, to: u8 },
}

/// Message used when a failure carries no text of its own.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Persisted state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub phase: String,
    /// 0-100, never decreases within a run.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_trace: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

impl StatusRecord {
    /// Fresh record for a submitted job.
    pub fn queued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            phase: "Queued".to_string(),
            progress: 0,
            error_message: None,
            error_trace: None,
            updated_at: now_rfc3339(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Time of the last write, if the stored timestamp parses.
    pub fn updated_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|t| t.with_timezone(&chrono::Utc))
    }

    /// Move to `Running` in `phase` at `progress` (capped at 100).
    pub fn running(&self, phase: &str, progress: u8) -> Result<Self, TransitionError> {
        let progress = progress.min(100);
        self.check(JobStatus::Running)?;
        if progress < self.progress {
            return Err(TransitionError::ProgressRegressed {
                job_id: self.job_id.clone(),
                from: self.progress,
                to: progress,
            });
        }
        Ok(Self {
            status: JobStatus::Running,
            phase: phase.to_string(),
            progress,
            updated_at: now_rfc3339(),
            ..self.clone()
        })
    }

    /// Move to `Completed` at 100%.
    pub fn completed(&self) -> Result<Self, TransitionError> {
        self.check(JobStatus::Completed)?;
        Ok(Self {
            status: JobStatus::Completed,
            phase: "Complete".to_string(),
            progress: 100,
            updated_at: now_rfc3339(),
            ..self.clone()
        })
    }

    /// Move to `Error`, keeping the current phase and progress.
    ///
    /// An empty message is replaced so that error records always explain
    /// themselves.
    pub fn failed(&self, message: &str, trace: Option<String>) -> Result<Self, TransitionError> {
        self.check(JobStatus::Error)?;
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message.to_string()
        };
        Ok(Self {
            status: JobStatus::Error,
            error_message: Some(message),
            error_trace: trace.filter(|t| !t.is_empty()),
            updated_at: now_rfc3339(),
            ..self.clone()
        })
    }

    fn check(&self, to: JobStatus) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                job_id: self.job_id.clone(),
                status: self.status,
            });
        }
        let allowed = match (self.status, to) {
            (JobStatus::Queued, JobStatus::Running | JobStatus::Error) => true,
            (JobStatus::Running, JobStatus::Running | JobStatus::Completed | JobStatus::Error) => {
                true
            }
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::Invalid {
                job_id: self.job_id.clone(),
                from: self.status,
                to,
            })
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
