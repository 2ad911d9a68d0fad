//! Upload validation run before a job leaves the queue.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ValidationSettings;
use crate::models::{ProblemCode, VideoAsset};
use crate::video::{self, ProbeError};

/// Outcome of validating one asset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub problems: BTreeSet<ProblemCode>,
}

impl ValidationReport {
    fn from_problems(problems: BTreeSet<ProblemCode>) -> Self {
        Self {
            ok: problems.is_empty(),
            problems,
        }
    }

    /// Report for an acceptable asset.
    pub fn valid() -> Self {
        Self::from_problems(BTreeSet::new())
    }

    pub fn has(&self, code: ProblemCode) -> bool {
        self.problems.contains(&code)
    }

    /// Human readable problem list, e.g. `"invalid_format, duration_too_long"`.
    pub fn describe(&self) -> String {
        self.problems
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Checks an asset against upload constraints.
pub trait UploadValidator: Send + Sync {
    fn validate(&self, asset: &VideoAsset) -> ValidationReport;
}

/// Function returning a file's duration in seconds.
pub type DurationProbe = Arc<dyn Fn(&Path) -> Result<f64, ProbeError> + Send + Sync>;

/// Extension allow-list plus an ffprobe duration check.
pub struct ProbeValidator {
    allowed_formats: Vec<String>,
    max_duration_secs: f64,
    probe: DurationProbe,
}

impl ProbeValidator {
    pub fn new(settings: &ValidationSettings) -> Self {
        Self {
            allowed_formats: settings
                .allowed_formats
                .iter()
                .map(|f| f.trim_start_matches('.').to_lowercase())
                .collect(),
            max_duration_secs: settings.max_duration_secs,
            probe: Arc::new(video::probe_duration),
        }
    }

    /// Replace the ffprobe call.
    pub fn with_probe(mut self, probe: DurationProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn is_allowed_format(&self, asset: &VideoAsset) -> bool {
        self.allowed_formats.iter().any(|f| *f == asset.format)
    }
}

impl UploadValidator for ProbeValidator {
    fn validate(&self, asset: &VideoAsset) -> ValidationReport {
        let mut problems = BTreeSet::new();

        if !asset.exists() {
            problems.insert(ProblemCode::FileNotFound);
            return ValidationReport::from_problems(problems);
        }

        if !self.is_allowed_format(asset) {
            problems.insert(ProblemCode::InvalidFormat);
        }

        match (self.probe)(&asset.path) {
            Ok(duration) if duration > self.max_duration_secs => {
                problems.insert(ProblemCode::DurationTooLong);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Validation] Duration probe failed: {}", e);
                problems.insert(ProblemCode::DurationUnreadable);
            }
        }

        ValidationReport::from_problems(problems)
    }
}
