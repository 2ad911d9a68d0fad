//! Progress reporting through the status store.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::jobs::{StatusRecord, StatusStore, StoreResult};

/// Single writer of one job's status record.
///
/// Progress never decreases: a lower value than the current one is raised to
/// it. Once a terminal record has been written every further write is
/// refused.
pub struct ProgressReporter {
    job_id: String,
    store: Arc<dyn StatusStore>,
    current: Mutex<StatusRecord>,
}

impl ProgressReporter {
    /// Attach to the job's record, writing a `Queued` one if none exists.
    pub fn attach(job_id: &str, store: Arc<dyn StatusStore>) -> StoreResult<Self> {
        let current = match store.get(job_id)? {
            Some(record) => record,
            None => {
                let record = StatusRecord::queued(job_id);
                store.put(job_id, &record)?;
                record
            }
        };
        Ok(Self {
            job_id: job_id.to_string(),
            store,
            current: Mutex::new(current),
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Last record written (or read at attach time).
    pub fn current(&self) -> StatusRecord {
        self.current.lock().clone()
    }

    /// `Running` in `phase`. Returns false when the write was refused.
    pub fn running(&self, phase: &str, progress: u8) -> bool {
        self.apply(|record| {
            let progress = progress.max(record.progress);
            record.running(phase, progress)
        })
    }

    pub fn complete(&self) -> bool {
        self.apply(|record| record.completed())
    }

    pub fn fail(&self, message: &str, trace: Option<String>) -> bool {
        self.apply(|record| record.failed(message, trace))
    }

    fn apply<F>(&self, change: F) -> bool
    where
        F: FnOnce(&StatusRecord) -> Result<StatusRecord, crate::jobs::TransitionError>,
    {
        let mut current = self.current.lock();
        let next = match change(&current) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("[Reporter] Refused status write: {}", e);
                return false;
            }
        };
        if let Err(e) = self.store.put(&self.job_id, &next) {
            tracing::error!("[Reporter] Failed to persist status of {}: {}", self.job_id, e);
        }
        *current = next;
        true
    }
}
