//! TTL sweep of finished jobs' artifacts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::paths::JobPaths;
use super::store::{StatusStore, StoreResult};

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// Job ids whose artifacts were removed.
    pub removed: Vec<String>,
    /// Records left alone (not terminal or not old enough).
    pub kept: usize,
    /// Paths that could not be deleted.
    pub failures: Vec<String>,
}

/// Removes output directories, uploads and status records of terminal jobs
/// older than the TTL. Jobs without a terminal record are never touched.
pub struct JobCleaner {
    paths: JobPaths,
    store: Arc<dyn StatusStore>,
    ttl: Duration,
}

impl JobCleaner {
    pub fn new(paths: JobPaths, store: Arc<dyn StatusStore>, ttl: Duration) -> Self {
        Self { paths, store, ttl }
    }

    pub fn sweep(&self) -> StoreResult<CleanupReport> {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> StoreResult<CleanupReport> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let mut report = CleanupReport::default();

        for job_id in self.store.job_ids()? {
            let Some(record) = self.store.get(&job_id)? else {
                report.kept += 1;
                continue;
            };
            let expired = record
                .updated_at_utc()
                .is_some_and(|updated| now.signed_duration_since(updated) > ttl);
            if !record.is_terminal() || !expired {
                report.kept += 1;
                continue;
            }

            let before = report.failures.len();
            if let Ok(dir) = self.paths.job_output_dir(&job_id) {
                remove_path(&dir, &mut report.failures);
            }
            if let Ok(dir) = self.paths.job_temp_dir(&job_id) {
                remove_path(&dir, &mut report.failures);
            }
            self.remove_uploads(&job_id, &mut report.failures);

            // Keep the record while artifacts remain so the next sweep retries.
            if report.failures.len() == before {
                self.store.remove(&job_id)?;
                tracing::info!("[Cleaner] Removed job {} ({})", job_id, record.status);
                report.removed.push(job_id);
            }
        }

        tracing::info!(
            "[Cleaner] Sweep done: {} removed, {} kept, {} failure(s)",
            report.removed.len(),
            report.kept,
            report.failures.len()
        );
        Ok(report)
    }

    fn remove_uploads(&self, job_id: &str, failures: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(&self.paths.upload_dir) else {
            return;
        };
        let prefix = format!("{}.", job_id);
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == job_id || name.starts_with(&prefix) {
                remove_path(&entry.path(), failures);
            }
        }
    }
}

fn remove_path(path: &Path, failures: &mut Vec<String>) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        return;
    };
    if let Err(e) = result {
        tracing::warn!("[Cleaner] Failed to remove {}: {}", path.display(), e);
        failures.push(path.display().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::status::StatusRecord;
    use crate::jobs::store::FileStatusStore;
    use tempfile::tempdir;

    fn seed(paths: &JobPaths, store: &dyn StatusStore, record: &StatusRecord) {
        let id = &record.job_id;
        std::fs::create_dir_all(paths.job_output_dir(id).unwrap().join("gifs")).unwrap();
        std::fs::create_dir_all(&paths.upload_dir).unwrap();
        std::fs::write(paths.upload_file(id, "mp4").unwrap(), b"video").unwrap();
        store.put(id, record).unwrap();
    }

    #[test]
    fn removes_only_old_terminal_jobs() {
        let root = tempdir().unwrap();
        let paths = JobPaths::under(root.path());
        let store = Arc::new(FileStatusStore::new(&paths.jobs_dir));

        let done = StatusRecord::queued("done")
            .running("Exporting", 95)
            .and_then(|r| r.completed())
            .unwrap();
        let failed = StatusRecord::queued("failed").failed("bad input", None).unwrap();
        let running = StatusRecord::queued("running").running("Transcribing", 30).unwrap();
        for record in [&done, &failed, &running] {
            seed(&paths, store.as_ref(), record);
        }
        // Output folder of an unknown job.
        std::fs::create_dir_all(paths.output_dir.join("orphan")).unwrap();

        let cleaner = JobCleaner::new(paths.clone(), store.clone(), Duration::from_secs(3600));
        let later = Utc::now() + chrono::Duration::hours(2);
        let report = cleaner.sweep_at(later).unwrap();

        assert_eq!(report.removed, vec!["done", "failed"]);
        assert_eq!(report.kept, 1);
        assert!(!paths.output_dir.join("done").exists());
        assert!(!paths.upload_dir.join("failed.mp4").exists());
        assert!(store.get("done").unwrap().is_none());

        assert!(paths.output_dir.join("running").exists());
        assert!(paths.upload_dir.join("running.mp4").exists());
        assert!(paths.output_dir.join("orphan").exists());
    }

    #[test]
    fn fresh_terminal_jobs_stay() {
        let root = tempdir().unwrap();
        let paths = JobPaths::under(root.path());
        let store = Arc::new(FileStatusStore::new(&paths.jobs_dir));
        let failed = StatusRecord::queued("recent").failed("x", None).unwrap();
        seed(&paths, store.as_ref(), &failed);

        let report = JobCleaner::new(paths.clone(), store, Duration::from_secs(3600))
            .sweep()
            .unwrap();
        assert!(report.removed.is_empty());
        assert!(paths.output_dir.join("recent").exists());
    }
}
