//! Status record persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

use super::paths::{validate_job_id, PathError};
use super::status::StatusRecord;

/// Errors from a status store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    InvalidJobId(#[from] PathError),

    #[error("Status store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize status record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One record per job id; `put` overwrites the whole record.
pub trait StatusStore: Send + Sync {
    /// `Ok(None)` means "not yet present".
    fn get(&self, job_id: &str) -> StoreResult<Option<StatusRecord>>;

    fn put(&self, job_id: &str, record: &StatusRecord) -> StoreResult<()>;

    fn remove(&self, job_id: &str) -> StoreResult<()>;

    /// Every job id with a record, sorted.
    fn job_ids(&self) -> StoreResult<Vec<String>>;
}

/// `<dir>/<job_id>.json` per job, written via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, job_id: &str) -> StoreResult<PathBuf> {
        validate_job_id(job_id)?;
        Ok(self.dir.join(format!("{}.json", job_id)))
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl StatusStore for FileStatusStore {
    fn get(&self, job_id: &str) -> StoreResult<Option<StatusRecord>> {
        let path = self.record_path(job_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&path)(e)),
        };
        match serde_json::from_str::<StatusRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Half-written or foreign file.
                tracing::debug!("[StatusStore] Unreadable record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn put(&self, job_id: &str, record: &StatusRecord) -> StoreResult<()> {
        let path = self.record_path(job_id)?;
        std::fs::create_dir_all(&self.dir).map_err(Self::io_error(&self.dir))?;

        let json = serde_json::to_string_pretty(record)?;
        let temp = self.dir.join(format!(
            ".{}.{}.tmp",
            job_id,
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&temp, json).map_err(Self::io_error(&temp))?;
        if let Err(e) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(Self::io_error(&path)(e));
        }
        tracing::trace!(
            "[StatusStore] {} -> {} ({}%)",
            job_id,
            record.status,
            record.progress
        );
        Ok(())
    }

    fn remove(&self, job_id: &str) -> StoreResult<()> {
        let path = self.record_path(job_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path)(e)),
        }
    }

    fn job_ids(&self) -> StoreResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&self.dir)(e)),
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    path.file_stem().map(|s| s.to_string_lossy().to_string())
                } else {
                    None
                }
            })
            .filter(|id| validate_job_id(id).is_ok())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-process store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: RwLock<HashMap<String, StatusRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in job id order.
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        let mut records: Vec<StatusRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        records
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, job_id: &str) -> StoreResult<Option<StatusRecord>> {
        Ok(self.records.read().get(job_id).cloned())
    }

    fn put(&self, job_id: &str, record: &StatusRecord) -> StoreResult<()> {
        validate_job_id(job_id)?;
        self.records
            .write()
            .insert(job_id.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, job_id: &str) -> StoreResult<()> {
        self.records.write().remove(job_id);
        Ok(())
    }

    fn job_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::status::JobStatus;
    use tempfile::tempdir;

    #[test]
    fn unknown_job_is_none() {
        let dir = tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("jobs"));
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.job_ids().unwrap().is_empty());
    }

    #[test]
    fn put_overwrites_whole_record() {
        let dir = tempdir().unwrap();
        let store = FileStatusStore::new(dir.path());
        let queued = StatusRecord::queued("job-1");
        store.put("job-1", &queued).unwrap();
        let running = queued.running("Preparing", 5).unwrap();
        store.put("job-1", &running).unwrap();

        let read = store.get("job-1").unwrap().unwrap();
        assert_eq!(read.status, JobStatus::Running);
        assert_eq!(read.progress, 5);
        assert_eq!(store.job_ids().unwrap(), vec!["job-1"]);

        // No temp files left behind.
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn half_written_record_reads_as_none() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("job-2.json"), r#"{"job_id": "job-2", "sta"#).unwrap();
        let store = FileStatusStore::new(dir.path());
        assert!(store.get("job-2").unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let store = FileStatusStore::new(dir.path());
        assert!(matches!(
            store.put("../x", &StatusRecord::queued("../x")),
            Err(StoreError::InvalidJobId(_))
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStatusStore::new(dir.path());
        store.put("a", &StatusRecord::queued("a")).unwrap();
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn memory_store() {
        let store = MemoryStatusStore::new();
        store.put("b", &StatusRecord::queued("b")).unwrap();
        store.put("a", &StatusRecord::queued("a")).unwrap();
        assert_eq!(store.job_ids().unwrap(), vec!["a", "b"]);
        assert_eq!(store.snapshot().len(), 2);
        assert!(store.get("c").unwrap().is_none());
    }
}
