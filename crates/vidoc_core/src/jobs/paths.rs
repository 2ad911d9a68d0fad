//! Where each job's files live.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::PathSettings;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Invalid job id: {0:?}")]
    InvalidJobId(String),

    #[error("Artifact path must be relative: {0}")]
    Absolute(PathBuf),

    #[error("Artifact path escapes the job directory: {0}")]
    Traversal(PathBuf),
}

/// Job ids are non-empty and limited to ASCII letters, digits, `-` and `_`.
pub fn validate_job_id(job_id: &str) -> Result<(), PathError> {
    let ok = !job_id.is_empty()
        && job_id.len() <= 128
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(PathError::InvalidJobId(job_id.to_string()))
    }
}

/// New random job id.
pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Resolves per-job locations under the configured folders.
///
/// ```text
/// <jobs>/<job_id>.json
/// <uploads>/<job_id>.<ext>
/// <output>/<job_id>/documentation.{json,md}, transcript.json, gifs/, segments/
/// <logs>/<job_id>.log
/// ```
#[derive(Debug, Clone)]
pub struct JobPaths {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub jobs_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub temp_root: PathBuf,
}

impl JobPaths {
    pub fn from_settings(paths: &PathSettings) -> Self {
        Self {
            upload_dir: PathBuf::from(&paths.upload_folder),
            output_dir: PathBuf::from(&paths.output_folder),
            jobs_dir: PathBuf::from(&paths.jobs_folder),
            logs_dir: PathBuf::from(&paths.logs_folder),
            temp_root: PathBuf::from(&paths.temp_root),
        }
    }

    /// All folders under one root; used by tests and embedded setups.
    pub fn under(root: &Path) -> Self {
        Self {
            upload_dir: root.join("uploads"),
            output_dir: root.join("output"),
            jobs_dir: root.join("jobs"),
            logs_dir: root.join("logs"),
            temp_root: root.join("tmp"),
        }
    }

    pub fn job_output_dir(&self, job_id: &str) -> Result<PathBuf, PathError> {
        validate_job_id(job_id)?;
        Ok(self.output_dir.join(job_id))
    }

    pub fn job_temp_dir(&self, job_id: &str) -> Result<PathBuf, PathError> {
        validate_job_id(job_id)?;
        Ok(self.temp_root.join(job_id))
    }

    pub fn status_file(&self, job_id: &str) -> Result<PathBuf, PathError> {
        validate_job_id(job_id)?;
        Ok(self.jobs_dir.join(format!("{}.json", job_id)))
    }

    /// Upload location for a job, keeping the source extension.
    pub fn upload_file(&self, job_id: &str, extension: &str) -> Result<PathBuf, PathError> {
        validate_job_id(job_id)?;
        let name = if extension.is_empty() {
            job_id.to_string()
        } else {
            format!("{}.{}", job_id, extension.to_lowercase())
        };
        Ok(self.upload_dir.join(name))
    }

    /// A file inside the job's output directory.
    ///
    /// Rejects absolute paths and any `..` component.
    pub fn artifact(&self, job_id: &str, relative: impl AsRef<Path>) -> Result<PathBuf, PathError> {
        let relative = relative.as_ref();
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => return Err(PathError::Traversal(relative.to_path_buf())),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::Absolute(relative.to_path_buf()))
                }
            }
        }
        Ok(self.job_output_dir(job_id)?.join(relative))
    }

    /// Create every top-level folder.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.upload_dir,
            &self.output_dir,
            &self.jobs_dir,
            &self.logs_dir,
            &self.temp_root,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> JobPaths {
        JobPaths::under(Path::new("/data"))
    }

    #[test]
    fn job_id_rules() {
        assert!(validate_job_id("3f2a-job_1").is_ok());
        assert!(validate_job_id(&new_job_id()).is_ok());
        assert!(validate_job_id("").is_err());
        assert!(validate_job_id("../etc").is_err());
        assert!(validate_job_id("a/b").is_err());
    }

    #[test]
    fn artifact_resolves_inside_job_dir() {
        assert_eq!(
            paths().artifact("job1", "gifs/clip_001.gif").unwrap(),
            PathBuf::from("/data/output/job1/gifs/clip_001.gif")
        );
    }

    #[test]
    fn artifact_rejects_escapes() {
        assert!(matches!(
            paths().artifact("job1", "/etc/passwd"),
            Err(PathError::Absolute(_))
        ));
        assert!(matches!(
            paths().artifact("job1", "gifs/../../other/secret"),
            Err(PathError::Traversal(_))
        ));
        assert!(matches!(
            paths().artifact("..", "documentation.json"),
            Err(PathError::InvalidJobId(_))
        ));
    }

    #[test]
    fn per_job_files() {
        let p = paths();
        assert_eq!(p.status_file("j").unwrap(), PathBuf::from("/data/jobs/j.json"));
        assert_eq!(p.upload_file("j", "MP4").unwrap(), PathBuf::from("/data/uploads/j.mp4"));
    }
}
