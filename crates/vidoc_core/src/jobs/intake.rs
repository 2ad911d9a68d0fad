//! Copying submitted videos into the upload folder.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::paths::{JobPaths, PathError};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Input video not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Copy `source` to `<uploads>/<job_id>.<ext>` and return the new path.
pub fn intake(paths: &JobPaths, job_id: &str, source: &Path) -> Result<PathBuf, IntakeError> {
    if !source.is_file() {
        return Err(IntakeError::NotFound(source.to_path_buf()));
    }
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let dest = paths.upload_file(job_id, &ext)?;

    let copy_error = |e: std::io::Error| IntakeError::Copy {
        from: source.to_path_buf(),
        to: dest.clone(),
        source: e,
    };
    std::fs::create_dir_all(&paths.upload_dir).map_err(copy_error)?;
    std::fs::copy(source, &dest).map_err(copy_error)?;

    tracing::debug!("[Intake] {} -> {}", source.display(), dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_under_job_id() {
        let root = tempdir().unwrap();
        let paths = JobPaths::under(root.path());
        let source = root.path().join("My Talk.MOV");
        std::fs::write(&source, b"frames").unwrap();

        let dest = intake(&paths, "job-9", &source).unwrap();
        assert_eq!(dest, paths.upload_dir.join("job-9.mov"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"frames");
        assert!(source.exists());
    }

    #[test]
    fn missing_source() {
        let root = tempdir().unwrap();
        let paths = JobPaths::under(root.path());
        assert!(matches!(
            intake(&paths, "job-9", &root.path().join("nope.mp4")),
            Err(IntakeError::NotFound(_))
        ));
    }
}
