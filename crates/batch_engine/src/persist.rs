use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
///
/// Safe to call concurrently for the same or overlapping directories.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writability check: create and drop a scratch file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Creates a job directory from async code without blocking a runtime worker.
///
/// Unlike [`ensure_output_dir`] this does not create a scratch file: the
/// placeholder write already fails loudly if the directory is not writable.
pub async fn create_job_dir(dir: &Path) -> Result<(), PersistError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PersistError::OutputDir(format!("{}: {e}", dir.display())))
}

/// Replaces `target` with a zero-byte file, marking the job as attempted.
///
/// The empty file is created beside the target and renamed over it, so a
/// partial artifact is never left behind.
pub fn write_placeholder(target: &Path) -> Result<(), PersistError> {
    let dir = target
        .parent()
        .ok_or_else(|| PersistError::OutputDir(format!("{} has no parent", target.display())))?;
    fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;

    let tmp = NamedTempFile::new_in(dir)?;
    tmp.as_file().sync_all()?;
    // `persist` overwrites an existing target in one rename.
    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

/// [`write_placeholder`] on tokio's blocking pool.
pub async fn write_placeholder_in_background(target: PathBuf) -> Result<(), PersistError> {
    tokio::task::spawn_blocking(move || write_placeholder(&target))
        .await
        .map_err(|e| PersistError::Io(io::Error::other(e)))?
}
