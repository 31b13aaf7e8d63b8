//! Crash-safe file writes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{PersistenceError, PersistenceResult};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let temp = temp_path(path);

    fs::write(&temp, bytes).await.map_err(|e| {
        tracing::error!(path = %temp.display(), error = %e, "Failed to write temp file");
        PersistenceError::Io(e)
    })?;

    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        tracing::error!(
            from = %temp.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file to target"
        );
        return Err(PersistenceError::Io(e));
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_if_exists(path: &Path) -> PersistenceResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
