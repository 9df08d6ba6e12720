//! Small file helpers mapping I/O failures to [`StoreError`]
//!
//! The helpers are synchronous. Async callers serialize first, then hand the
//! bytes to [`blocking`] so file system calls stay off the runtime workers.

use autopilot_application::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir.display(), e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir.display(), e))?;
    tmp.write_all(data)
        .map_err(|e| StoreError::io(path.display(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path.display(), e.error))?;
    Ok(())
}

/// Pretty JSON with a trailing newline, the format of every snapshot file.
pub fn json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    Ok(data)
}

/// Run file system work on tokio's blocking pool.
pub async fn blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::io("blocking state task", std::io::Error::other(e)))?
}

/// Read a JSON document; a missing file is `None`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path.display(), e)),
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// One compact JSON record terminated by a newline.
pub fn jsonl_line<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

/// Append one pre-encoded line, creating the file if needed.
pub fn append_line(path: &Path, line: &[u8]) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir.display(), e))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path.display(), e))?;
    file.write_all(line)
        .map_err(|e| StoreError::io(path.display(), e))
}

pub fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path.display(), e)),
    }
}
