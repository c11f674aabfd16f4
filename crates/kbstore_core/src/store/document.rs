//! Lenient JSON document reads and replace-on-write persistence.

use super::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of reading one JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRead<T> {
    /// File does not exist.
    Missing,
    /// File exists but could not be read or parsed; carries the reason.
    Malformed(String),
    Loaded(T),
}

/// Reads and parses `path` without ever failing.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> DocumentRead<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return DocumentRead::Missing,
        Err(err) => return DocumentRead::Malformed(format!("read failed: {err}")),
    };

    match serde_json::from_str(&text) {
        Ok(value) => DocumentRead::Loaded(value),
        Err(err) => DocumentRead::Malformed(format!("parse failed: {err}")),
    }
}

/// Writes `value` as 2-space indented JSON, replacing `path` atomically.
///
/// Non-ASCII text is written as-is.
pub fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, text).map_err(|err| StoreError::io(&temp_path, err))?;
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::io(path, err));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
