use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SessionStoreError;

/// Reads a session document; a missing file is `Ok(None)`.
pub fn read_session(path: &Path) -> Result<Option<String>, SessionStoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SessionStoreError::io("reading session file", path, source));
        }
    };

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|source| SessionStoreError::InvalidUtf8 {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes `text` to `path`, creating parent directories, and returns the absolute path.
pub fn write_session(path: &Path, text: &str) -> Result<PathBuf, SessionStoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| {
            SessionStoreError::io("creating session directory", parent, source)
        })?;
    }

    fs::write(path, text)
        .map_err(|source| SessionStoreError::io("writing session file", path, source))?;
    let absolute = std::path::absolute(path)
        .map_err(|source| SessionStoreError::io("resolving session path", path, source))?;
    tracing::debug!(path = %absolute.display(), bytes = text.len(), "session written");
    Ok(absolute)
}
