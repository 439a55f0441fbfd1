use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::SessionStoreError;

/// Append-only list of saved session paths, one absolute path per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLedger {
    path: PathBuf,
}

/// A ledger entry whose session file still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub path: PathBuf,
    pub modified: OffsetDateTime,
}

impl HistoryLedger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, session_path: &Path) -> Result<(), SessionStoreError> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|source| {
                SessionStoreError::io("creating history directory", parent, source)
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| {
                SessionStoreError::io("opening history file for append", &self.path, source)
            })?;
        writeln!(file, "{}", session_path.display()).map_err(|source| {
            SessionStoreError::io("appending to history file", &self.path, source)
        })
    }

    /// Recorded paths in append order. A missing ledger is empty.
    pub fn entries(&self) -> Result<Vec<PathBuf>, SessionStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SessionStoreError::io("reading history file", &self.path, source))
            }
        };

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Most recently recorded path, whether or not it still exists.
    pub fn latest(&self) -> Result<Option<PathBuf>, SessionStoreError> {
        Ok(self.entries()?.pop())
    }

    /// Existing entries with their modification times, consecutive repeats collapsed.
    pub fn listing(&self) -> Result<Vec<HistoryEntry>, SessionStoreError> {
        let mut listing: Vec<HistoryEntry> = Vec::new();
        for path in self.entries()? {
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            if listing.last().is_some_and(|previous| previous.path == path) {
                continue;
            }
            let modified = metadata.modified().map_err(|source| {
                SessionStoreError::io("reading modification time", &path, source)
            })?;
            listing.push(HistoryEntry {
                path,
                modified: OffsetDateTime::from(modified),
            });
        }
        Ok(listing)
    }
}

/// One `"{modified} {path}"` line per entry, modification time in RFC3339.
pub fn format_listing(entries: &[HistoryEntry]) -> Result<String, SessionStoreError> {
    let mut out = String::new();
    for entry in entries {
        let modified = entry
            .modified
            .format(&Rfc3339)
            .map_err(|source| SessionStoreError::ClockFormat {
                path: entry.path.clone(),
                source,
            })?;
        out.push_str(&modified);
        out.push(' ');
        out.push_str(&entry.path.display().to_string());
        out.push('\n');
    }
    Ok(out)
}
