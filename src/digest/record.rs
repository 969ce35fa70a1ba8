// File record module
// Immutable (path, size, mtime) snapshot of a single file

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use super::error::{DigestError, FormatErrorKind};
use super::path_utils;

/// Timestamp format used everywhere: manifest header, entry lines, log names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of one file: relative path, size and last-modified time
///
/// Created either by the directory walker or by the manifest codec;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    path: PathBuf,
    size: u64,
    modified: DateTime<Local>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, modified: DateTime<Local>) -> Self {
        Self { path, size, modified }
    }

    /// Build a record from disk metadata. `path` is the relative path kept
    /// in the record; `full_path` is where the file actually lives.
    pub fn from_disk(path: PathBuf, full_path: &Path) -> Result<Self, DigestError> {
        if path.as_os_str().is_empty() {
            return Err(DigestError::Configuration {
                message: "file record path cannot be empty".to_string(),
            });
        }

        let metadata = fs::metadata(full_path).map_err(|e| {
            DigestError::from_io_error(e, "reading metadata for", Some(full_path.to_path_buf()))
        })?;
        let modified = metadata.modified().map_err(|e| {
            DigestError::from_io_error(e, "reading mtime of", Some(full_path.to_path_buf()))
        })?;

        Ok(Self {
            path,
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
        })
    }

    /// Build a record from manifest text fields. `line` is the manifest line
    /// number for error context.
    pub fn from_text(path: &str, size: &str, modified: &str, line: usize) -> Result<Self, DigestError> {
        if path.is_empty() {
            return Err(DigestError::format(line, FormatErrorKind::EmptyPath));
        }

        let size: u64 = size
            .trim()
            .parse()
            .map_err(|_| DigestError::format(line, FormatErrorKind::NonNumericSize))?;

        let modified = parse_timestamp(modified.trim())
            .ok_or_else(|| DigestError::format(line, FormatErrorKind::BadEntryDate))?;

        Ok(Self {
            path: path_utils::parse_manifest_path(path),
            size,
            modified,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> DateTime<Local> {
        self.modified
    }

    /// Manifest text form of the mtime (second precision)
    pub fn modified_to_string(&self) -> String {
        self.modified.format(TIMESTAMP_FORMAT).to_string()
    }

    /// File name component, empty if the path has none
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }

    /// Extension including nothing or everything after the last dot
    pub fn extension(&self) -> &str {
        self.path.extension().and_then(|e| e.to_str()).unwrap_or("")
    }

    /// Parent directory as a string, empty for top-level entries
    pub fn parent_dir(&self) -> &str {
        self.path.parent().and_then(|p| p.to_str()).unwrap_or("")
    }
}

/// Timestamps from different file systems jitter below a second;
/// anything under one full second apart counts as equal.
pub fn is_modified_different(first: DateTime<Local>, second: DateTime<Local>) -> bool {
    (first - second).num_seconds().abs() >= 1
}

/// Parse a `yyyy-MM-dd HH:mm:ss` local timestamp
pub fn parse_timestamp(text: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}
