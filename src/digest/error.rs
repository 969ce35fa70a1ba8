// Centralized error handling module
// Provides context-rich error types for all digest operations

use std::fmt;
use std::io;
use std::path::PathBuf;

use super::hash::ContentHash;

/// Specific manifest-format invariant that a decode violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    MissingHeader,
    UnparseableGenerationDate,
    IncompleteEntry,
    MissingSizeMarker,
    MissingModifiedMarker,
    MissingPathSeparator,
    MalformedHash,
    NonNumericSize,
    BadEntryDate,
    EmptyPath,
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            FormatErrorKind::MissingHeader => "missing or invalid header",
            FormatErrorKind::UnparseableGenerationDate => "cannot parse generation date",
            FormatErrorKind::IncompleteEntry => "incomplete entry",
            FormatErrorKind::MissingSizeMarker => "expected size info",
            FormatErrorKind::MissingModifiedMarker => "missing last modified date",
            FormatErrorKind::MissingPathSeparator => "missing file path separator",
            FormatErrorKind::MalformedHash => "malformed hash",
            FormatErrorKind::NonNumericSize => "invalid file size format",
            FormatErrorKind::BadEntryDate => "invalid last modified date format",
            FormatErrorKind::EmptyPath => "file path cannot be empty",
        };
        f.write_str(text)
    }
}

/// Partial state of a batch that was cancelled mid-run
///
/// Hashes collected before the cancellation are preserved here so the
/// caller can decide whether anything is worth keeping.
#[derive(Debug)]
pub struct CancelledBatch {
    pub processed: usize,
    pub total: usize,
    pub hashes: Vec<Option<ContentHash>>,
    pub success_indices: Vec<usize>,
    pub error_indices: Vec<usize>,
}

/// Main error type for the digest engine
#[derive(Debug)]
pub enum DigestError {
    /// Invalid caller-supplied arguments (bad subset index, empty base path, ...)
    Configuration { message: String },

    /// File system errors with context
    FileNotFound { path: PathBuf },
    DirectoryNotFound { path: PathBuf },
    ManifestNotFound { path: PathBuf },
    PermissionDenied { path: PathBuf, operation: String },
    Io { path: Option<PathBuf>, operation: String, source: io::Error },

    /// Malformed manifest text; the whole manifest is rejected
    Format { line: usize, kind: FormatErrorKind },

    /// Internal invariant violated. Always fatal, never absorbed.
    Consistency { detail: String },

    /// User-requested abort; already-computed hashes ride along
    Cancelled(Box<CancelledBatch>),
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DigestError::Configuration { message } => {
                write!(f, "Invalid arguments: {}\n", message)?;
                write!(f, "Suggestion: Run with --help to see usage information")
            }
            DigestError::FileNotFound { path } => {
                write!(f, "File not found: {}\n", path.display())?;
                write!(f, "Suggestion: Check that the file path is correct and the file exists")
            }
            DigestError::DirectoryNotFound { path } => {
                write!(f, "Directory not found: {}\n", path.display())?;
                write!(f, "Suggestion: Check that the directory path is correct and the directory exists")
            }
            DigestError::ManifestNotFound { path } => {
                write!(f, "Digest file not found: {}\n", path.display())?;
                write!(f, "Suggestion: Create a digest first using the 'generate' command")
            }
            DigestError::PermissionDenied { path, operation } => {
                write!(f, "Permission denied while {} file: {}\n", operation, path.display())?;
                write!(f, "Suggestion: Check file permissions or run with appropriate privileges")
            }
            DigestError::Io { path, operation, source } => {
                if let Some(p) = path {
                    write!(f, "I/O error while {} file {}: {}\n", operation, p.display(), source)?;
                } else {
                    write!(f, "I/O error while {}: {}\n", operation, source)?;
                }
                write!(f, "Suggestion: Check file permissions and disk space")
            }
            DigestError::Format { line, kind } => {
                write!(f, "Invalid digest file format at line {}: {}\n", line, kind)?;
                write!(f, "Suggestion: Regenerate the digest; manifests are never partially loaded")
            }
            DigestError::Consistency { detail } => {
                write!(f, "bug: {}", detail)
            }
            DigestError::Cancelled(partial) => {
                write!(
                    f,
                    "Operation cancelled at {}/{} files",
                    partial.processed, partial.total
                )
            }
        }
    }
}

impl std::error::Error for DigestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DigestError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl DigestError {
    /// Create an Io error with context, mapping common kinds to specific variants
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => {
                if let Some(p) = path {
                    if operation.contains("directory") || operation.contains("walking") {
                        DigestError::DirectoryNotFound { path: p }
                    } else {
                        DigestError::FileNotFound { path: p }
                    }
                } else {
                    DigestError::Io {
                        path: None,
                        operation: operation.to_string(),
                        source: err,
                    }
                }
            }
            io::ErrorKind::PermissionDenied => {
                if let Some(p) = path {
                    DigestError::PermissionDenied {
                        path: p,
                        operation: operation.to_string(),
                    }
                } else {
                    DigestError::Io {
                        path: None,
                        operation: operation.to_string(),
                        source: err,
                    }
                }
            }
            _ => DigestError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    pub fn consistency(detail: impl Into<String>) -> Self {
        DigestError::Consistency { detail: detail.into() }
    }

    pub fn format(line: usize, kind: FormatErrorKind) -> Self {
        DigestError::Format { line, kind }
    }

    /// True for the fatal internal-fault variant
    pub fn is_consistency(&self) -> bool {
        matches!(self, DigestError::Consistency { .. })
    }
}

impl From<io::Error> for DigestError {
    fn from(err: io::Error) -> Self {
        DigestError::from_io_error(err, "unknown operation", None)
    }
}
