// Digest core library
// Content hashing, manifest codec, batch execution, reconciliation and
// duplicate detection

pub mod batch;
pub mod codec;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod fuzzy;
pub mod generate;
pub mod hash;
pub mod path_utils;
pub mod record;
pub mod refresh;
pub mod report;
pub mod validate;
pub mod walk;

// Re-export commonly used types for convenience
pub use batch::{BatchHasher, BatchProgress, BatchReport, CancelToken};
pub use codec::{read_digest, write_digest, DigestManifest};
pub use config::{DigestConfig, RevalidatedSeverity};
pub use duplicates::{DuplicateGroup, DuplicateReport, DuplicatesEngine};
pub use error::{DigestError, FormatErrorKind};
pub use fuzzy::{FuzzyParams, PotentialMatch};
pub use generate::{GenerateEngine, GenerateOutcome};
pub use hash::ContentHash;
pub use record::FileRecord;
pub use refresh::{MovedGroup, RefreshEngine, RefreshMode, RefreshOutcome};
pub use report::ReportSink;
pub use validate::{ValidateEngine, ValidateOutcome};
pub use walk::{walk_directory, WalkOutcome};
