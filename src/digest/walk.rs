// Directory walking module
// Produces the primary snapshot: file records plus inaccessible paths

use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::error::DigestError;
use super::record::FileRecord;

/// Name of the optional gitignore-style exclusion file honored during walks
pub const IGNORE_FILE_NAME: &str = ".sumignore";

/// Result of walking a directory tree
#[derive(Debug)]
pub struct WalkOutcome {
    pub files: Vec<FileRecord>,
    /// Paths whose metadata could not be read; omitted from the snapshot
    pub inaccessible: Vec<PathBuf>,
}

/// Walk `root` recursively and snapshot every regular file whose name
/// matches `pattern`.
///
/// Inaccessible files never abort the walk: they are collected separately
/// so the caller can report them. Hidden files are included; symlinks are
/// not followed.
pub fn walk_directory(root: &Path, pattern: &str) -> Result<WalkOutcome, DigestError> {
    if !root.is_dir() {
        return Err(DigestError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let matcher = Pattern::new(pattern).map_err(|e| DigestError::Configuration {
        message: format!("invalid walk pattern '{}': {}", pattern, e),
    })?;

    let ignore = load_ignore(root);

    let mut files = Vec::new();
    let mut inaccessible = Vec::new();

    for entry_result in WalkDir::new(root)
        .parallelism(jwalk::Parallelism::RayonNewPool(0))
        .skip_hidden(false)
        .follow_links(false)
    {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                if let Some(path) = e.path() {
                    inaccessible.push(path.to_path_buf());
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let full_path = entry.path();
        let rel_path = match full_path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                inaccessible.push(full_path.clone());
                continue;
            }
        };

        if let Some(ref ignore) = ignore {
            // Files only reach this point, so directory patterns must be
            // honored through the parent chain
            if ignore.matched_path_or_any_parents(&rel_path, false).is_ignore() {
                continue;
            }
        }

        let name = rel_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !matcher.matches(name) {
            continue;
        }

        match FileRecord::from_disk(rel_path, &full_path) {
            Ok(record) => files.push(record),
            Err(_) => inaccessible.push(full_path),
        }
    }

    Ok(WalkOutcome { files, inaccessible })
}

/// Load `.sumignore` patterns from the walk root, if the file exists
fn load_ignore(root: &Path) -> Option<Gitignore> {
    let ignore_path = root.join(IGNORE_FILE_NAME);
    if !ignore_path.is_file() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    // The ignore file itself is never part of a snapshot
    builder.add_line(None, IGNORE_FILE_NAME).ok()?;
    if let Some(e) = builder.add(&ignore_path) {
        eprintln!(
            "Warning: Failed to parse {}: {}",
            ignore_path.display(),
            e
        );
        return None;
    }

    builder.build().ok()
}
