// Validate mode module
// Re-hashes every file listed in a digest and compares one-to-one

use std::path::{Path, PathBuf};

use super::batch::{BatchHasher, BatchProgress, CancelToken};
use super::codec::{self, DigestManifest};
use super::error::DigestError;
use super::hash::ContentHash;
use super::record::FileRecord;

/// Result of validating a directory against a digest
#[derive(Debug)]
pub struct ValidateOutcome {
    pub files: Vec<FileRecord>,
    pub expected_hashes: Vec<ContentHash>,
    pub computed_hashes: Vec<Option<ContentHash>>,
    pub valid: Vec<usize>,
    pub invalid: Vec<usize>,
    pub unhashable: Vec<usize>,
}

/// Engine for the validate mode
pub struct ValidateEngine {
    hasher: BatchHasher,
}

impl ValidateEngine {
    pub fn new() -> Self {
        Self {
            hasher: BatchHasher::new(),
        }
    }

    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.hasher = std::mem::take(&mut self.hasher).with_progress_callback(callback);
        self
    }

    pub fn run(
        &self,
        directory: &Path,
        digest_path: &Path,
        cancel: &CancelToken,
    ) -> Result<ValidateOutcome, DigestError> {
        if !directory.is_dir() {
            return Err(DigestError::DirectoryNotFound {
                path: directory.to_path_buf(),
            });
        }

        let DigestManifest { files, hashes, .. } = codec::read_digest(digest_path)?;

        if files.is_empty() {
            return Err(DigestError::Configuration {
                message: format!("no files found in digest file {}", digest_path.display()),
            });
        }

        let batch = self.hasher.hash_batch(directory, &files, None, cancel)?;

        let mut valid = Vec::with_capacity(batch.success_indices.len());
        let mut invalid = Vec::new();
        for &i in &batch.success_indices {
            // Success indices always carry a hash; the partition invariant
            // was checked by the batch
            if batch.hashes[i] == Some(hashes[i]) {
                valid.push(i);
            } else {
                invalid.push(i);
            }
        }

        Ok(ValidateOutcome {
            files,
            expected_hashes: hashes,
            computed_hashes: batch.hashes,
            valid,
            invalid,
            unhashable: batch.error_indices,
        })
    }
}

impl Default for ValidateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidateOutcome {
    pub fn has_events(&self) -> bool {
        !self.invalid.is_empty() || !self.unhashable.is_empty()
    }

    pub fn successfully_hashed(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    /// Save a fresh digest of the successfully re-hashed entries, carrying
    /// the hashes computed now rather than the ones read
    pub fn save_digest(
        &self,
        dest_dir: Option<&Path>,
        prefix: Option<&str>,
    ) -> Result<Option<PathBuf>, DigestError> {
        let entries = self
            .files
            .iter()
            .zip(self.computed_hashes.iter())
            .filter_map(|(record, hash)| hash.map(|h| (record, h)));
        codec::write_digest(dest_dir, prefix, entries, self.successfully_hashed())
    }

    /// Render the report as plain text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Mode: Validate\n");
        out.push_str(&format!(
            "Validated {} files out of {} total hashed.\n",
            self.valid.len(),
            self.successfully_hashed()
        ));

        if !self.invalid.is_empty() {
            out.push_str(&format!("\n({}) Files with invalid hashes:\n", self.invalid.len()));
            for &i in &self.invalid {
                out.push_str(&format!("   {}\n", self.files[i].path().display()));
            }
        }

        if !self.unhashable.is_empty() {
            out.push_str(&format!(
                "\n({}) Could not hash these files:\n",
                self.unhashable.len()
            ));
            for &i in &self.unhashable {
                out.push_str(&format!("   {}\n", self.files[i].path().display()));
            }
        }

        out
    }
}
