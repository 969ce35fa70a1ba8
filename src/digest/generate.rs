// Generate mode module
// Walks a directory, hashes everything and saves a fresh digest

use std::path::{Path, PathBuf};

use super::batch::{BatchHasher, BatchProgress, CancelToken};
use super::codec;
use super::config::DigestConfig;
use super::error::DigestError;
use super::hash::ContentHash;
use super::record::FileRecord;
use super::walk;

/// Result of generating a digest from scratch
#[derive(Debug)]
pub struct GenerateOutcome {
    pub files: Vec<FileRecord>,
    pub hashes: Vec<Option<ContentHash>>,
    pub success_count: usize,
    pub unhashable: Vec<usize>,
    pub inaccessible: Vec<PathBuf>,
}

/// Engine for the generate mode
pub struct GenerateEngine {
    config: DigestConfig,
    hasher: BatchHasher,
}

impl GenerateEngine {
    pub fn new(config: DigestConfig) -> Self {
        Self {
            config,
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

    pub fn run(&self, directory: &Path, cancel: &CancelToken) -> Result<GenerateOutcome, DigestError> {
        let walked = walk::walk_directory(directory, &self.config.walk_pattern)?;

        if walked.files.is_empty() {
            return Err(DigestError::Configuration {
                message: format!("no files found in directory {}", directory.display()),
            });
        }

        let batch = self.hasher.hash_batch(directory, &walked.files, None, cancel)?;

        Ok(GenerateOutcome {
            files: walked.files,
            success_count: batch.success_indices.len(),
            hashes: batch.hashes,
            unhashable: batch.error_indices,
            inaccessible: walked.inaccessible,
        })
    }
}

impl GenerateOutcome {
    /// Save the digest of all successfully hashed files
    pub fn save_digest(
        &self,
        dest_dir: Option<&Path>,
        prefix: Option<&str>,
    ) -> Result<Option<PathBuf>, DigestError> {
        let entries = self
            .files
            .iter()
            .zip(self.hashes.iter())
            .filter_map(|(record, hash)| hash.map(|h| (record, h)));
        codec::write_digest(dest_dir, prefix, entries, self.success_count)
    }

    pub fn has_events(&self) -> bool {
        !self.unhashable.is_empty() || !self.inaccessible.is_empty()
    }

    /// Render the report as plain text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Mode: Generate\n");
        out.push_str(&format!(
            "Hashed {} out of {} files.\n",
            self.success_count,
            self.files.len()
        ));

        if !self.inaccessible.is_empty() {
            out.push_str(&format!("\n({}) Inaccessible files:\n", self.inaccessible.len()));
            for path in &self.inaccessible {
                out.push_str(&format!("   {}\n", path.display()));
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
