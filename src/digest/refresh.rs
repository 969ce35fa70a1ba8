// Reconciliation engine module
// Classifies drift between the live directory snapshot (primary) and a
// previously saved digest (secondary), resolves moved content by hash, and
// assembles the manifest to save

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::batch::{BatchHasher, BatchProgress, CancelToken};
use super::codec::{self, DigestManifest};
use super::config::{DigestConfig, RevalidatedSeverity};
use super::duplicates::{group_by_hash, group_indices_by_hash};
use super::error::DigestError;
use super::fuzzy::{find_potential_matches, FuzzyMatches, FuzzyParams};
use super::hash::ContentHash;
use super::record::{is_modified_different, FileRecord};
use super::walk;

/// Refresh policy: what gets re-hashed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Re-hash only files whose size or mtime drifted; unchanged files
    /// inherit the digest hash unverified (optimistic trust)
    Fast,
    /// Re-hash every file on disk; drift is hash-driven
    Full,
}

impl RefreshMode {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshMode::Fast => "Fast refresh",
            RefreshMode::Full => "Full refresh",
        }
    }
}

/// Files from the digest found elsewhere on disk under the same content hash.
/// Each group owns its index vectors outright.
#[derive(Debug, Clone)]
pub struct MovedGroup {
    pub hash: ContentHash,
    pub primary_indices: Vec<usize>,
    pub secondary_indices: Vec<usize>,
}

/// Full reconciliation result.
///
/// Every primary index lands in exactly one of the drift/clean/moved/orphan
/// buckets; `unhashable` is the disambiguation set for `None` slots in
/// `primary_hashes` (an unhashable in-both pair appears nowhere else, an
/// unhashable disk-only file still counts as a primary orphan).
#[derive(Debug)]
pub struct RefreshOutcome {
    pub mode: RefreshMode,
    pub primary_files: Vec<FileRecord>,
    pub primary_hashes: Vec<Option<ContentHash>>,
    pub secondary_files: Vec<FileRecord>,
    pub secondary_hashes: Vec<ContentHash>,
    pub generated_at: DateTime<Local>,
    pub inaccessible: Vec<PathBuf>,

    pub clean: Vec<usize>,
    /// Fast mode only: metadata drifted but the re-hash still matched
    pub revalidated: Vec<usize>,
    /// Same size and mtime, different hash: silent corruption suspects
    pub invalid_hash: Vec<usize>,
    pub size_drift: Vec<usize>,
    pub date_drift: Vec<usize>,
    pub size_date_drift: Vec<usize>,
    pub unhashable: Vec<usize>,
    pub moved_groups: Vec<MovedGroup>,
    pub orphan_primary: Vec<usize>,

    pub orphan_secondary: Vec<usize>,
    pub orphan_secondary_duplicate: Vec<usize>,

    pub total_to_save: usize,
    pub fuzzy: Option<FuzzyMatches>,
}

/// Engine running one refresh over a directory and a saved digest
pub struct RefreshEngine {
    mode: RefreshMode,
    config: DigestConfig,
    hasher: BatchHasher,
}

impl RefreshEngine {
    pub fn new(mode: RefreshMode, config: DigestConfig) -> Self {
        Self {
            mode,
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

    /// Load the digest, walk the directory and reconcile the two snapshots
    pub fn run(
        &self,
        directory: &Path,
        digest_path: &Path,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome, DigestError> {
        if !directory.is_dir() {
            return Err(DigestError::DirectoryNotFound {
                path: directory.to_path_buf(),
            });
        }

        let DigestManifest { files, hashes, generated_at } = codec::read_digest(digest_path)?;

        let walked = walk::walk_directory(directory, &self.config.walk_pattern)?;

        let mut outcome = self.reconcile(
            directory,
            walked.files,
            files,
            hashes,
            generated_at,
            cancel,
        )?;
        outcome.inaccessible = walked.inaccessible;
        Ok(outcome)
    }

    /// Reconcile two prepared snapshots. `base_path` anchors relative
    /// primary paths for hashing.
    pub fn reconcile(
        &self,
        base_path: &Path,
        primary: Vec<FileRecord>,
        secondary: Vec<FileRecord>,
        secondary_hashes: Vec<ContentHash>,
        generated_at: DateTime<Local>,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome, DigestError> {
        if secondary.len() != secondary_hashes.len() {
            return Err(DigestError::consistency(
                "secondary file and hash counts differ",
            ));
        }

        // 1. Path-keyed diff of the two snapshots
        let (only_primary, in_both, only_secondary) = {
            let mut primary_map: HashMap<&Path, usize> = HashMap::with_capacity(primary.len());
            for (i, record) in primary.iter().enumerate() {
                primary_map.insert(record.path(), i);
            }
            let mut secondary_map: HashMap<&Path, usize> =
                HashMap::with_capacity(secondary.len());
            for (j, record) in secondary.iter().enumerate() {
                secondary_map.insert(record.path(), j);
            }

            let mut only_primary = Vec::new();
            let mut in_both = Vec::new(); // (primary index, secondary index)
            for (i, record) in primary.iter().enumerate() {
                if primary_map.get(record.path()) != Some(&i) {
                    continue; // shadowed duplicate path, the map entry wins
                }
                match secondary_map.get(record.path()) {
                    Some(&j) => in_both.push((i, j)),
                    None => only_primary.push(i),
                }
            }

            let mut only_secondary = Vec::new();
            for (j, record) in secondary.iter().enumerate() {
                if secondary_map.get(record.path()) != Some(&j) {
                    continue;
                }
                if !primary_map.contains_key(record.path()) {
                    only_secondary.push(j);
                }
            }

            (only_primary, in_both, only_secondary)
        };

        // 2. Decide what to hash
        let dirty_pairs: Vec<(usize, usize)> = match self.mode {
            RefreshMode::Fast => in_both
                .iter()
                .copied()
                .filter(|&(i, j)| {
                    primary[i].size() != secondary[j].size()
                        || is_modified_different(primary[i].modified(), secondary[j].modified())
                })
                .collect(),
            // Full mode decides dirtiness by hash, after hashing
            RefreshMode::Full => Vec::new(),
        };

        let subset: Option<Vec<usize>> = match self.mode {
            RefreshMode::Fast => {
                let mut indices = Vec::with_capacity(only_primary.len() + dirty_pairs.len());
                indices.extend_from_slice(&only_primary);
                indices.extend(dirty_pairs.iter().map(|&(i, _)| i));
                Some(indices)
            }
            RefreshMode::Full => None,
        };

        // 3. Batch hash; cancellation propagates with partial results inside
        let batch = self.hasher.hash_batch(
            base_path,
            &primary,
            subset.as_deref(),
            cancel,
        )?;

        // 4. Classify in-both pairs
        let mut clean_pairs = Vec::new();
        let mut revalidated = Vec::new();
        let mut invalid_hash = Vec::new();
        let mut size_drift = Vec::new();
        let mut date_drift = Vec::new();
        let mut size_date_drift = Vec::new();

        let mut classify_mismatch = |i: usize, j: usize| {
            let size_differs = primary[i].size() != secondary[j].size();
            let date_differs =
                is_modified_different(primary[i].modified(), secondary[j].modified());
            match (size_differs, date_differs) {
                (false, false) => invalid_hash.push(i),
                (true, false) => size_drift.push(i),
                (false, true) => date_drift.push(i),
                (true, true) => size_date_drift.push(i),
            }
        };

        match self.mode {
            RefreshMode::Fast => {
                let dirty_set: HashSet<usize> = dirty_pairs.iter().map(|&(i, _)| i).collect();
                for &(i, j) in &in_both {
                    if !dirty_set.contains(&i) {
                        clean_pairs.push((i, j));
                    }
                }
                for &(i, j) in &dirty_pairs {
                    match batch.hashes[i] {
                        // Failed re-hash: excluded from comparison, lives in
                        // the unhashable set only
                        None => {}
                        Some(hash) if hash != secondary_hashes[j] => classify_mismatch(i, j),
                        Some(_) => revalidated.push(i),
                    }
                }
            }
            RefreshMode::Full => {
                for &(i, j) in &in_both {
                    match batch.hashes[i] {
                        None => {}
                        Some(hash) if hash != secondary_hashes[j] => classify_mismatch(i, j),
                        Some(_) => clean_pairs.push((i, j)),
                    }
                }
            }
        }

        // 5. Content crosscheck: resolve orphans as moves where hashes agree
        let primary_orphan_groups = group_indices_by_hash(
            only_primary
                .iter()
                .filter_map(|&i| batch.hashes[i].map(|h| (i, h))),
        );
        let secondary_occurrences = group_by_hash(&secondary_hashes);

        let mut moved_groups: Vec<MovedGroup> = Vec::new();
        let mut moved_index: HashMap<ContentHash, usize> = HashMap::new();
        let mut found_primary: HashSet<usize> = HashSet::new();
        let mut orphan_secondary = Vec::new();
        let mut orphan_secondary_duplicate = Vec::new();

        for &j in &only_secondary {
            let hash = secondary_hashes[j];
            if let Some(primary_indices) = primary_orphan_groups.get(&hash) {
                found_primary.extend(primary_indices.iter().copied());
                match moved_index.get(&hash) {
                    Some(&k) => moved_groups[k].secondary_indices.push(j),
                    None => {
                        moved_index.insert(hash, moved_groups.len());
                        moved_groups.push(MovedGroup {
                            hash,
                            primary_indices: primary_indices.clone(),
                            secondary_indices: vec![j],
                        });
                    }
                }
            } else {
                let occurrences = secondary_occurrences
                    .get(&hash)
                    .map(|v| v.len())
                    .unwrap_or(0);
                if occurrences >= 2 {
                    orphan_secondary_duplicate.push(j);
                } else {
                    orphan_secondary.push(j);
                }
            }
        }

        // 6. Disk-only files not explained by a move
        let orphan_primary: Vec<usize> = only_primary
            .iter()
            .copied()
            .filter(|i| !found_primary.contains(i))
            .collect();

        // 7. Manifest assembly: inherit where trusted, keep fresh hashes
        // elsewhere, exclude unhashable files
        let mut final_hashes = batch.hashes;
        let mut inherited = 0usize;
        if self.mode == RefreshMode::Fast {
            for &(i, j) in &clean_pairs {
                final_hashes[i] = Some(secondary_hashes[j]);
                inherited += 1;
            }
        }

        let non_absent = final_hashes.iter().flatten().count();
        let expected = batch.success_indices.len() + inherited;
        if non_absent != expected {
            return Err(DigestError::consistency(
                "final hash count does not match hashed plus inherited entries",
            ));
        }

        // 8. Advisory fuzzy pass, reporting only
        let fuzzy = if self.config.find_matches_in_refresh {
            let params = FuzzyParams {
                min_file_size: self.config.skip_match_min_size,
                ..FuzzyParams::default()
            };
            Some(find_potential_matches(
                &primary,
                &secondary,
                &orphan_primary,
                &orphan_secondary,
                generated_at,
                &params,
            ))
        } else {
            None
        };

        Ok(RefreshOutcome {
            mode: self.mode,
            primary_files: primary,
            primary_hashes: final_hashes,
            secondary_files: secondary,
            secondary_hashes,
            generated_at,
            inaccessible: Vec::new(),
            clean: clean_pairs.iter().map(|&(i, _)| i).collect(),
            revalidated,
            invalid_hash,
            size_drift,
            date_drift,
            size_date_drift,
            unhashable: batch.error_indices,
            moved_groups,
            orphan_primary,
            orphan_secondary,
            orphan_secondary_duplicate,
            total_to_save: non_absent,
            fuzzy,
        })
    }
}

impl RefreshOutcome {
    /// Save the reconciled manifest to a fresh timestamped file
    pub fn save_digest(
        &self,
        dest_dir: Option<&Path>,
        prefix: Option<&str>,
    ) -> Result<Option<PathBuf>, DigestError> {
        let entries = self
            .primary_files
            .iter()
            .zip(self.primary_hashes.iter())
            .filter_map(|(record, hash)| hash.map(|h| (record, h)));
        codec::write_digest(dest_dir, prefix, entries, self.total_to_save)
    }

    /// Number of notable events across all buckets
    pub fn event_count(&self) -> usize {
        self.unhashable.len()
            + self.invalid_hash.len()
            + self.size_drift.len()
            + self.date_drift.len()
            + self.size_date_drift.len()
            + self.revalidated.len()
            + self.orphan_secondary.len()
            + self.orphan_primary.len()
            + self.orphan_secondary_duplicate.len()
            + self.moved_groups.len()
    }

    /// Render the full refresh report as plain text
    pub fn render(&self, revalidated_severity: RevalidatedSeverity) -> String {
        let mut out = String::new();

        out.push_str(&format!("Mode: {}\n", self.mode.label()));
        out.push_str(&format!(
            "Out of {} files on disk and {} files in the digest file, {} files could only be \
             found on disk and {} files could only be found in the digest file.\n",
            self.primary_files.len(),
            self.secondary_files.len(),
            self.orphan_primary.len(),
            self.orphan_secondary.len(),
        ));

        if self.mode == RefreshMode::Full {
            let mismatched = self.invalid_hash.len()
                + self.size_drift.len()
                + self.date_drift.len()
                + self.size_date_drift.len();
            out.push_str(&format!(
                "{} out of {} have a different hash.\n",
                mismatched,
                self.primary_files.len()
            ));
        }

        let revalidated_is_warning = revalidated_severity == RevalidatedSeverity::Warning;

        let ok = self.moved_groups.len()
            + if revalidated_is_warning { 0 } else { self.revalidated.len() };
        let warnings = self.size_drift.len()
            + self.date_drift.len()
            + self.size_date_drift.len()
            + self.orphan_secondary.len()
            + self.orphan_primary.len()
            + self.orphan_secondary_duplicate.len()
            + if revalidated_is_warning { self.revalidated.len() } else { 0 };
        let errors = self.invalid_hash.len() + self.unhashable.len();
        out.push_str(&format!(
            "There are {} successful operations, {} warnings and {} errors.\n",
            ok, warnings, errors
        ));

        if !self.unhashable.is_empty() {
            out.push_str(&format!(
                "\n({}) Could not hash these files:\n",
                self.unhashable.len()
            ));
            self.push_primary_paths(&mut out, &self.unhashable);
            out.push_str(
                "WARNING: this report is not complete due to inaccessible files \
                 (they are excluded from the digest that will be saved)\n",
            );
        }

        if !self.invalid_hash.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that have invalid hashes and identical size and last modified date:\n",
                self.invalid_hash.len()
            ));
            self.push_primary_paths(&mut out, &self.invalid_hash);
        }

        if !self.size_drift.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that have different size and hash: (High priority warning)\n",
                self.size_drift.len()
            ));
            self.push_primary_paths(&mut out, &self.size_drift);
        }

        if !self.date_drift.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that have different last modified date and hash: (Medium priority warning)\n",
                self.date_drift.len()
            ));
            self.push_primary_paths(&mut out, &self.date_drift);
        }

        if !self.size_date_drift.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that have different size, last modified date and hash: (Low priority warning)\n",
                self.size_date_drift.len()
            ));
            self.push_primary_paths(&mut out, &self.size_date_drift);
        }

        if !self.orphan_secondary.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that were only found in the digest file:\n",
                self.orphan_secondary.len()
            ));
            for &j in &self.orphan_secondary {
                out.push_str(&format!("   {}\n", self.secondary_files[j].path().display()));
            }
        }

        if !self.orphan_primary.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that were only found on disk:\n",
                self.orphan_primary.len()
            ));
            self.push_primary_paths(&mut out, &self.orphan_primary);
        }

        if !self.orphan_secondary_duplicate.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that were only found in the digest file and have duplicates in it:\n",
                self.orphan_secondary_duplicate.len()
            ));
            for &j in &self.orphan_secondary_duplicate {
                out.push_str(&format!("   {}\n", self.secondary_files[j].path().display()));
            }
        }

        if !self.revalidated.is_empty() {
            out.push_str(&format!(
                "\n({}) Files that have different size or last modified date, but identical hashes:{}\n",
                self.revalidated.len(),
                if revalidated_is_warning { " (Warning)" } else { "" }
            ));
            self.push_primary_paths(&mut out, &self.revalidated);
        }

        if !self.moved_groups.is_empty() {
            out.push_str(&format!(
                "\n({}) Files from the digest that don't exist on disk but were found elsewhere on disk:\n",
                self.moved_groups.len()
            ));
            for group in &self.moved_groups {
                out.push_str("------\nOn disk:\n");
                for &i in &group.primary_indices {
                    out.push_str(&format!("   {}\n", self.primary_files[i].path().display()));
                }
                out.push_str("Only in digest:\n");
                for &j in &group.secondary_indices {
                    out.push_str(&format!("   {}\n", self.secondary_files[j].path().display()));
                }
            }
        }

        if let Some(ref fuzzy) = self.fuzzy {
            out.push_str("\n------\nUnmatched files similarity:\n");
            out.push_str(&format!(
                "Found {} potential matches between orphaned files:\n",
                fuzzy.matches.len()
            ));

            for potential in &fuzzy.matches {
                out.push_str(&format!(
                    "\nPotential match (confidence: {:.0}%):\n",
                    potential.confidence * 100.0
                ));
                out.push_str(&format!(
                    "  Disk:   {}\n",
                    self.primary_files[potential.primary_index].path().display()
                ));
                out.push_str(&format!(
                    "  Digest: {}\n",
                    self.secondary_files[potential.secondary_index].path().display()
                ));
                out.push_str("  Reasons:\n");
                for reason in &potential.reasons {
                    out.push_str(&format!("    - {}\n", reason));
                }
            }

            let unmatched_primary: Vec<usize> = self
                .orphan_primary
                .iter()
                .copied()
                .filter(|i| !fuzzy.matched_primary.contains(i))
                .collect();
            if !unmatched_primary.is_empty() && !fuzzy.matches.is_empty() {
                out.push_str(&format!(
                    "\n({}) Unmatched files found only on disk:\n",
                    unmatched_primary.len()
                ));
                self.push_primary_paths(&mut out, &unmatched_primary);
            }

            let unmatched_secondary: Vec<usize> = self
                .orphan_secondary
                .iter()
                .copied()
                .filter(|j| !fuzzy.matched_secondary.contains(j))
                .collect();
            if !unmatched_secondary.is_empty() && !fuzzy.matches.is_empty() {
                out.push_str(&format!(
                    "\n({}) Unmatched files found only in digest:\n",
                    unmatched_secondary.len()
                ));
                for &j in &unmatched_secondary {
                    out.push_str(&format!("  {}\n", self.secondary_files[j].path().display()));
                }
            }
        }

        out
    }

    /// JSON form of the classification counts for machine consumers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(serde::Serialize)]
        struct Summary<'a> {
            mode: &'a str,
            files_on_disk: usize,
            files_in_digest: usize,
            clean: usize,
            revalidated: usize,
            invalid_hash: usize,
            size_drift: usize,
            date_drift: usize,
            size_date_drift: usize,
            unhashable: usize,
            moved_groups: usize,
            orphans_on_disk: usize,
            orphans_in_digest: usize,
            orphans_in_digest_duplicate: usize,
            potential_matches: usize,
            entries_to_save: usize,
        }

        serde_json::to_string_pretty(&Summary {
            mode: self.mode.label(),
            files_on_disk: self.primary_files.len(),
            files_in_digest: self.secondary_files.len(),
            clean: self.clean.len(),
            revalidated: self.revalidated.len(),
            invalid_hash: self.invalid_hash.len(),
            size_drift: self.size_drift.len(),
            date_drift: self.date_drift.len(),
            size_date_drift: self.size_date_drift.len(),
            unhashable: self.unhashable.len(),
            moved_groups: self.moved_groups.len(),
            orphans_on_disk: self.orphan_primary.len(),
            orphans_in_digest: self.orphan_secondary.len(),
            orphans_in_digest_duplicate: self.orphan_secondary_duplicate.len(),
            potential_matches: self.fuzzy.as_ref().map(|f| f.matches.len()).unwrap_or(0),
            entries_to_save: self.total_to_save,
        })
    }

    fn push_primary_paths(&self, out: &mut String, indices: &[usize]) {
        for &i in indices {
            out.push_str(&format!("   {}\n", self.primary_files[i].path().display()));
        }
    }
}
