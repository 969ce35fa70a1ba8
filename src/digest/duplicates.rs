// Duplicate detection module
// Groups files by content hash; shared by the standalone duplicate report
// and the reconciliation crosscheck

use std::collections::HashMap;

use humansize::{format_size, BINARY};

use super::error::DigestError;
use super::hash::ContentHash;
use super::record::FileRecord;

/// Group arbitrary (index, hash) pairs by hash, preserving insertion order
/// within each group
pub fn group_indices_by_hash<I>(items: I) -> HashMap<ContentHash, Vec<usize>>
where
    I: IntoIterator<Item = (usize, ContentHash)>,
{
    let mut groups: HashMap<ContentHash, Vec<usize>> = HashMap::new();
    for (index, hash) in items {
        groups.entry(hash).or_default().push(index);
    }
    groups
}

/// Group a full hash list by content, index order preserved per group
pub fn group_by_hash(hashes: &[ContentHash]) -> HashMap<ContentHash, Vec<usize>> {
    group_indices_by_hash(hashes.iter().enumerate().map(|(i, h)| (i, *h)))
}

/// Files sharing one content hash
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub hash: ContentHash,
    pub indices: Vec<usize>,
    /// size × (count − 1): bytes that would be freed by keeping one copy
    pub wasted_bytes: u64,
}

/// Standalone duplicate report over one manifest
#[derive(Debug)]
pub struct DuplicateReport {
    pub files: Vec<FileRecord>,
    pub groups: Vec<DuplicateGroup>,
    pub total_wasted_bytes: u64,
}

/// Engine for finding duplicate content within a digest
pub struct DuplicatesEngine {
    sort_by_wasted_size: bool,
}

impl DuplicatesEngine {
    pub fn new(sort_by_wasted_size: bool) -> Self {
        Self { sort_by_wasted_size }
    }

    /// Group the manifest's entries by content hash and account wasted bytes
    pub fn analyze(
        &self,
        files: Vec<FileRecord>,
        hashes: Vec<ContentHash>,
    ) -> Result<DuplicateReport, DigestError> {
        if files.len() != hashes.len() {
            return Err(DigestError::consistency(
                "file and hash counts differ in duplicate analysis",
            ));
        }

        let mut groups = Vec::new();
        let mut total_wasted_bytes = 0u64;

        for (hash, indices) in group_by_hash(&hashes) {
            if indices.len() < 2 {
                continue;
            }
            let wasted_bytes = files[indices[0]].size() * (indices.len() as u64 - 1);
            total_wasted_bytes += wasted_bytes;
            groups.push(DuplicateGroup {
                hash,
                indices,
                wasted_bytes,
            });
        }

        if self.sort_by_wasted_size {
            groups.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));
        } else {
            groups.sort_by(|a, b| a.indices[0].cmp(&b.indices[0]));
        }

        Ok(DuplicateReport {
            files,
            groups,
            total_wasted_bytes,
        })
    }
}

impl DuplicateReport {
    /// Render the report as plain text
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "Found {} duplicate groups. Duplicate copies make up {:.2}% of the total files.\n",
            self.groups.len(),
            self.duplicate_file_count() as f64 * 100.0 / self.files.len().max(1) as f64
        ));

        for group in &self.groups {
            out.push_str(&format!(
                "#### Wasted {}:\n",
                format_size(group.wasted_bytes, BINARY)
            ));
            for &index in &group.indices {
                out.push_str(&format!("   {}\n", self.files[index].path().display()));
            }
        }

        out.push_str("------\n");
        out.push_str(&format!(
            "Total size wasted: {}.\n",
            format_size(self.total_wasted_bytes, BINARY)
        ));

        out
    }

    /// Number of redundant copies across all groups
    pub fn duplicate_file_count(&self) -> usize {
        self.groups.iter().map(|g| g.indices.len() - 1).sum()
    }

    /// JSON form for machine consumers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(serde::Serialize)]
        struct GroupJson {
            hash: String,
            wasted_bytes: u64,
            paths: Vec<String>,
        }

        #[derive(serde::Serialize)]
        struct ReportJson {
            total_files: usize,
            duplicate_groups: usize,
            total_wasted_bytes: u64,
            groups: Vec<GroupJson>,
        }

        let report = ReportJson {
            total_files: self.files.len(),
            duplicate_groups: self.groups.len(),
            total_wasted_bytes: self.total_wasted_bytes,
            groups: self
                .groups
                .iter()
                .map(|g| GroupJson {
                    hash: g.hash.to_hex(),
                    wasted_bytes: g.wasted_bytes,
                    paths: g
                        .indices
                        .iter()
                        .map(|&i| self.files[i].path().display().to_string())
                        .collect(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&report)
    }
}
