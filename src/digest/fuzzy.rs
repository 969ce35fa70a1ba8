// Fuzzy orphan matching module
// Advisory similarity scoring between files that could not be matched by
// path or content. Augments reporting only; never reclassifies.

use std::collections::HashSet;

use chrono::{DateTime, Local};

use super::record::FileRecord;

/// Weights and thresholds of the match heuristic.
///
/// The defaults are kept verbatim from long-observed behavior; treat them
/// as tunable parameters, not derived quantities.
#[derive(Debug, Clone)]
pub struct FuzzyParams {
    pub exact_name_weight: f64,
    pub similar_name_weight: f64,
    pub name_similarity_floor: f64,
    pub identical_size_weight: f64,
    pub similar_size_weight: f64,
    pub size_ratio_floor: f64,
    pub same_extension_weight: f64,
    pub same_parent_weight: f64,
    pub similar_parent_weight: f64,
    pub parent_similarity_floor: f64,
    /// Applied when the disk file is newer than the digest: it cannot have
    /// existed when the manifest was made.
    pub recency_penalty: f64,
    pub confidence_cutoff: f64,
    /// Files smaller than this are excluded from pairing; 0 disables the skip
    pub min_file_size: u64,
}

impl Default for FuzzyParams {
    fn default() -> Self {
        Self {
            exact_name_weight: 0.5,
            similar_name_weight: 0.3,
            name_similarity_floor: 0.8,
            identical_size_weight: 0.3,
            similar_size_weight: 0.15,
            size_ratio_floor: 0.95,
            same_extension_weight: 0.2,
            same_parent_weight: 0.3,
            similar_parent_weight: 0.15,
            parent_similarity_floor: 0.7,
            recency_penalty: 0.8,
            confidence_cutoff: 0.4,
            min_file_size: 0,
        }
    }
}

/// One advisory pairing between a disk orphan and a digest orphan.
/// Indices may appear in several matches; nothing here is exclusive.
#[derive(Debug, Clone)]
pub struct PotentialMatch {
    pub primary_index: usize,
    pub secondary_index: usize,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// All matches above the cutoff, plus the index sets they cover
#[derive(Debug, Default)]
pub struct FuzzyMatches {
    pub matches: Vec<PotentialMatch>,
    pub matched_primary: HashSet<usize>,
    pub matched_secondary: HashSet<usize>,
}

/// Score every (primary orphan, secondary orphan) pair.
///
/// Cost is O(|primary| × |secondary|); acceptable because orphan sets are
/// expected to be small after the content crosscheck has run.
pub fn find_potential_matches(
    primary_files: &[FileRecord],
    secondary_files: &[FileRecord],
    primary_orphans: &[usize],
    secondary_orphans: &[usize],
    digest_generated_at: DateTime<Local>,
    params: &FuzzyParams,
) -> FuzzyMatches {
    let mut result = FuzzyMatches::default();

    for &primary_index in primary_orphans {
        let primary = &primary_files[primary_index];
        if params.min_file_size > 0 && primary.size() < params.min_file_size {
            continue;
        }

        for &secondary_index in secondary_orphans {
            let secondary = &secondary_files[secondary_index];
            if params.min_file_size > 0 && secondary.size() < params.min_file_size {
                continue;
            }

            let mut confidence = 0.0;
            let mut reasons = Vec::new();

            let primary_name = primary.file_name();
            let secondary_name = secondary.file_name();

            if primary_name == secondary_name {
                confidence += params.exact_name_weight;
                reasons.push(format!(
                    "Exact filename match (+{:.0}%)",
                    params.exact_name_weight * 100.0
                ));
            } else {
                let similarity = levenshtein_similarity(primary_name, secondary_name);
                if similarity > params.name_similarity_floor {
                    confidence += params.similar_name_weight;
                    reasons.push(format!(
                        "Similar filename (similarity: {:.0}%) (+{:.0}%)",
                        similarity * 100.0,
                        params.similar_name_weight * 100.0
                    ));
                }
            }

            let min_size = primary.size().min(secondary.size());
            let max_size = primary.size().max(secondary.size());

            if primary.size() == secondary.size() {
                confidence += params.identical_size_weight;
                reasons.push(format!(
                    "Identical size (+{:.0}%)",
                    params.identical_size_weight * 100.0
                ));
            } else if max_size > 0 {
                let ratio = min_size as f64 / max_size as f64;
                if ratio > params.size_ratio_floor {
                    confidence += params.similar_size_weight;
                    reasons.push(format!(
                        "Similar size (ratio: {:.0}%) (+{:.0}%)",
                        ratio * 100.0,
                        params.similar_size_weight * 100.0
                    ));
                }
            }

            if primary.extension() == secondary.extension() {
                confidence += params.same_extension_weight;
                reasons.push(format!(
                    "Same file extension (+{:.0}%)",
                    params.same_extension_weight * 100.0
                ));
            }

            let primary_dir = primary.parent_dir();
            let secondary_dir = secondary.parent_dir();

            if primary_dir == secondary_dir {
                confidence += params.same_parent_weight;
                reasons.push(format!(
                    "Same parent directory (+{:.0}%)",
                    params.same_parent_weight * 100.0
                ));
            } else {
                let similarity = levenshtein_similarity(primary_dir, secondary_dir);
                if similarity > params.parent_similarity_floor {
                    confidence += params.similar_parent_weight;
                    reasons.push(format!(
                        "Similar parent directory (similarity: {:.0}%) (+{:.0}%)",
                        similarity * 100.0,
                        params.similar_parent_weight * 100.0
                    ));
                }
            }

            if primary.modified() > digest_generated_at {
                confidence *= params.recency_penalty;
                reasons.push(format!(
                    "File is newer than digest date (x{:.2})",
                    params.recency_penalty
                ));
            }

            if confidence > params.confidence_cutoff {
                result.matched_primary.insert(primary_index);
                result.matched_secondary.insert(secondary_index);
                result.matches.push(PotentialMatch {
                    primary_index,
                    secondary_index,
                    confidence,
                    reasons,
                });
            }
        }
    }

    result
        .matches
        .sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    result
}

/// Normalized similarity in [0, 1]; 1 means identical. Two empty strings
/// are identical by definition.
pub fn levenshtein_similarity(first: &str, second: &str) -> f64 {
    let max_length = first.chars().count().max(second.chars().count());
    if max_length == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(first, second) as f64 / max_length as f64
}

fn levenshtein_distance(first: &str, second: &str) -> usize {
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let mut previous: Vec<usize> = (0..=second.len()).collect();
    let mut current = vec![0usize; second.len() + 1];

    for (i, &a) in first.iter().enumerate() {
        current[0] = i + 1;
        for (j, &b) in second.iter().enumerate() {
            let cost = if a == b { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[second.len()]
}
