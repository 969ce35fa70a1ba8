// Tests for the fuzzy orphan matcher

use std::path::PathBuf;

use chrono::{Duration, Local};
use dirsum::digest::fuzzy::{find_potential_matches, levenshtein_similarity, FuzzyParams};
use dirsum::digest::record::FileRecord;

fn record(path: &str, size: u64, age_secs: i64) -> FileRecord {
    FileRecord::new(
        PathBuf::from(path),
        size,
        Local::now() - Duration::seconds(age_secs),
    )
}

fn params() -> FuzzyParams {
    FuzzyParams {
        min_file_size: 0,
        ..FuzzyParams::default()
    }
}

#[test]
fn test_similarity_is_symmetric_and_bounded() {
    let pairs = [
        ("report", "reporte"),
        ("", "abc"),
        ("kitten", "sitting"),
        ("same", "same"),
    ];
    for (a, b) in pairs {
        let forward = levenshtein_similarity(a, b);
        let backward = levenshtein_similarity(b, a);
        assert_eq!(forward, backward, "similarity({}, {}) not symmetric", a, b);
        assert!((0.0..=1.0).contains(&forward));
    }
}

#[test]
fn test_similarity_of_two_empty_strings_is_defined() {
    assert_eq!(levenshtein_similarity("", ""), 1.0);
}

#[test]
fn test_identical_strings_have_similarity_one() {
    assert_eq!(levenshtein_similarity("archive", "archive"), 1.0);
}

#[test]
fn test_moved_file_scores_name_size_and_extension() {
    let primary = vec![record("archive/report.pdf", 500, 86_400)];
    let secondary = vec![record("docs/report.pdf", 500, 86_400)];

    let result = find_potential_matches(
        &primary,
        &secondary,
        &[0],
        &[0],
        Local::now(),
        &params(),
    );

    assert_eq!(result.matches.len(), 1);
    let m = &result.matches[0];
    // exact name 0.5 + identical size 0.3 + same extension 0.2
    assert!((m.confidence - 1.0).abs() < 1e-9);
    assert_eq!(m.reasons.len(), 3);
    assert!(result.matched_primary.contains(&0));
    assert!(result.matched_secondary.contains(&0));
}

#[test]
fn test_file_newer_than_digest_gets_penalized() {
    let generated_at = Local::now() - Duration::days(7);
    // Modified yesterday: did not exist when the digest was made
    let primary = vec![record("a/report.pdf", 500, 86_400)];
    let secondary = vec![record("b/report.pdf", 500, 864_000)];

    let result = find_potential_matches(&primary, &secondary, &[0], &[0], generated_at, &params());

    let m = &result.matches[0];
    assert!((m.confidence - 0.8).abs() < 1e-9);
    assert!(m.reasons.iter().any(|r| r.contains("newer than digest")));
}

#[test]
fn test_dissimilar_files_below_cutoff_are_not_emitted() {
    let primary = vec![record("src/main.rs", 100, 0)];
    let secondary = vec![record("media/holiday.jpg", 9_000_000, 0)];

    let result = find_potential_matches(&primary, &secondary, &[0], &[0], Local::now(), &params());

    assert!(result.matches.is_empty());
    assert!(result.matched_primary.is_empty());
}

#[test]
fn test_matches_sorted_by_descending_confidence_and_not_exclusive() {
    let primary = vec![
        record("new/exact.dat", 100, 86_400),
        record("new/exact2.dat", 97, 86_400),
    ];
    let secondary = vec![record("old/exact.dat", 100, 86_400)];

    let result = find_potential_matches(
        &primary,
        &secondary,
        &[0, 1],
        &[0],
        Local::now(),
        &params(),
    );

    assert_eq!(result.matches.len(), 2, "one secondary may match many primaries");
    for window in result.matches.windows(2) {
        assert!(window[0].confidence >= window[1].confidence);
    }
    // The same secondary index appears in every match
    assert!(result.matches.iter().all(|m| m.secondary_index == 0));
}

#[test]
fn test_small_files_skipped_when_threshold_set() {
    let primary = vec![record("a/tiny.txt", 100, 0)];
    let secondary = vec![record("b/tiny.txt", 100, 0)];

    let mut p = params();
    p.min_file_size = 4096;
    let result = find_potential_matches(&primary, &secondary, &[0], &[0], Local::now(), &p);
    assert!(result.matches.is_empty());

    p.min_file_size = 0;
    let result = find_potential_matches(&primary, &secondary, &[0], &[0], Local::now(), &p);
    assert_eq!(result.matches.len(), 1);
}
