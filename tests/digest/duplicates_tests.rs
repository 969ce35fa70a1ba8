// Tests for duplicate grouping and the duplicate report

use std::path::PathBuf;

use chrono::Local;
use dirsum::digest::duplicates::{group_by_hash, DuplicatesEngine};
use dirsum::digest::hash::ContentHash;
use dirsum::digest::record::FileRecord;

fn record(path: &str, size: u64) -> FileRecord {
    FileRecord::new(PathBuf::from(path), size, Local::now())
}

#[test]
fn test_grouping_preserves_insertion_order_within_groups() {
    let shared = ContentHash::of_bytes(b"shared");
    let unique = ContentHash::of_bytes(b"unique");
    let hashes = vec![shared, unique, shared, shared];

    let groups = group_by_hash(&hashes);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&shared], vec![0, 2, 3]);
    assert_eq!(groups[&unique], vec![1]);
}

#[test]
fn test_wasted_bytes_per_group_and_total() {
    let big = ContentHash::of_bytes(b"big");
    let small = ContentHash::of_bytes(b"small");
    let files = vec![
        record("a/big1", 1000),
        record("b/big2", 1000),
        record("c/big3", 1000),
        record("d/small1", 10),
        record("e/small2", 10),
        record("f/other", 77),
    ];
    let hashes = vec![big, big, big, small, small, ContentHash::of_bytes(b"x")];

    let report = DuplicatesEngine::new(true).analyze(files, hashes).unwrap();

    assert_eq!(report.groups.len(), 2);
    // Sorted by wasted size: 1000 × (3 − 1) first, then 10 × (2 − 1)
    assert_eq!(report.groups[0].wasted_bytes, 2000);
    assert_eq!(report.groups[1].wasted_bytes, 10);
    assert_eq!(report.total_wasted_bytes, 2010);
    assert_eq!(
        report.total_wasted_bytes,
        report.groups.iter().map(|g| g.wasted_bytes).sum::<u64>()
    );
    assert_eq!(report.duplicate_file_count(), 3);
}

#[test]
fn test_no_duplicates_yields_empty_report() {
    let files = vec![record("one", 1), record("two", 2)];
    let hashes = vec![ContentHash::of_bytes(b"one"), ContentHash::of_bytes(b"two")];

    let report = DuplicatesEngine::new(true).analyze(files, hashes).unwrap();
    assert!(report.groups.is_empty());
    assert_eq!(report.total_wasted_bytes, 0);
    assert_eq!(report.duplicate_file_count(), 0);
}

#[test]
fn test_mismatched_lengths_is_consistency_fault() {
    let files = vec![record("one", 1)];
    let result = DuplicatesEngine::new(false).analyze(files, Vec::new());
    assert!(result.unwrap_err().is_consistency());
}

#[test]
fn test_report_renders_paths_and_json() {
    let dup = ContentHash::of_bytes(b"dup");
    let files = vec![record("x/a.bin", 50), record("y/b.bin", 50)];
    let hashes = vec![dup, dup];

    let report = DuplicatesEngine::new(true).analyze(files, hashes).unwrap();
    let text = report.render();
    assert!(text.contains("x/a.bin"));
    assert!(text.contains("y/b.bin"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["duplicate_groups"], 1);
    assert_eq!(json["total_wasted_bytes"], 50);
}
