// Tests for the manifest codec

use std::fs;

use dirsum::digest::codec::{read_digest, write_digest, DIGEST_EXTENSION};
use dirsum::digest::error::{DigestError, FormatErrorKind};
use dirsum::digest::hash::ContentHash;
use dirsum::digest::record::FileRecord;
use tempfile::tempdir;

fn sample_entries() -> Vec<(FileRecord, ContentHash)> {
    vec![
        (
            FileRecord::from_text("docs/readme.txt", "1024", "2024-03-01 10:15:30", 1).unwrap(),
            ContentHash::of_bytes(b"first"),
        ),
        (
            FileRecord::from_text("bin/tool.exe", "52428800", "2023-11-20 22:01:02", 1).unwrap(),
            ContentHash::of_bytes(b"second"),
        ),
        (
            FileRecord::from_text("a file with spaces.dat", "0", "2020-01-01 00:00:00", 1).unwrap(),
            ContentHash::of_bytes(b"third"),
        ),
    ]
}

fn entry_key(record: &FileRecord, hash: &ContentHash) -> (String, u64, String, String) {
    (
        record.path().display().to_string(),
        record.size(),
        record.modified_to_string(),
        hash.to_hex(),
    )
}

#[test]
fn test_round_trip_preserves_entries() {
    let dir = tempdir().unwrap();
    let entries = sample_entries();

    let path = write_digest(
        Some(dir.path()),
        None,
        entries.iter().map(|(r, h)| (r, *h)),
        entries.len(),
    )
    .unwrap()
    .expect("write should succeed");

    let manifest = read_digest(&path).unwrap();
    assert_eq!(manifest.files.len(), entries.len());

    let mut written: Vec<_> = entries.iter().map(|(r, h)| entry_key(r, h)).collect();
    let mut read: Vec<_> = manifest
        .files
        .iter()
        .zip(manifest.hashes.iter())
        .map(|(r, h)| entry_key(r, h))
        .collect();
    written.sort();
    read.sort();
    assert_eq!(written, read);
}

#[test]
fn test_written_file_name_carries_prefix_and_extension() {
    let dir = tempdir().unwrap();
    let entries = sample_entries();

    let path = write_digest(
        Some(dir.path()),
        Some("photos_"),
        entries.iter().map(|(r, h)| (r, *h)),
        entries.len(),
    )
    .unwrap()
    .unwrap();

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("photos_"));
    assert!(name.ends_with(&format!(".{}", DIGEST_EXTENSION)));
}

#[test]
fn test_write_to_missing_directory_returns_none() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does/not/exist");
    let entries = sample_entries();

    let result = write_digest(
        Some(&missing),
        None,
        entries.iter().map(|(r, h)| (r, *h)),
        entries.len(),
    )
    .unwrap();

    assert!(result.is_none());
}

#[test]
fn test_declared_count_mismatch_is_consistency_fault() {
    let dir = tempdir().unwrap();
    let entries = sample_entries();

    let result = write_digest(
        Some(dir.path()),
        None,
        entries.iter().map(|(r, h)| (r, *h)),
        entries.len() + 1,
    );

    match result {
        Err(e) => assert!(e.is_consistency()),
        Ok(_) => panic!("count mismatch must be a consistency fault"),
    }
}

#[test]
fn test_blank_lines_between_entries_tolerated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("digest.ddxxh3");
    let hash = ContentHash::of_bytes(b"x").to_hex();
    fs::write(
        &path,
        format!(
            "; Directory digest saved at 2024-05-01 12:00:00 containing 2 entries\n\
             \n\
             ; Size: 10, Last modified: 2024-04-30 09:00:00\n\
             {hash} *one.txt\n\
             \n\
             \n\
             ; Size: 20, Last modified: 2024-04-30 09:30:00\n\
             {hash} *two.txt\n"
        ),
    )
    .unwrap();

    let manifest = read_digest(&path).unwrap();
    assert_eq!(manifest.files.len(), 2);
    assert_eq!(manifest.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 12:00:00");
}

fn expect_format_error(content: &str, expected: FormatErrorKind) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("digest.ddxxh3");
    fs::write(&path, content).unwrap();

    match read_digest(&path) {
        Err(DigestError::Format { kind, .. }) => assert_eq!(kind, expected),
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

#[test]
fn test_missing_header_rejected() {
    expect_format_error("not a digest\n", FormatErrorKind::MissingHeader);
}

#[test]
fn test_unparseable_generation_date_rejected() {
    expect_format_error(
        "; Directory digest saved at tomorrow sometime containing 1 entries\n",
        FormatErrorKind::UnparseableGenerationDate,
    );
}

#[test]
fn test_missing_size_marker_rejected() {
    let hash = ContentHash::of_bytes(b"x").to_hex();
    expect_format_error(
        &format!(
            "; Directory digest saved at 2024-05-01 12:00:00 containing 1 entries\n\
             ; Wrong: 10, Last modified: 2024-04-30 09:00:00\n\
             {hash} *one.txt\n"
        ),
        FormatErrorKind::MissingSizeMarker,
    );
}

#[test]
fn test_missing_path_separator_rejects_whole_manifest() {
    // The data line lacks the " *" separator between hash and path
    let hash = ContentHash::of_bytes(b"x").to_hex();
    expect_format_error(
        &format!(
            "; Directory digest saved at 2024-05-01 12:00:00 containing 1 entries\n\
             ; Size: 10, Last modified: 2024-04-30 09:00:00\n\
             {hash}one.txt\n"
        ),
        FormatErrorKind::MissingPathSeparator,
    );
    assert_eq!(
        FormatErrorKind::MissingPathSeparator.to_string(),
        "missing file path separator"
    );
}

#[test]
fn test_malformed_hash_rejected() {
    expect_format_error(
        "; Directory digest saved at 2024-05-01 12:00:00 containing 1 entries\n\
         ; Size: 10, Last modified: 2024-04-30 09:00:00\n\
         NOTHEX *one.txt\n",
        FormatErrorKind::MalformedHash,
    );
}

#[test]
fn test_non_numeric_size_rejected() {
    let hash = ContentHash::of_bytes(b"x").to_hex();
    expect_format_error(
        &format!(
            "; Directory digest saved at 2024-05-01 12:00:00 containing 1 entries\n\
             ; Size: lots, Last modified: 2024-04-30 09:00:00\n\
             {hash} *one.txt\n"
        ),
        FormatErrorKind::NonNumericSize,
    );
}

#[test]
fn test_incomplete_entry_rejected() {
    expect_format_error(
        "; Directory digest saved at 2024-05-01 12:00:00 containing 1 entries\n\
         ; Size: 10, Last modified: 2024-04-30 09:00:00\n",
        FormatErrorKind::IncompleteEntry,
    );
}

#[test]
fn test_missing_manifest_is_not_format_error() {
    let dir = tempdir().unwrap();
    match read_digest(&dir.path().join("nope.ddxxh3")) {
        Err(DigestError::ManifestNotFound { .. }) => {}
        other => panic!("expected ManifestNotFound, got {:?}", other),
    }
}
