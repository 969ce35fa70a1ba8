// Tests for the content hash engine

use std::fs;

use dirsum::digest::hash::ContentHash;
use tempfile::tempdir;

#[test]
fn test_hex_round_trip() {
    let hash = ContentHash::of_bytes(b"hello world");
    let hex = hash.to_hex();

    assert_eq!(hex.len(), 32);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hex, hex.to_uppercase());

    let parsed = ContentHash::parse(&hex, 1).unwrap();
    assert_eq!(parsed, hash);
}

#[test]
fn test_parse_accepts_lowercase() {
    let hash = ContentHash::of_bytes(b"data");
    let parsed = ContentHash::parse(&hash.to_hex().to_lowercase(), 1).unwrap();
    assert_eq!(parsed, hash);
}

#[test]
fn test_parse_rejects_wrong_length() {
    assert!(ContentHash::parse("ABCDEF", 1).is_err());
    assert!(ContentHash::parse("", 1).is_err());
    assert!(ContentHash::parse(&"A".repeat(33), 1).is_err());
}

#[test]
fn test_parse_rejects_non_hex() {
    let bad = "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG";
    assert!(ContentHash::parse(bad, 1).is_err());
}

#[test]
fn test_file_hash_matches_bytes_hash() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.bin");
    let content = vec![0xA5u8; 100_000]; // spans multiple buffer reads
    fs::write(&path, &content).unwrap();

    let from_file = ContentHash::of_file(&path).unwrap();
    assert_eq!(from_file, ContentHash::of_bytes(&content));
}

#[test]
fn test_identical_content_same_hash_different_content_different_hash() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let c = dir.path().join("c.bin");
    fs::write(&a, b"same content").unwrap();
    fs::write(&b, b"same content").unwrap();
    fs::write(&c, b"other content").unwrap();

    let ha = ContentHash::of_file(&a).unwrap();
    let hb = ContentHash::of_file(&b).unwrap();
    let hc = ContentHash::of_file(&c).unwrap();

    assert_eq!(ha, hb);
    assert_ne!(ha, hc);
}

#[test]
fn test_empty_file_hashes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty");
    fs::write(&path, b"").unwrap();

    let hash = ContentHash::of_file(&path).unwrap();
    assert_eq!(hash, ContentHash::of_bytes(b""));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(ContentHash::of_file(&dir.path().join("missing")).is_err());
}
