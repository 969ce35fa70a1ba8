// Tests for the directory walker

use std::fs;
use std::path::PathBuf;

use dirsum::digest::error::DigestError;
use dirsum::digest::walk::walk_directory;
use tempfile::tempdir;

#[test]
fn test_walk_collects_nested_files_with_relative_paths() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
    fs::write(dir.path().join("top.txt"), b"1").unwrap();
    fs::write(dir.path().join("sub/mid.txt"), b"22").unwrap();
    fs::write(dir.path().join("sub/deep/leaf.txt"), b"333").unwrap();

    let outcome = walk_directory(dir.path(), "*").unwrap();
    let mut paths: Vec<PathBuf> = outcome.files.iter().map(|r| r.path().to_path_buf()).collect();
    paths.sort();

    assert_eq!(
        paths,
        vec![
            PathBuf::from("sub/deep/leaf.txt"),
            PathBuf::from("sub/mid.txt"),
            PathBuf::from("top.txt"),
        ]
    );
    assert!(outcome.inaccessible.is_empty());

    let leaf = outcome
        .files
        .iter()
        .find(|r| r.path() == PathBuf::from("sub/deep/leaf.txt"))
        .unwrap();
    assert_eq!(leaf.size(), 3);
}

#[test]
fn test_walk_pattern_filters_by_file_name() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.jpg"), b"jpg").unwrap();
    fs::write(dir.path().join("skip.txt"), b"txt").unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/also.jpg"), b"jpg2").unwrap();

    let outcome = walk_directory(dir.path(), "*.jpg").unwrap();
    let mut names: Vec<String> = outcome
        .files
        .iter()
        .map(|r| r.file_name().to_string())
        .collect();
    names.sort();

    assert_eq!(names, vec!["also.jpg", "keep.jpg"]);
}

#[test]
fn test_walk_missing_directory_fails() {
    let dir = tempdir().unwrap();
    match walk_directory(&dir.path().join("absent"), "*") {
        Err(DigestError::DirectoryNotFound { .. }) => {}
        other => panic!("expected DirectoryNotFound, got {:?}", other),
    }
}

#[test]
fn test_walk_invalid_pattern_is_configuration_error() {
    let dir = tempdir().unwrap();
    match walk_directory(dir.path(), "[") {
        Err(DigestError::Configuration { .. }) => {}
        other => panic!("expected Configuration error, got {:?}", other),
    }
}

#[test]
fn test_sumignore_excludes_files_and_itself() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".sumignore"), "*.tmp\ncache/\n").unwrap();
    fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
    fs::write(dir.path().join("scratch.tmp"), b"drop").unwrap();
    fs::create_dir_all(dir.path().join("cache")).unwrap();
    fs::write(dir.path().join("cache/blob.bin"), b"drop").unwrap();

    let outcome = walk_directory(dir.path(), "*").unwrap();
    let mut paths: Vec<String> = outcome
        .files
        .iter()
        .map(|r| r.path().display().to_string())
        .collect();
    paths.sort();

    assert_eq!(paths, vec!["keep.txt"]);
}

#[test]
fn test_hidden_files_are_included() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"h").unwrap();
    fs::write(dir.path().join("plain"), b"p").unwrap();

    let outcome = walk_directory(dir.path(), "*").unwrap();
    assert_eq!(outcome.files.len(), 2);
}
