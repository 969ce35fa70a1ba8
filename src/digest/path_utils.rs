// Path normalization utilities for cross-platform manifest handling
// Manifests written on one platform may carry the other's separators

use std::path::{Path, PathBuf};

/// Normalize a path string by converting both separator styles to the
/// platform-specific separator
pub fn normalize_path_string(path_str: &str) -> String {
    if cfg!(windows) {
        path_str.replace('/', "\\")
    } else {
        path_str.replace('\\', "/")
    }
}

/// Parse a relative path from a manifest entry, handling mixed separators
pub fn parse_manifest_path(path_str: &str) -> PathBuf {
    PathBuf::from(normalize_path_string(path_str))
}

/// Resolve a path that may be relative or absolute against a base directory
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
