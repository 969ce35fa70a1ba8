// Configuration module
// Loads dirsum.toml with defaults; components receive the value explicitly

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Config file name, looked up in the working directory first and the user
/// config directory second
pub const CONFIG_FILE_NAME: &str = "dirsum.toml";

/// How the report treats fast-refresh files whose metadata drifted but
/// whose re-hash still matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevalidatedSeverity {
    Success,
    Warning,
}

/// Tool configuration, passed by value into the engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Glob matched against file names during directory walks
    pub walk_pattern: String,
    /// Mirror every report to a timestamped log file
    pub print_to_log: bool,
    /// Sort duplicate groups by wasted bytes instead of manifest order
    pub sort_duplicates_by_size: bool,
    /// Prefix saved digest filenames with the scanned directory's name
    pub prefix_digest_filename: bool,
    /// Run the fuzzy orphan matcher after a refresh
    pub find_matches_in_refresh: bool,
    /// Files smaller than this are skipped by the fuzzy matcher; 0 disables
    pub skip_match_min_size: u64,
    pub revalidated_severity: RevalidatedSeverity,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            walk_pattern: "*".to_string(),
            print_to_log: true,
            sort_duplicates_by_size: true,
            prefix_digest_filename: true,
            find_matches_in_refresh: true,
            skip_match_min_size: 4 * 1024,
            revalidated_severity: RevalidatedSeverity::Success,
        }
    }
}

impl DigestConfig {
    /// Load the configuration, writing a default file on first run.
    /// Any read or parse failure falls back to defaults.
    pub fn load() -> Self {
        for path in Self::candidate_paths() {
            if let Ok(text) = fs::read_to_string(&path) {
                match toml::from_str(&text) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Ignoring invalid {}: {}", path.display(), e);
                        return Self::default();
                    }
                }
            }
        }

        let config = Self::default();
        if let Ok(text) = toml::to_string_pretty(&config) {
            let _ = fs::write(CONFIG_FILE_NAME, text);
        }
        config
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dirsum").join(CONFIG_FILE_NAME));
        }
        paths
    }
}
