// Report sink module
// Fans rendered report text out to the console and an optional log file.
// The engines only produce structured data; rendering happens on the
// report types and I/O happens here.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

/// Sink for rendered report text
pub struct ReportSink {
    to_console: bool,
    log: Option<BufWriter<File>>,
    log_path: Option<PathBuf>,
}

impl ReportSink {
    /// Open a sink. When `to_file` is set, a fresh `dirsum-<stamp>.log` is
    /// created in the working directory; failure to create it downgrades to
    /// console-only with a warning.
    pub fn new(to_console: bool, to_file: bool) -> Self {
        Self::with_log_dir(to_console, to_file, Path::new("."))
    }

    /// Same as `new`, with an explicit directory for the log file
    pub fn with_log_dir(to_console: bool, to_file: bool, dir: &Path) -> Self {
        let mut log_path = None;
        let log = if to_file {
            let path = dir.join(format!(
                "dirsum-{}.log",
                Local::now().format("%Y-%m-%d_%H-%M-%S")
            ));
            match File::create(&path) {
                Ok(file) => {
                    log_path = Some(path);
                    Some(BufWriter::new(file))
                }
                Err(e) => {
                    eprintln!("Warning: Failed to create log file {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Self { to_console, log, log_path }
    }

    /// Path of the log file, if one is open
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Write to both console and log
    pub fn emit(&mut self, text: &str) {
        if self.to_console {
            println!("{}", text);
        }
        self.emit_file_only(text);
    }

    /// Write to the log file only
    pub fn emit_file_only(&mut self, text: &str) {
        if let Some(ref mut log) = self.log {
            if writeln!(log, "{}", text).is_err() {
                eprintln!("Warning: Failed to write to log file; disabling file logging");
                self.log = None;
            }
        }
    }
}

impl Drop for ReportSink {
    fn drop(&mut self) {
        if let Some(ref mut log) = self.log {
            let _ = log.flush();
        }
    }
}
