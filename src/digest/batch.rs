// Concurrent batch hashing module
// Hashes a file list (or an index subset) on a bounded worker pool with
// per-file failure isolation and cooperative cancellation

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use rayon::prelude::*;

use super::error::{CancelledBatch, DigestError};
use super::hash::ContentHash;
use super::record::FileRecord;

/// Interval between best-effort progress emissions
const PROGRESS_INTERVAL: Duration = Duration::from_millis(1000);

/// Cooperative cancellation flag, polled between files.
///
/// In-flight files always finish; the batch never discards hashes that were
/// already computed when the flag was raised.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
}

/// Type alias for progress callback function
pub type ProgressCallback = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Result of a batch run
///
/// `hashes` always has one slot per input file; a `None` slot belongs to a
/// file that was either outside the requested subset or failed to hash —
/// consult `error_indices` to tell the two apart.
#[derive(Debug)]
pub struct BatchReport {
    pub all_succeeded: bool,
    pub hashes: Vec<Option<ContentHash>>,
    pub success_indices: Vec<usize>,
    pub error_indices: Vec<usize>,
}

enum SlotOutcome {
    Hashed(ContentHash),
    Failed,
    Skipped,
}

/// Engine for hashing batches of files concurrently
pub struct BatchHasher {
    threads: usize,
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl BatchHasher {
    /// Create a hasher sized to the machine's logical CPU count
    pub fn new() -> Self {
        Self {
            threads: num_cpus::get(),
            progress_callback: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set a progress callback, invoked at a bounded rate from a detached
    /// observer thread. It never gates hashing.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Hash every file in `files`, or only the indices in `subset`.
    ///
    /// A per-file I/O failure marks that slot absent and records the index
    /// without aborting the batch. Cancellation is checked between files and
    /// surfaces as `DigestError::Cancelled` carrying everything computed so
    /// far.
    pub fn hash_batch(
        &self,
        base_path: &Path,
        files: &[FileRecord],
        subset: Option<&[usize]>,
        cancel: &CancelToken,
    ) -> Result<BatchReport, DigestError> {
        if base_path.as_os_str().is_empty() {
            return Err(DigestError::Configuration {
                message: "base path cannot be empty".to_string(),
            });
        }

        if let Some(indices) = subset {
            if let Some(&bad) = indices.iter().find(|&&i| i >= files.len()) {
                return Err(DigestError::Configuration {
                    message: format!(
                        "subset index {} out of range for {} files",
                        bad,
                        files.len()
                    ),
                });
            }
        }

        let indices: Vec<usize> = match subset {
            Some(s) => s.to_vec(),
            None => (0..files.len()).collect(),
        };
        let total = indices.len();

        if total == 0 {
            return Ok(BatchReport {
                all_succeeded: true,
                hashes: vec![None; files.len()],
                success_indices: Vec::new(),
                error_indices: Vec::new(),
            });
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let ticker = self.spawn_ticker(Arc::clone(&processed), total);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| DigestError::Configuration {
                message: format!("failed to build worker pool: {}", e),
            })?;

        let outcomes: Vec<(usize, SlotOutcome)> = pool.install(|| {
            indices
                .par_iter()
                .map(|&i| {
                    // Polled between files only; a file that already started
                    // hashing runs to completion.
                    if cancel.is_cancelled() {
                        return (i, SlotOutcome::Skipped);
                    }

                    let full_path = base_path.join(files[i].path());
                    let outcome = match ContentHash::of_file(&full_path) {
                        Ok(hash) => SlotOutcome::Hashed(hash),
                        Err(_) => SlotOutcome::Failed,
                    };
                    processed.fetch_add(1, Ordering::Relaxed);
                    (i, outcome)
                })
                .collect()
        });

        drop(ticker);

        let mut hashes: Vec<Option<ContentHash>> = vec![None; files.len()];
        let mut success_indices = Vec::new();
        let mut error_indices = Vec::new();
        let mut skipped = 0usize;

        for (i, outcome) in outcomes {
            match outcome {
                SlotOutcome::Hashed(hash) => {
                    hashes[i] = Some(hash);
                    success_indices.push(i);
                }
                SlotOutcome::Failed => error_indices.push(i),
                SlotOutcome::Skipped => skipped += 1,
            }
        }

        // Completion order is nondeterministic under the pool
        success_indices.sort_unstable();
        error_indices.sort_unstable();

        if success_indices.len() + error_indices.len() + skipped != total {
            return Err(DigestError::consistency(
                "hashed, failed and skipped counts do not add up to the requested set",
            ));
        }

        if skipped > 0 {
            return Err(DigestError::Cancelled(Box::new(CancelledBatch {
                processed: success_indices.len() + error_indices.len(),
                total,
                hashes,
                success_indices,
                error_indices,
            })));
        }

        if let Some(ref callback) = self.progress_callback {
            callback(BatchProgress { processed: total, total });
        }

        Ok(BatchReport {
            all_succeeded: error_indices.is_empty(),
            hashes,
            success_indices,
            error_indices,
        })
    }

    /// Detached observer emitting progress at a bounded rate. Dropping the
    /// returned guard stops it; hashing never waits on it.
    fn spawn_ticker(&self, processed: Arc<AtomicUsize>, total: usize) -> Option<TickerGuard> {
        let callback = self.progress_callback.as_ref().map(Arc::clone)?;
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(PROGRESS_INTERVAL) {
                Err(RecvTimeoutError::Timeout) => {
                    callback(BatchProgress {
                        processed: processed.load(Ordering::Relaxed),
                        total,
                    });
                }
                _ => break,
            }
        });

        Some(TickerGuard {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl Default for BatchHasher {
    fn default() -> Self {
        Self::new()
    }
}

struct TickerGuard {
    stop: Option<crossbeam_channel::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
