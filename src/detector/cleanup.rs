//! Lifecycle management for transient transcode outputs.
//!
//! Every temporary output path is registered before its conversion is
//! dispatched, so the registry covers partially-written files too. Cleanup
//! is idempotent and best-effort: missing files are fine, removal errors
//! are logged and never escalate. `Drop` is the backstop for abnormal exits.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::detector::classify::CANONICAL_EXTENSION;

/// Process-wide sequence for collision-free temp names.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Simple random suffix generator (no external dependency).
mod rand {
    use std::cell::Cell;
    use std::time::{SystemTime, UNIX_EPOCH};

    thread_local! {
        static SEED: Cell<u64> = Cell::new(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        );
    }

    pub fn random() -> u32 {
        SEED.with(|seed| {
            // Simple xorshift
            let mut x = seed.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            seed.set(x);
            (x & 0xFFFFFFFF) as u32
        })
    }
}

/// Generate a collision-free temporary output path in `scratch_dir`.
///
/// Timestamp plus a process-wide sequence number guarantees uniqueness for
/// the lifetime of a run; the random suffix keeps concurrent runs apart.
pub fn temp_output_path(scratch_dir: &Path) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let suffix = rand::random() % 10000;

    scratch_dir.join(format!(
        "clipfind_{}_{}_{:04}.{}",
        timestamp, seq, suffix, CANONICAL_EXTENSION
    ))
}

/// Registry of transient files owned by one run.
pub struct TempRegistry {
    /// Registered temp file paths.
    files: Mutex<Vec<PathBuf>>,
    /// Whether cleanup actually removes files.
    enabled: bool,
}

impl TempRegistry {
    /// Create a registry. With `enabled` false, `cleanup` becomes a no-op.
    pub fn new(enabled: bool) -> Self {
        Self {
            files: Mutex::new(Vec::new()),
            enabled,
        }
    }

    /// Register a temp file for removal at run end.
    pub fn register(&self, path: impl Into<PathBuf>) {
        self.files.lock().push(path.into());
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Remove every registered file. Idempotent and best-effort.
    ///
    /// Returns the number of files removed by this call.
    pub fn cleanup(&self) -> usize {
        if !self.enabled {
            tracing::debug!("Skipping clean up");
            return 0;
        }

        let files = self.files.lock();
        let mut removed = 0;

        for path in files.iter() {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!("Removed {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Could not remove {}: {}", path.display(), e);
                }
            }
        }

        removed
    }
}

impl Drop for TempRegistry {
    fn drop(&mut self) {
        self.cleanup();
    }
}
