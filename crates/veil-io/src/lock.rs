//! Per-path exclusion for destructive operations.
//!
//! A redaction is decode -> blur -> write against one file; a second
//! redaction or a restore interleaving with it would either lose an
//! edit or capture a half-finished state. [`PathLocks`] tracks which
//! files have an operation in flight and refuses a second one instead
//! of queueing it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::VeilError;

type Held = Arc<Mutex<HashSet<PathBuf>>>;

/// Shared table of paths with an operation in progress.
///
/// Cloning yields a handle onto the same table.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    held: Held,
}

impl PathLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` for the lifetime of the returned lease.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Busy`] if the path is already claimed.
    pub fn acquire(&self, path: &Path) -> Result<PathLease, VeilError> {
        let key = lock_key(path);
        if !lock_table(&self.held).insert(key.clone()) {
            tracing::warn!(path = %path.display(), "rejected concurrent operation");
            return Err(VeilError::Busy(path.to_path_buf()));
        }
        Ok(PathLease {
            held: Arc::clone(&self.held),
            key,
        })
    }

    /// Returns `true` if `path` is currently claimed.
    #[must_use]
    pub fn is_locked(&self, path: &Path) -> bool {
        lock_table(&self.held).contains(&lock_key(path))
    }
}

/// Exclusive claim on one path. Released on drop.
#[derive(Debug)]
#[must_use = "the path is released as soon as the lease is dropped"]
pub struct PathLease {
    held: Held,
    key: PathBuf,
}

impl Drop for PathLease {
    fn drop(&mut self) {
        lock_table(&self.held).remove(&self.key);
    }
}

/// The set itself is always consistent, so a poisoned mutex is still
/// safe to use.
fn lock_table(held: &Held) -> MutexGuard<'_, HashSet<PathBuf>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Canonical form of `path`, so different spellings of one file share
/// a lock. Falls back to canonicalizing the parent for files that do
/// not exist yet, then to the path as given.
fn lock_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}
