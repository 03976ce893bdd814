//! Advisory file locks with a bounded wait
//!
//! File locks are fcntl-based, so they do not exclude callers within one
//! process and closing any descriptor of a locked file drops the lock. Each
//! lock path is therefore paired with a process-wide mutex that is taken
//! before the file is opened.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use file_guard::{FileGuard, Lock};
use tokio::sync::OwnedMutexGuard;

use crate::{Error, Result};

/// Delay between two attempts to take a contended lock
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type LocalLocks = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

/// Process-wide mutexes, one per canonical lock path
static LOCAL_LOCKS: OnceLock<LocalLocks> = OnceLock::new();

/// An exclusive lock on a file, released on drop
pub struct LockGuard {
    // Unlock and close the file before letting other tasks in
    _guard: FileGuard<Arc<File>>,
    _local: OwnedMutexGuard<()>,
    path: PathBuf,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LockGuard {
    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn local_lock(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = LOCAL_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

/// Canonical form of `path`, so two spellings of one file share a mutex
fn canonical_lock_path(path: &Path) -> Result<PathBuf> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(path.to_path_buf());
    };
    std::fs::create_dir_all(parent)?;
    let parent = parent.canonicalize()?;
    Ok(match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    })
}

/// Take an exclusive lock on `path`, creating the file if needed
///
/// Waits for other tasks of this process and for other processes until
/// `timeout` elapses, then fails with [`Error::LockTimeout`].
pub async fn acquire(path: &Path, timeout: Duration) -> Result<LockGuard> {
    let canonical = canonical_lock_path(path)?;
    let deadline = Instant::now() + timeout;
    let timed_out = || Error::LockTimeout {
        path: path.to_path_buf(),
        timeout,
    };

    let local = tokio::time::timeout(timeout, local_lock(&canonical).lock_owned())
        .await
        .map_err(|_| {
            tracing::debug!(path = %path.display(), "Lock held by another task");
            timed_out()
        })?;

    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&canonical)?,
    );

    loop {
        match file_guard::try_lock(Arc::clone(&file), Lock::Exclusive, 0, 1) {
            Ok(guard) => {
                tracing::trace!(path = %path.display(), "Acquired lock");
                return Ok(LockGuard {
                    _guard: guard,
                    _local: local,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if Instant::now() >= deadline => {
                tracing::debug!(path = %path.display(), error = %e, "Giving up on lock");
                return Err(timed_out());
            }
            Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}
