//! Error types for store operations

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Store error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// The on-disk index was written by a newer build
    #[error("Store schema version {found} is newer than the supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store root was empty or relative
    #[error("Store directory must be a non-empty absolute path, got {0:?}")]
    AmbiguousRoot(PathBuf),

    /// Neither the home override nor a user cache directory is available
    #[error("Could not determine a store directory. Set {0} explicitly.")]
    NoDefaultDirectory(&'static str),

    /// A lock could not be acquired in time
    #[error("Timed out after {timeout:?} waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },

    /// Cloning or checking out a repository failed
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;
