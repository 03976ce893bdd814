//! Content-addressed cache of hook repositories
//!
//! The store maps a (repository URL, pinned revision, dependencies) key to a
//! checked-out clone on disk. Clones are staged in a temporary directory and
//! renamed into place before being registered in the SQLite index, so a
//! reader either sees a complete clone or none at all.
//!
//! Layout of the store root:
//!
//! ```text
//! <root>/README
//! <root>/db.db             index (schema versioned, see `migrations`)
//! <root>/.lock             store-wide lock for index writes
//! <root>/locks/<key>.lock  per-clone lock
//! <root>/repos/<key>/      clone checkouts
//! ```

pub mod error;
pub mod fetch;
pub mod key;
pub mod lock;
pub mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use error::{Error, Result};
pub use fetch::{Fetcher, GitFetcher};
pub use key::CloneKey;
pub use lock::LockGuard;
pub use migrations::SCHEMA_VERSION;

/// Environment variable overriding the store root
pub const HOME_ENV: &str = "COMMITGUARD_HOME";

const README: &str = "This directory is maintained by commitguard.\n\
It caches hook repositories and can be removed with `commitguard clean`.\n";

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Longest time to wait for another process holding a store lock
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(60),
        }
    }
}

impl StoreOptions {
    /// Set the lock timeout
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

/// A repository checked out at a pinned revision inside the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClone {
    /// Hex digest of the clone key
    pub key: String,
    /// Repository URL
    pub url: String,
    /// Pinned revision
    pub rev: String,
    /// Extra dependency specifiers that are part of the key
    pub deps: Vec<String>,
    /// Checkout directory
    pub path: PathBuf,
}

/// Handle to an opened store
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
    pool: SqlitePool,
    fetcher: Arc<dyn Fetcher>,
    options: StoreOptions,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Resolve the store root for the current user
    ///
    /// Uses `$COMMITGUARD_HOME` when set and non-empty, otherwise
    /// `~/.cache/commitguard`.
    pub fn default_directory() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        dirs::cache_dir()
            .map(|dir| dir.join("commitguard"))
            .ok_or(Error::NoDefaultDirectory(HOME_ENV))
    }

    /// Open (creating if needed) the store rooted at `root`
    ///
    /// The index is migrated to [`SCHEMA_VERSION`] under the store-wide lock.
    pub async fn open(
        root: impl Into<PathBuf>,
        fetcher: Arc<dyn Fetcher>,
        options: StoreOptions,
    ) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() || !root.is_absolute() {
            return Err(Error::AmbiguousRoot(root));
        }

        std::fs::create_dir_all(root.join("repos"))?;
        let readme = root.join("README");
        if !readme.exists() {
            std::fs::write(&readme, README)?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(root.join("db.db"))
            .create_if_missing(true)
            .busy_timeout(options.lock_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect)
            .await?;

        let store = Self {
            root,
            pool,
            fetcher,
            options,
        };

        store.require_version(SCHEMA_VERSION).await?;
        Ok(store)
    }

    /// Ensure the index is at `supported`, migrating older indexes
    ///
    /// Fails with [`Error::UnsupportedSchema`] if the index is newer.
    pub async fn require_version(&self, supported: i64) -> Result<i64> {
        let _lock = lock::acquire(&self.store_lock_path(), self.options.lock_timeout).await?;
        migrations::migrate(&self.pool, supported).await
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Return the clone for (url, rev, deps), creating it if needed
    ///
    /// Concurrent callers for the same key wait for each other; only one of
    /// them fetches and all of them get the same clone.
    pub async fn clone_repo(&self, url: &str, rev: &str, deps: &[String]) -> Result<CachedClone> {
        let key = CloneKey::new(url, rev, deps);

        if let Some(clone) = self.lookup(&key).await? {
            return Ok(clone);
        }

        let _lock = lock::acquire(&self.key_lock_path(&key), self.options.lock_timeout).await?;

        // Someone else may have finished while we were waiting
        if let Some(clone) = self.lookup(&key).await? {
            return Ok(clone);
        }

        let target = self.clone_dir(&key);
        if target.exists() {
            tracing::debug!(path = %target.display(), "Adopting unregistered clone");
        } else {
            tracing::info!(url, rev, "Initializing environment for {}", url);
            self.fetch_into(&key, &target).await?;
        }

        self.register(&key, &target).await?;

        Ok(CachedClone {
            key: key.digest(),
            url: key.url().to_string(),
            rev: key.rev().to_string(),
            deps: key.deps().to_vec(),
            path: target,
        })
    }

    /// List every registered clone
    pub async fn list(&self) -> Result<Vec<CachedClone>> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT key, repo, rev, deps, path FROM clones ORDER BY created_at, repo",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, url, rev, deps, path)| CachedClone {
                key,
                url,
                rev,
                deps: split_deps(&deps),
                path: PathBuf::from(path),
            })
            .collect())
    }

    /// Remove the whole store from disk
    pub async fn clear(self) -> Result<()> {
        {
            let _lock = lock::acquire(&self.store_lock_path(), self.options.lock_timeout).await?;
            self.pool.close().await;
            std::fs::remove_dir_all(&self.root)?;
        }
        tracing::info!(root = %self.root.display(), "Cleaned store");
        Ok(())
    }

    async fn lookup(&self, key: &CloneKey) -> Result<Option<CachedClone>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT path FROM clones WHERE key = ?1")
            .bind(key.digest())
            .fetch_optional(&self.pool)
            .await?;

        let Some((path,)) = row else {
            return Ok(None);
        };

        let path = PathBuf::from(path);
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "Cached clone vanished, cloning again");
            return Ok(None);
        }

        Ok(Some(CachedClone {
            key: key.digest(),
            url: key.url().to_string(),
            rev: key.rev().to_string(),
            deps: key.deps().to_vec(),
            path,
        }))
    }

    async fn fetch_into(&self, key: &CloneKey, target: &Path) -> Result<()> {
        let staging_root = self.root.join("repos");
        std::fs::create_dir_all(&staging_root)?;

        // Dropping the staging directory removes it if anything below fails
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&staging_root)?;

        self.fetcher.fetch(key.url(), key.rev(), staging.path()).await?;
        if let Err(e) = std::fs::rename(staging.path(), target) {
            // A checkout finished by someone else is as good as ours
            if !target.is_dir() {
                return Err(e.into());
            }
            tracing::debug!(path = %target.display(), error = %e, "Adopting existing clone");
        }

        Ok(())
    }

    async fn register(&self, key: &CloneKey, target: &Path) -> Result<()> {
        let _lock = lock::acquire(&self.store_lock_path(), self.options.lock_timeout).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT OR REPLACE INTO clones (key, repo, rev, deps, path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(key.digest())
        .bind(key.url())
        .bind(key.rev())
        .bind(key.deps_column())
        .bind(target.to_string_lossy().into_owned())
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    fn clone_dir(&self, key: &CloneKey) -> PathBuf {
        self.root.join("repos").join(key.digest())
    }

    fn key_lock_path(&self, key: &CloneKey) -> PathBuf {
        self.root
            .join("locks")
            .join(format!("{}.lock", key.digest()))
    }

    fn store_lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }
}

fn split_deps(column: &str) -> Vec<String> {
    column
        .split(',')
        .filter(|dep| !dep.is_empty())
        .map(str::to_string)
        .collect()
}
