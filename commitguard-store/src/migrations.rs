//! Versioned schema migrations for the store index
//!
//! Every step runs in its own transaction together with the update of the
//! recorded version, so an interrupted upgrade leaves the index at the last
//! completed version.

use sqlx::sqlite::{SqliteConnection, SqlitePool};

use crate::key::CloneKey;
use crate::{Error, Result};

/// Schema version written by this build
pub const SCHEMA_VERSION: i64 = 2;

const REPOS_V1: &str = include_str!("../migrations/0001_repos.sql");
const CLONES_V2: &str = include_str!("../migrations/0002_clones.sql");

/// Read the version recorded in the index
///
/// Databases created before versioning existed only carry the `repos`
/// table and are reported as version 1. An empty database is version 0.
pub async fn current_version(conn: &mut SqliteConnection) -> Result<i64> {
    if table_exists(conn, "schema_version").await? {
        let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;
        return Ok(row.map_or(0, |(version,)| version));
    }

    if table_exists(conn, "repos").await? {
        return Ok(1);
    }

    Ok(0)
}

/// Bring the index up to `supported`, one step at a time
///
/// Fails without touching anything if the index is newer than `supported`.
pub async fn migrate(pool: &SqlitePool, supported: i64) -> Result<i64> {
    if supported > SCHEMA_VERSION {
        return Err(Error::Migration(format!(
            "no migration path to version {supported} (latest known is {SCHEMA_VERSION})"
        )));
    }

    let found = {
        let mut conn = pool.acquire().await?;
        current_version(&mut conn).await?
    };

    if found > supported {
        return Err(Error::UnsupportedSchema { found, supported });
    }

    for version in (found + 1)..=supported {
        let mut tx = pool.begin().await?;
        apply_step(&mut tx, version).await?;
        record_version(&mut tx, version).await?;
        tx.commit().await?;
        tracing::info!(version, "Migrated store index");
    }

    Ok(found.max(supported))
}

async fn apply_step(conn: &mut SqliteConnection, version: i64) -> Result<()> {
    match version {
        1 => {
            sqlx::query(REPOS_V1).execute(&mut *conn).await?;
        }
        2 => {
            sqlx::query(CLONES_V2).execute(&mut *conn).await?;

            let legacy: Vec<(String, String, String)> =
                sqlx::query_as("SELECT repo, ref, path FROM repos")
                    .fetch_all(&mut *conn)
                    .await?;

            let now = chrono::Utc::now();
            for (repo, rev, path) in legacy {
                let key = CloneKey::new(repo.as_str(), rev.as_str(), &[]);
                sqlx::query(
                    "INSERT OR REPLACE INTO clones (key, repo, rev, deps, path, created_at)
                     VALUES (?1, ?2, ?3, '', ?4, ?5)",
                )
                .bind(key.digest())
                .bind(&repo)
                .bind(&rev)
                .bind(&path)
                .bind(now)
                .execute(&mut *conn)
                .await?;
            }

            sqlx::query("DROP TABLE repos").execute(&mut *conn).await?;
        }
        other => {
            return Err(Error::Migration(format!("unknown schema version {other}")));
        }
    }

    Ok(())
}

async fn record_version(conn: &mut SqliteConnection, version: i64) -> Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?1)")
        .bind(version)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.is_some())
}
