//! Fetching hook repositories into the store

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Environment variables that git itself sets while running a hook and that
/// must not leak into the clone of another repository
const KEPT_GIT_ENV: &[&str] = &[
    "GIT_EXEC_PATH",
    "GIT_SSH",
    "GIT_SSH_COMMAND",
    "GIT_SSL_CAINFO",
    "GIT_SSL_NO_VERIFY",
    "GIT_CONFIG_GLOBAL",
    "GIT_CONFIG_NOSYSTEM",
];

/// Materializes a repository at a revision into an empty directory
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Clone `url` into `dest` and check out `rev`
    async fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<()>;
}

/// Fetcher backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitFetcher;

impl GitFetcher {
    /// Create a new git fetcher
    pub fn new() -> Self {
        Self
    }

    fn git() -> Command {
        let mut cmd = Command::new("git");
        for (name, _) in std::env::vars_os() {
            let Some(name) = name.to_str() else { continue };
            if name.starts_with("GIT_") && !KEPT_GIT_ENV.contains(&name) {
                cmd.env_remove(name);
            }
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    async fn run(url: &str, cmd: &mut Command, what: &str) -> Result<Output> {
        let output = cmd.output().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: format!("Failed to run git {what}: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Fetch {
                url: url.to_string(),
                message: classify_failure(what, &stderr),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<()> {
        tracing::debug!(url, rev, dest = %dest.display(), "Cloning repository");

        Self::run(
            url,
            Self::git()
                .arg("clone")
                .arg("--no-checkout")
                .arg("--quiet")
                .arg(url)
                .arg(dest),
            "clone",
        )
        .await?;

        Self::run(
            url,
            Self::git()
                .arg("reset")
                .arg("--hard")
                .arg("--quiet")
                .arg(rev)
                .current_dir(dest),
            "reset",
        )
        .await?;

        Ok(())
    }
}

fn classify_failure(what: &str, stderr: &str) -> String {
    if stderr.contains("Authentication failed") || stderr.contains("Permission denied") {
        return "authentication failed. Check your credentials or repository access.".to_string();
    }

    if stderr.contains("Could not resolve host") || stderr.contains("unable to access") {
        return "network error. Check your internet connection.".to_string();
    }

    if stderr.contains("unknown revision") || stderr.contains("ambiguous argument") {
        return format!("revision not found: {}", stderr.trim());
    }

    if stderr.contains("not found") || stderr.contains("does not exist") {
        return "repository not found. Check the URL is correct.".to_string();
    }

    format!("git {what} failed: {}", stderr.trim())
}
