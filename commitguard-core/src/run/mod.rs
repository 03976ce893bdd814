//! The run engine
//!
//! A run determines the candidate files, refuses to start during an
//! unresolved merge, sets unstaged changes aside, resolves and executes the
//! configured hooks one after another, and puts the unstaged changes back no
//! matter how execution ended.

mod options;
mod report;

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use commitguard_store::Store;

use crate::executor::{ExecOutput, ExecutorRegistry};
use crate::git::{GitRepo, StashState};
use crate::hook::{ProjectConfig, CONFIG_FILE};
use crate::resolver::{match_files, FileSet, HookResolver, ResolvedHook};
use crate::{Error, Result};

pub use options::{parse_skip, FileScope, RunOptions};
pub use report::{HookResult, HookStatus, Reporter, RunSummary, SkipReason};

/// Runs the configured hooks against a repository
pub struct Runner {
    repo: GitRepo,
    store: Store,
    registry: ExecutorRegistry,
    config_path: PathBuf,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("repo", &self.repo)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner using the repository's `.commitguard.toml`
    pub fn new(repo: GitRepo, store: Store) -> Self {
        let config_path = repo.root().join(CONFIG_FILE);
        Self {
            repo,
            store,
            registry: ExecutorRegistry::with_defaults(),
            config_path,
        }
    }

    /// Use a different project configuration file
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Use a different set of language executors
    pub fn with_registry(mut self, registry: ExecutorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Run to completion
    pub async fn run<W: Write>(&self, options: &RunOptions, out: &mut W) -> Result<RunSummary> {
        self.run_until(options, out, std::future::pending::<()>()).await
    }

    /// Run until done or until `cancel` completes
    ///
    /// On cancellation running hook processes are killed, unstaged changes
    /// are restored and [`Error::Interrupted`] is returned.
    pub async fn run_until<W, C>(
        &self,
        options: &RunOptions,
        out: &mut W,
        cancel: C,
    ) -> Result<RunSummary>
    where
        W: Write,
        C: Future,
    {
        let scope = options.scope()?;
        if !self.repo.unmerged_paths()?.is_empty() {
            return Err(Error::UnmergedFiles);
        }
        let files = self.collect_files(scope, out)?;

        let mut stash = if options.should_stash() {
            self.stash(out)?
        } else {
            StashState::empty(self.repo.root())
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel => {
                tracing::warn!("Run interrupted");
                Err(Error::Interrupted)
            }
            result = self.execute(options, &files, out) => result,
        };

        let restored = stash.restore();
        if let Some(patch) = stash.patch_path() {
            if restored.is_ok() {
                writeln!(out, "[INFO] Restored changes from {}.", patch.display())?;
            }
        }

        match (outcome, restored) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(restore_err)) => {
                tracing::error!(error = %restore_err, "Failed to restore unstaged changes");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Run and turn the outcome into a process exit code
    ///
    /// Errors are written to `out`.
    pub async fn run_and_report<W, C>(&self, options: &RunOptions, out: &mut W, cancel: C) -> i32
    where
        W: Write,
        C: Future,
    {
        match self.run_until(options, out, cancel).await {
            Ok(summary) => summary.exit_code(),
            Err(e) => {
                tracing::debug!(error = ?e, "Run failed");
                if let Err(write_err) = writeln!(out, "{e}") {
                    tracing::error!(error = %write_err, "Failed to write report");
                }
                1
            }
        }
    }

    fn collect_files<W: Write>(&self, scope: FileScope, out: &mut W) -> Result<FileSet> {
        let files = match scope {
            FileScope::Explicit(files) => files,
            FileScope::AllFiles => self.repo.all_files()?,
            FileScope::Changed { origin, source } => self.repo.changed_files(&origin, &source)?,
            FileScope::Staged if self.repo.is_in_merge_conflict() => {
                writeln!(out, "Checking merge-conflict files only.")?;
                self.repo.conflicted_files()?
            }
            FileScope::Staged => self.repo.staged_files()?,
        };
        tracing::debug!(count = files.len(), "Collected candidate files");
        Ok(files.into_iter().collect())
    }

    fn stash<W: Write>(&self, out: &mut W) -> Result<StashState> {
        let stash = self
            .repo
            .stash_unstaged(&self.store.root().join("patches"))?;
        if let Some(patch) = stash.patch_path() {
            tracing::debug!(patch = %patch.display(), "Unstaged files detected");
            writeln!(out, "[WARNING] Unstaged files detected.")?;
            writeln!(out, "[INFO] Stashing unstaged files to {}.", patch.display())?;
        }
        Ok(stash)
    }

    async fn execute<W: Write>(
        &self,
        options: &RunOptions,
        files: &FileSet,
        out: &mut W,
    ) -> Result<RunSummary> {
        let config = ProjectConfig::load(&self.config_path)?;
        let resolver = HookResolver::new(&self.store, &self.registry, self.repo.root());
        let mut hooks = resolver.resolve(&config.repos).await?;

        if let Some(id) = &options.hook {
            hooks.retain(|h| &h.hook.id == id);
            if hooks.is_empty() {
                return Err(Error::NoSuchHook(id.clone()));
            }
        }

        let mut reporter = Reporter::new(out, options.verbose, options.color);
        let mut summary = RunSummary::default();
        for hook in &hooks {
            let result = self.run_hook(hook, files, options, &mut reporter).await?;
            summary.results.push(result);
        }
        Ok(summary)
    }

    async fn run_hook<W: Write>(
        &self,
        resolved: &ResolvedHook,
        files: &FileSet,
        options: &RunOptions,
        reporter: &mut Reporter<'_, W>,
    ) -> Result<HookResult> {
        let hook = &resolved.hook;

        if options.skips.contains(&hook.id) {
            let result = HookResult::skipped(hook, SkipReason::Requested);
            reporter.skipped(hook, &result)?;
            return Ok(result);
        }

        let matched = match_files(resolved, files);
        if matched.is_empty() {
            let result = HookResult::skipped(hook, SkipReason::NoFiles);
            reporter.skipped(hook, &result)?;
            return Ok(result);
        }

        reporter.start(hook)?;
        let started = Instant::now();
        let invocation =
            resolved
                .executor()
                .invoke(hook, &resolved.prefix, &matched, self.repo.root());

        let outcome = match options.hook_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Execution(format!(
                    "Hook timed out after {}s",
                    limit.as_secs_f64()
                ))),
            },
            None => invocation.await,
        };

        let output = outcome.unwrap_or_else(|e| {
            tracing::info!(hook = %hook.id, error = %e, "Hook could not run");
            ExecOutput {
                code: 1,
                stdout: Vec::new(),
                stderr: e.to_string().into_bytes(),
            }
        });

        let result = HookResult::finished(hook, matched, output, started.elapsed());
        reporter.finish(hook, &result)?;
        Ok(result)
    }
}
