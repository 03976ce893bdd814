//! Language executors run a hook's command over a list of files
//!
//! Executors are registered by language tag. Resolution fails for a hook whose
//! language has no executor, so nothing is stashed or run in that case.

mod fail;
mod script;
mod system;

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::hook::Hook;
use crate::{Error, Result};

pub use fail::FailExecutor;
pub use script::ScriptExecutor;
pub use system::SystemExecutor;

/// What a finished hook process produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs hooks of one language
#[async_trait]
pub trait LanguageExecutor: Send + Sync {
    /// Language tag this executor handles
    fn language(&self) -> &'static str;

    /// Run `hook` over `files`
    ///
    /// `prefix` is the directory the hook was installed into and `workdir`
    /// the project root the process runs in. Dropping the returned future
    /// kills the process.
    async fn invoke(
        &self,
        hook: &Hook,
        prefix: &Path,
        files: &[String],
        workdir: &Path,
    ) -> Result<ExecOutput>;
}

/// Language executors by tag
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn LanguageExecutor>>,
}

impl ExecutorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Create a registry with the built-in executors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ScriptExecutor::new()));
        registry.register(Arc::new(SystemExecutor::new()));
        registry.register(Arc::new(FailExecutor::new()));
        registry
    }

    /// Register an executor, replacing any with the same tag
    pub fn register(&mut self, executor: Arc<dyn LanguageExecutor>) {
        self.executors
            .insert(executor.language().to_string(), executor);
    }

    /// Get the executor for a language tag
    pub fn get(&self, language: &str) -> Option<Arc<dyn LanguageExecutor>> {
        self.executors.get(language).cloned()
    }

    /// List all registered language tags
    pub fn list_registered(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.executors.keys().map(|s| s.as_str()).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("languages", &self.list_registered())
            .finish()
    }
}

/// Split an entry into program and leading arguments
pub(crate) fn split_entry(hook: &Hook) -> Result<(String, Vec<String>)> {
    let mut words = shell_words::split(&hook.entry).map_err(|e| {
        Error::Config(format!("hook `{}` has an invalid entry: {}", hook.id, e))
    })?;
    if words.is_empty() {
        return Err(Error::Config(format!("hook `{}` has an empty entry", hook.id)));
    }
    let program = words.remove(0);
    Ok((program, words))
}

/// Build the command line: entry arguments, hook args, then file names
pub(crate) fn hook_command(
    program: impl AsRef<std::ffi::OsStr>,
    entry_args: &[String],
    hook: &Hook,
    files: &[String],
    workdir: &Path,
) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(entry_args).args(&hook.args);
    if hook.pass_filenames {
        cmd.args(files);
    }
    cmd.current_dir(workdir);
    cmd
}

/// Run a hook process to completion and capture its output
pub(crate) async fn run_command(mut cmd: Command, display: &str) -> Result<ExecOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Execution(format!("Executable `{display}` not found"))
        } else {
            Error::Execution(format!("Failed to run `{display}`: {e}"))
        }
    })?;

    Ok(ExecOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
pub(crate) fn test_hook(language: &str, entry: &str) -> Hook {
    Hook {
        id: "test-hook".to_string(),
        name: "Test hook".to_string(),
        entry: entry.to_string(),
        language: language.to_string(),
        files: String::new(),
        exclude: None,
        args: Vec::new(),
        pass_filenames: true,
        advisory: false,
        verbose: false,
        additional_dependencies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = ExecutorRegistry::with_defaults();
        assert_eq!(registry.list_registered(), vec!["fail", "script", "system"]);
        assert_eq!(registry.get("script").unwrap().language(), "script");
        assert!(registry.get("python").is_none());
    }

    #[test]
    fn test_registry_register() {
        let mut registry = ExecutorRegistry::new();
        assert!(registry.get("fail").is_none());

        registry.register(Arc::new(FailExecutor::new()));
        assert!(registry.get("fail").is_some());
    }

    #[test]
    fn test_split_entry() {
        let hook = test_hook("system", "echo 'hello world' --flag");
        let (program, args) = split_entry(&hook).unwrap();
        assert_eq!(program, "echo");
        assert_eq!(args, vec!["hello world", "--flag"]);

        let hook = test_hook("system", "   ");
        assert!(matches!(split_entry(&hook), Err(Error::Config(_))));

        let hook = test_hook("system", "echo 'unterminated");
        assert!(matches!(split_entry(&hook), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_run_command_missing_executable() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut cmd = Command::new("commitguard-definitely-not-installed");
        cmd.current_dir(temp.path());

        let err = run_command(cmd, "commitguard-definitely-not-installed")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Execution error: Executable `commitguard-definitely-not-installed` not found"
        );
    }
}
