//! Executables shipped inside the hook repository

use std::path::Path;

use async_trait::async_trait;

use super::{hook_command, run_command, split_entry, ExecOutput, LanguageExecutor};
use crate::hook::Hook;
use crate::Result;

/// Runs `entry` as a path relative to the hook repository
#[derive(Debug, Clone, Default)]
pub struct ScriptExecutor;

impl ScriptExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageExecutor for ScriptExecutor {
    fn language(&self) -> &'static str {
        "script"
    }

    async fn invoke(
        &self,
        hook: &Hook,
        prefix: &Path,
        files: &[String],
        workdir: &Path,
    ) -> Result<ExecOutput> {
        let (script, entry_args) = split_entry(hook)?;
        let program = prefix.join(&script);
        tracing::debug!(hook = %hook.id, program = %program.display(), files = files.len(), "Running script hook");

        let cmd = hook_command(&program, &entry_args, hook, files, workdir);
        run_command(cmd, &script).await
    }
}
