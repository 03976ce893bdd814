//! Commands already installed on the machine

use std::path::Path;

use async_trait::async_trait;

use super::{hook_command, run_command, split_entry, ExecOutput, LanguageExecutor};
use crate::hook::Hook;
use crate::Result;

/// Runs `entry` as a command looked up on `PATH`
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageExecutor for SystemExecutor {
    fn language(&self) -> &'static str {
        "system"
    }

    async fn invoke(
        &self,
        hook: &Hook,
        _prefix: &Path,
        files: &[String],
        workdir: &Path,
    ) -> Result<ExecOutput> {
        let (program, entry_args) = split_entry(hook)?;
        tracing::debug!(hook = %hook.id, program = %program, files = files.len(), "Running system hook");

        let cmd = hook_command(&program, &entry_args, hook, files, workdir);
        run_command(cmd, &program).await
    }
}
