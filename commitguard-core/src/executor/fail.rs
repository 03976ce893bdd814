//! Hooks that reject every file they match

use std::path::Path;

use async_trait::async_trait;

use super::{ExecOutput, LanguageExecutor};
use crate::hook::Hook;
use crate::Result;

/// Fails with `entry` as the message, followed by the offending files
///
/// Used to forbid files by name, e.g. `files = '\.orig$'`.
#[derive(Debug, Clone, Default)]
pub struct FailExecutor;

impl FailExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageExecutor for FailExecutor {
    fn language(&self) -> &'static str {
        "fail"
    }

    async fn invoke(
        &self,
        hook: &Hook,
        _prefix: &Path,
        files: &[String],
        _workdir: &Path,
    ) -> Result<ExecOutput> {
        let mut stdout = hook.entry.trim_end().to_string();
        stdout.push('\n');
        for file in files {
            stdout.push_str(file);
            stdout.push('\n');
        }

        Ok(ExecOutput {
            code: 1,
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }
}
