//! commitguard core - pre-commit hook orchestration
//!
//! This crate decides which files a commit touches, keeps unstaged edits out
//! of the hooks' view, resolves configured hooks through the clone store and
//! runs them with their language executors.

pub mod config;
pub mod error;
pub mod executor;
pub mod git;
pub mod hook;
pub mod resolver;
pub mod run;

pub use config::Settings;
pub use error::{Error, Result};
pub use executor::{ExecOutput, ExecutorRegistry, LanguageExecutor};
pub use git::{GitRepo, StashState};
pub use hook::{Hook, HookConfig, Manifest, ProjectConfig, RepositoryConfig, CONFIG_FILE};
pub use resolver::{match_files, FileSet, HookResolver, ResolvedHook};
pub use run::{
    parse_skip, FileScope, HookResult, HookStatus, RunOptions, RunSummary, Runner, SkipReason,
};
