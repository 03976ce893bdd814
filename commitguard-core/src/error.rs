//! Error types for commitguard

use thiserror::Error;

/// Result type alias for commitguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for commitguard operations
///
/// The display strings of the precondition variants are matched by scripts
/// and must stay stable.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A git command failed or the repository could not be opened
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No executor is registered for a hook's language tag
    #[error("Configuration error: hook `{hook}` uses unsupported language `{language}`")]
    UnknownLanguage { hook: String, language: String },

    /// The store could not provide a hook repository
    #[error("Cache error: {0}")]
    Store(#[from] commitguard_store::Error),

    /// Unstaged changes could not be set aside or put back
    #[error("Failed to stash unstaged changes: {0}")]
    Stash(String),

    /// A hook process could not be started or did not finish
    #[error("Execution error: {0}")]
    Execution(String),

    /// Only one of origin and source was given
    #[error("Specify both --origin and --source.")]
    OriginSourceMismatch,

    /// Explicit files and all-files were both requested
    #[error("Arguments --all-files and explicit files are mutually exclusive.")]
    ConflictingScope,

    /// The index has unresolved merge conflicts
    #[error("Unmerged files.  Resolve before committing.")]
    UnmergedFiles,

    /// The single-hook filter matched nothing
    #[error("No hook with id `{0}`")]
    NoSuchHook(String),

    /// The run was cancelled from outside
    #[error("Interrupted.")]
    Interrupted,
}
