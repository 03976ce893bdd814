//! What a run was asked to do

use std::collections::BTreeSet;
use std::time::Duration;

use crate::{Error, Result};

/// Parse the `SKIP` environment value: comma separated ids, trimmed, empties dropped
pub fn parse_skip(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where the candidate files of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScope {
    /// Paths named on the command line
    Explicit(Vec<String>),
    /// Every tracked file
    AllFiles,
    /// Files changed between two revisions
    Changed { origin: String, source: String },
    /// Files staged for commit
    Staged,
}

/// Options for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit files to check
    pub files: Vec<String>,
    /// Check every tracked file
    pub all_files: bool,
    /// Run only the hook with this id
    pub hook: Option<String>,
    /// Leave unstaged changes in place
    pub no_stash: bool,
    /// Revision the changes are compared against
    pub origin: Option<String>,
    /// Revision holding the changes
    pub source: Option<String>,
    /// Show every hook's output and duration
    pub verbose: bool,
    /// Colorize status words
    pub color: bool,
    /// Hook ids to skip
    pub skips: BTreeSet<String>,
    /// Kill hooks that run longer than this
    pub hook_timeout: Option<Duration>,
}

impl RunOptions {
    /// Reject option combinations that cannot be honored
    pub fn validate(&self) -> Result<()> {
        self.scope().map(|_| ())
    }

    /// The file scope these options select
    ///
    /// Explicit files win over all-files, which wins over an origin/source
    /// pair; the staged files are the default.
    pub fn scope(&self) -> Result<FileScope> {
        let origin = self.origin.as_deref().filter(|s| !s.is_empty());
        let source = self.source.as_deref().filter(|s| !s.is_empty());
        if origin.is_some() != source.is_some() {
            return Err(Error::OriginSourceMismatch);
        }
        if self.all_files && !self.files.is_empty() {
            return Err(Error::ConflictingScope);
        }

        if !self.files.is_empty() {
            return Ok(FileScope::Explicit(self.files.clone()));
        }
        if self.all_files {
            return Ok(FileScope::AllFiles);
        }
        if let (Some(origin), Some(source)) = (origin, source) {
            return Ok(FileScope::Changed {
                origin: origin.to_string(),
                source: source.to_string(),
            });
        }
        Ok(FileScope::Staged)
    }

    /// Whether unstaged changes are set aside during the run
    pub fn should_stash(&self) -> bool {
        !self.all_files && !self.no_stash
    }
}
