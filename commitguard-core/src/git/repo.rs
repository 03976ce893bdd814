//! Git repository detection and file set queries

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use git2::Repository;
use indexmap::IndexSet;

use crate::{Error, Result};

/// The working tree the hooks run against
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the repository root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// This will search upward from the given path to find the repository root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Git(format!(
                    "Not a git repository: {}. Run 'git init' first or navigate to a git repository.",
                    path.display()
                ))
            } else {
                Error::Git(e.to_string())
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Git("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `.git` directory
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Check if the given path is inside a git repository
    pub fn is_git_repo(path: impl AsRef<Path>) -> bool {
        Repository::discover(path.as_ref()).is_ok()
    }

    /// Run git in the repository root, failing only if it cannot be started
    pub(crate) fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::Git(format!("Failed to run git {}: {}", args.join(" "), e)))
    }

    /// Run git in the repository root and require success
    fn git_checked(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn git_paths(&self, args: &[&str]) -> Result<Vec<String>> {
        Ok(split_nul(&self.git_checked(args)?))
    }

    /// Paths added, copied, modified or renamed in the index
    pub fn staged_files(&self) -> Result<Vec<String>> {
        self.git_paths(&[
            "diff",
            "--staged",
            "--name-only",
            "--no-ext-diff",
            "--diff-filter=ACMRTUXB",
            "-z",
        ])
    }

    /// Every path tracked in the index
    pub fn all_files(&self) -> Result<Vec<String>> {
        self.git_paths(&["ls-files", "-z"])
    }

    /// Paths that differ between two revisions
    pub fn changed_files(&self, origin: &str, source: &str) -> Result<Vec<String>> {
        let range = format!("{origin}..{source}");
        self.git_paths(&["diff", "--name-only", "--no-ext-diff", "-z", &range])
    }

    /// Paths with unresolved conflict entries in the index
    pub fn unmerged_paths(&self) -> Result<BTreeSet<String>> {
        let output = self.git_checked(&["ls-files", "--unmerged", "-z"])?;
        Ok(split_nul(&output)
            .into_iter()
            .filter_map(|entry| entry.split_once('\t').map(|(_, path)| path.to_string()))
            .collect())
    }

    /// Whether a merge is in progress
    pub fn is_in_merge_conflict(&self) -> bool {
        let git_dir = self.git_dir();
        git_dir.join("MERGE_HEAD").exists() && git_dir.join("MERGE_MSG").exists()
    }

    /// Paths touched by the merge in progress
    ///
    /// Combines the conflict list git writes into the merge message with the
    /// paths that differ between the merged tree and either parent.
    pub fn conflicted_files(&self) -> Result<Vec<String>> {
        let merge_msg = std::fs::read_to_string(self.git_dir().join("MERGE_MSG"))?;
        let mut files: IndexSet<String> = parse_merge_msg_conflicts(&merge_msg).into_iter().collect();

        let tree = String::from_utf8_lossy(&self.git_checked(&["write-tree"])?)
            .trim()
            .to_string();
        files.extend(self.git_paths(&[
            "diff",
            "--name-only",
            "--no-ext-diff",
            "-z",
            "-m",
            &tree,
            "HEAD",
            "MERGE_HEAD",
        ])?);

        Ok(files.into_iter().collect())
    }
}

fn split_nul(output: &[u8]) -> Vec<String> {
    output
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Extract the `Conflicts:` section of a merge message
fn parse_merge_msg_conflicts(msg: &str) -> Vec<String> {
    msg.lines()
        .skip_while(|line| !line.trim_start_matches('#').trim().starts_with("Conflicts:"))
        .skip(1)
        .take_while(|line| line.starts_with('\t') || line.starts_with("#\t"))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}
