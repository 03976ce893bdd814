//! Setting unstaged changes aside while hooks run

use std::path::{Path, PathBuf};
use std::process::Command;

use super::repo::GitRepo;
use crate::{Error, Result};

/// Unstaged changes removed from the working tree
///
/// Dropping the state puts the changes back; call [`StashState::restore`] to
/// observe failures. The patch file is kept after restoring so the changes
/// can be recovered by hand if anything goes wrong.
#[derive(Debug)]
pub struct StashState {
    root: PathBuf,
    patch: Option<PathBuf>,
    restored: bool,
}

impl StashState {
    /// A stash that holds nothing
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patch: None,
            restored: false,
        }
    }

    /// Whether any changes were set aside
    pub fn is_empty(&self) -> bool {
        self.patch.is_none()
    }

    /// Path of the saved patch, if any
    pub fn patch_path(&self) -> Option<&Path> {
        self.patch.as_deref()
    }

    /// Put the stashed changes back into the working tree
    ///
    /// Changes made meanwhile to the same files are discarded in favour of
    /// the stashed version. Restoring twice is a no-op.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        let Some(patch) = self.patch.clone() else {
            self.restored = true;
            return Ok(());
        };

        if apply_patch(&self.root, &patch).is_err() {
            tracing::warn!(
                patch = %patch.display(),
                "Stashed changes conflicted with hook modifications, rolling back hook changes"
            );
            checkout_worktree(&self.root)?;
            apply_patch(&self.root, &patch).map_err(|e| {
                Error::Stash(format!(
                    "could not restore changes ({}); they are saved in {}",
                    e,
                    patch.display()
                ))
            })?;
        }

        self.restored = true;
        tracing::info!(patch = %patch.display(), "Restored unstaged changes");
        Ok(())
    }
}

impl Drop for StashState {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!(error = %e, "Failed to restore unstaged changes");
        }
    }
}

impl GitRepo {
    /// Binary diff of the working tree against the index, if not empty
    fn unstaged_diff(&self) -> Result<Option<Vec<u8>>> {
        let output = self.git(&[
            "diff",
            "--ignore-submodules",
            "--binary",
            "--exit-code",
            "--no-color",
            "--no-ext-diff",
        ])?;

        match output.status.code() {
            Some(0) => Ok(None),
            Some(1) if !output.stdout.is_empty() => Ok(Some(output.stdout)),
            Some(1) => Ok(None),
            _ => Err(Error::Git(format!(
                "git diff failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    /// Whether tracked files have changes that are not staged
    pub fn has_unstaged_changes(&self) -> Result<bool> {
        Ok(self.unstaged_diff()?.is_some())
    }

    /// Save unstaged changes to a patch in `patch_dir` and check out the index
    ///
    /// Untracked files are left alone. Returns an empty stash when there is
    /// nothing to set aside.
    pub fn stash_unstaged(&self, patch_dir: &Path) -> Result<StashState> {
        let diff = self.unstaged_diff().map_err(|e| Error::Stash(e.to_string()))?;
        let Some(diff) = diff else {
            return Ok(StashState::empty(self.root()));
        };

        std::fs::create_dir_all(patch_dir)
            .map_err(|e| Error::Stash(format!("{}: {}", patch_dir.display(), e)))?;
        let patch = patch_dir.join(format!(
            "patch{}-{}",
            chrono::Utc::now().timestamp_millis(),
            std::process::id()
        ));
        std::fs::write(&patch, &diff)
            .map_err(|e| Error::Stash(format!("{}: {}", patch.display(), e)))?;

        let state = StashState {
            root: self.root().to_path_buf(),
            patch: Some(patch),
            restored: false,
        };

        // From here on, dropping `state` puts the changes back.
        checkout_worktree(self.root())?;
        Ok(state)
    }
}

fn checkout_worktree(root: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["checkout", "--", "."])
        .current_dir(root)
        .output()
        .map_err(|e| Error::Stash(format!("Failed to run git checkout: {e}")))?;

    if !output.status.success() {
        return Err(Error::Stash(format!(
            "git checkout failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn apply_patch(root: &Path, patch: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("apply")
        .arg("--whitespace=nowarn")
        .arg(patch)
        .current_dir(root)
        .output()
        .map_err(|e| Error::Stash(format!("Failed to run git apply: {e}")))?;

    if !output.status.success() {
        return Err(Error::Stash(format!(
            "git apply failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::TestRepo;
    use tempfile::TempDir;

    fn repo_with_staged_file() -> TestRepo {
        let repo = TestRepo::new();
        repo.write("foo.py", "");
        repo.git(&["add", "foo.py"]);
        repo.commit("initial");
        repo.write("foo.py", "staged\n");
        repo.git(&["add", "foo.py"]);
        repo
    }

    #[test]
    fn test_nothing_to_stash() {
        let repo = repo_with_staged_file();
        let patches = TempDir::new().unwrap();

        let git = repo.open();
        assert!(!git.has_unstaged_changes().unwrap());

        let mut stash = git.stash_unstaged(patches.path()).unwrap();
        assert!(stash.is_empty());
        stash.restore().unwrap();
        assert_eq!(std::fs::read_dir(patches.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stash_and_restore() {
        let repo = repo_with_staged_file();
        repo.write("foo.py", "staged\nunstaged\n");
        repo.write("untracked.txt", "keep me\n");
        let patches = TempDir::new().unwrap();

        let git = repo.open();
        assert!(git.has_unstaged_changes().unwrap());

        let mut stash = git.stash_unstaged(patches.path()).unwrap();
        assert!(!stash.is_empty());
        assert!(stash.patch_path().unwrap().exists());
        assert_eq!(repo.read("foo.py"), "staged\n");
        assert_eq!(repo.read("untracked.txt"), "keep me\n");

        stash.restore().unwrap();
        assert_eq!(repo.read("foo.py"), "staged\nunstaged\n");
        assert!(stash.patch_path().unwrap().exists());

        // Second restore does not re-apply.
        stash.restore().unwrap();
        assert_eq!(repo.read("foo.py"), "staged\nunstaged\n");
    }

    #[test]
    fn test_drop_restores() {
        let repo = repo_with_staged_file();
        repo.write("foo.py", "staged\nunstaged\n");
        let patches = TempDir::new().unwrap();

        {
            let _stash = repo.open().stash_unstaged(patches.path()).unwrap();
            assert_eq!(repo.read("foo.py"), "staged\n");
        }
        assert_eq!(repo.read("foo.py"), "staged\nunstaged\n");
    }

    #[test]
    fn test_restore_discards_conflicting_modifications() {
        let repo = repo_with_staged_file();
        repo.write("foo.py", "staged\nunstaged\n");
        let patches = TempDir::new().unwrap();

        let mut stash = repo.open().stash_unstaged(patches.path()).unwrap();
        repo.write("foo.py", "rewritten by a hook\n");

        stash.restore().unwrap();
        assert_eq!(repo.read("foo.py"), "staged\nunstaged\n");
    }
}
