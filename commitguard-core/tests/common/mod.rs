#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use commitguard_core::{GitRepo, RunOptions, Runner};
use commitguard_store::{GitFetcher, Store, StoreOptions};

/// Scripts shipped by the test hook repository
pub const HOOK_SCRIPTS: &[(&str, &str)] = &[
    ("bin/echo.sh", "#!/bin/sh\necho \"$@\"\necho 'Hello World'\n"),
    ("bin/fail.sh", "#!/bin/sh\necho 'Fail'\nfor f in \"$@\"; do echo \"$f\"; done\nexit 1\n"),
    ("bin/cat.sh", "#!/bin/sh\ncat \"$@\"\n"),
    ("bin/rewrite.sh", "#!/bin/sh\nfor f in \"$@\"; do echo 'rewritten' > \"$f\"; done\n"),
    ("bin/sleep.sh", "#!/bin/sh\nexec sleep 30\n"),
];

pub const HOOK_MANIFEST: &str = r#"
[[hooks]]
id = "echo_hook"
name = "Echo hook"
entry = "bin/echo.sh"
language = "script"

[[hooks]]
id = "failing_hook"
name = "Failing hook"
entry = "bin/fail.sh"
language = "script"

[[hooks]]
id = "cat_hook"
name = "Cat hook"
entry = "bin/cat.sh"
language = "script"
verbose = true

[[hooks]]
id = "rewrite_hook"
name = "Rewrite hook"
entry = "bin/rewrite.sh"
language = "script"

[[hooks]]
id = "sleep_hook"
name = "Sleep hook"
entry = "bin/sleep.sh"
language = "script"

[[hooks]]
id = "python_only"
name = "Python only"
entry = "bin/echo.sh"
language = "script"
files = '\.py$'
"#;

pub fn git_output(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git")
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = git_output(dir, args);
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn init_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A project repository, a hook repository and a store, all in one temp dir.
/// The fixture must be kept alive for the duration of the test.
pub struct Fixture {
    _temp: tempfile::TempDir,
    pub project: PathBuf,
    pub store_root: PathBuf,
    pub hook_url: String,
    pub hook_rev: String,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        let store_root = temp.path().join("store");
        let hooks = temp.path().join("hooks");

        init_repo(&hooks);
        for (rel, body) in HOOK_SCRIPTS {
            let path = hooks.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        std::fs::write(hooks.join("hooks.toml"), HOOK_MANIFEST).unwrap();
        git(&hooks, &["add", "."]);
        git(&hooks, &["commit", "-q", "-m", "hooks"]);
        let hook_rev = git(&hooks, &["rev-parse", "HEAD"]).trim().to_string();

        init_repo(&project);
        git(&project, &["commit", "-q", "--allow-empty", "-m", "initial"]);

        Self {
            hook_url: hooks.to_str().unwrap().to_string(),
            hook_rev,
            project,
            store_root,
            _temp: temp,
        }
    }

    /// Write a config selecting `ids` from the hook repository
    pub fn use_hooks(&self, ids: &[&str]) {
        let mut config = format!(
            "[[repos]]\nrepo = \"{}\"\nrev = \"{}\"\n",
            self.hook_url, self.hook_rev
        );
        for id in ids {
            config.push_str(&format!("\n[[repos.hooks]]\nid = \"{id}\"\n"));
        }
        self.write_config(&config);
    }

    pub fn write_config(&self, contents: &str) {
        self.write(commitguard_core::CONFIG_FILE, contents);
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.project.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.project.join(rel)).unwrap()
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(&self.project, args)
    }

    pub fn stage(&self, rel: &str, contents: &str) {
        self.write(rel, contents);
        self.git(&["add", rel]);
    }

    pub async fn runner(&self) -> Runner {
        let store = Store::open(
            &self.store_root,
            Arc::new(GitFetcher::new()),
            StoreOptions::default(),
        )
        .await
        .unwrap();
        Runner::new(GitRepo::open(&self.project).unwrap(), store)
    }

    /// Run to completion, returning the exit code and the report
    pub async fn run(&self, options: RunOptions) -> (i32, String) {
        let runner = self.runner().await;
        let mut out = Vec::new();
        let code = runner
            .run_and_report(&options, &mut out, std::future::pending::<()>())
            .await;
        (code, String::from_utf8(out).unwrap())
    }
}
