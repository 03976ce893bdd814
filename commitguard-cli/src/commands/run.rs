//! Run command - execute the configured hooks

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use commitguard_core::{parse_skip, GitRepo, RunOptions, Runner, Settings};

use super::open_store;

/// When to colorize status words
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn enabled(self) -> bool {
        match self {
            ColorMode::Auto => std::io::stdout().is_terminal(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Files to check instead of the staged files
    ///
    /// A file named like a subcommand must follow `--`.
    pub files: Vec<String>,

    /// Check every tracked file
    #[arg(short, long, conflicts_with = "files")]
    pub all_files: bool,

    /// Run only the hook with this id
    #[arg(long, value_name = "ID")]
    pub hook: Option<String>,

    /// Leave unstaged changes in the working tree
    #[arg(long)]
    pub no_stash: bool,

    /// Revision the changes are compared against (requires --source)
    #[arg(short, long, value_name = "REV")]
    pub origin: Option<String>,

    /// Revision holding the changes (requires --origin)
    #[arg(short, long, value_name = "REV")]
    pub source: Option<String>,

    /// Show the output and duration of every hook
    #[arg(short, long)]
    pub verbose: bool,

    /// Colorize the report
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Project configuration file (defaults to .commitguard.toml at the repository root)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Comma-separated hook ids to skip
    #[arg(long, env = "SKIP", hide = true, default_value = "")]
    pub skip: String,
}

impl RunArgs {
    /// Execute the run command, returning the process exit code
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<i32> {
        let use_color = self.color.enabled();
        colored::control::set_override(use_color);

        let mut stdout = std::io::stdout();
        let runner = match self.runner(settings).await {
            Ok(runner) => runner,
            Err(e) => {
                println!("{e}");
                return Ok(1);
            }
        };

        let options = self.options(settings, runner.repo().root(), use_color)?;
        tracing::debug!(?options, "Starting run");

        let cancel = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        Ok(runner.run_and_report(&options, &mut stdout, cancel).await)
    }

    async fn runner(&self, settings: &Settings) -> commitguard_core::Result<Runner> {
        let repo = GitRepo::open(std::env::current_dir()?)?;
        let store = open_store(settings).await?;

        let mut runner = Runner::new(repo, store);
        if let Some(config) = &self.config {
            runner = runner.with_config_path(config);
        }
        Ok(runner)
    }

    fn options(&self, settings: &Settings, root: &Path, color: bool) -> anyhow::Result<RunOptions> {
        let cwd = std::env::current_dir()?;
        let files = self
            .files
            .iter()
            .map(|file| repo_relative(root, &cwd, file))
            .collect();

        Ok(RunOptions {
            files,
            all_files: self.all_files,
            hook: self.hook.clone(),
            no_stash: self.no_stash,
            origin: self.origin.clone(),
            source: self.source.clone(),
            verbose: self.verbose,
            color,
            skips: parse_skip(&self.skip),
            hook_timeout: settings.run.hook_timeout,
        })
    }
}

/// Express a path given relative to `cwd` relative to the repository root
fn repo_relative(root: &Path, cwd: &Path, file: &str) -> String {
    let (Ok(root), Ok(cwd)) = (root.canonicalize(), cwd.canonicalize()) else {
        return file.to_string();
    };
    match cwd.strip_prefix(&root) {
        Ok(prefix) if !prefix.as_os_str().is_empty() => {
            prefix.join(file).to_string_lossy().into_owned()
        }
        _ => file.to_string(),
    }
}
