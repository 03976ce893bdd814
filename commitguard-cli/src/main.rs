//! commitguard CLI - run pre-commit hooks against the staged changes

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commitguard_core::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CacheArgs, CleanArgs, RunArgs};

/// Environment variable holding the log filter
const LOG_ENV: &str = "COMMITGUARD_LOG";

/// commitguard: pre-commit hook orchestration
#[derive(Parser, Debug)]
#[command(name = "commitguard")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    after_help = "Files named like a subcommand (run, clean, cache) must follow `--`, as in `commitguard -- run`."
)]
struct Cli {
    /// Hook store directory (overrides settings and COMMITGUARD_HOME)
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run hooks (the default)
    Run(RunArgs),

    /// Remove every cached hook repository
    Clean(CleanArgs),

    /// List cached hook repositories
    Cache(CacheArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let settings = Settings::load_with_overrides(cli.home.clone())?;
    tracing::debug!(
        store = ?settings.store.home,
        lock_timeout = ?settings.store.lock_timeout,
        hook_timeout = ?settings.run.hook_timeout,
        "Settings loaded"
    );

    let code = match cli.command {
        Some(Commands::Run(args)) => args.execute(&settings).await?,
        Some(Commands::Clean(args)) => args.execute(&settings).await?,
        Some(Commands::Cache(args)) => args.execute(&settings).await?,
        None => cli.run.execute(&settings).await?,
    };

    std::process::exit(code);
}
