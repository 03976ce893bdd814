//! Cache command - list cached hook repositories

use clap::Args;
use colored::Colorize;
use commitguard_core::Settings;

use super::open_store;

/// Arguments for the cache command
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Only print the clone directories
    #[arg(short, long)]
    pub quiet: bool,
}

impl CacheArgs {
    /// Execute the cache command
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<i32> {
        let store = open_store(settings).await?;
        let clones = store.list().await?;

        if self.quiet {
            for clone in &clones {
                println!("{}", clone.path.display());
            }
            return Ok(0);
        }

        println!("Store: {}", store.root().display());
        if clones.is_empty() {
            println!("No cached repositories");
            return Ok(0);
        }

        println!();
        for clone in &clones {
            println!("{} @ {}", clone.url.bold(), clone.rev);
            if !clone.deps.is_empty() {
                println!("  dependencies: {}", clone.deps.join(", "));
            }
            println!("  {}", clone.path.display().to_string().dimmed());
        }

        Ok(0)
    }
}
