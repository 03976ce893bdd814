//! Clean command - remove the hook store

use clap::Args;
use commitguard_core::Settings;

use super::open_store;

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {}

impl CleanArgs {
    /// Execute the clean command
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<i32> {
        let root = settings.store_root()?;
        if root.exists() {
            open_store(settings).await?.clear().await?;
        }

        println!("Cleaned {}.", root.display());
        Ok(0)
    }
}
