//! CLI command implementations

pub mod cache;
pub mod clean;
pub mod run;

pub use cache::CacheArgs;
pub use clean::CleanArgs;
pub use run::RunArgs;

use std::sync::Arc;

use commitguard_core::Settings;
use commitguard_store::{GitFetcher, Store, StoreOptions};

/// Open the hook store configured in `settings`
pub async fn open_store(settings: &Settings) -> commitguard_core::Result<Store> {
    let options = StoreOptions::default().with_lock_timeout(settings.store.lock_timeout);
    Ok(Store::open(settings.store_root()?, Arc::new(GitFetcher::new()), options).await?)
}
