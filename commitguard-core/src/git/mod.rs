//! Git operations for commitguard
//!
//! This module provides repository detection, the file set queries that feed
//! a run, and the stash that keeps unstaged changes out of the hooks' view.

mod repo;
mod stash;

#[cfg(test)]
pub(crate) mod testing;

pub use repo::GitRepo;
pub use stash::StashState;
