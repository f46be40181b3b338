//! Upstream content store access.
//!
//! The remote repository is the only source of truth. Everything in this
//! module is read-only and stateless across requests: entries are fetched on
//! demand and never cached.

pub mod github;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod path;
pub mod types;

use axum::async_trait;

use crate::Result;

pub use github::GitHubClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use path::normalize_path;
pub use types::{base_name, CommitInfo, CommitTimestamp, Entry, EntryKind};

/// Read access to a version-controlled content store.
///
/// Implementations perform no retries; retry policy belongs to the caller.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch metadata of the entry at `path`.
    ///
    /// Fails with `NotFound` when the path does not exist.
    async fn get_entry(&self, path: &str) -> Result<Entry>;

    /// List the immediate children of the directory at `path`, in upstream
    /// order.
    async fn list_children(&self, path: &str) -> Result<Vec<Entry>>;

    /// Fetch the entry at `path` and, when it is a directory, its immediate
    /// children.
    ///
    /// The default reads the entry and then the listing. Stores whose entry
    /// lookup already returns the listing answer from that single read.
    async fn get_entry_with_children(&self, path: &str) -> Result<(Entry, Option<Vec<Entry>>)> {
        let entry = self.get_entry(path).await?;
        match entry.kind {
            EntryKind::File => Ok((entry, None)),
            EntryKind::Directory => {
                let children = self.list_children(path).await?;
                Ok((entry, Some(children)))
            }
        }
    }

    /// Fetch up to `limit` most recent commits touching `path`, newest first.
    ///
    /// A path without recorded history yields an empty list, not an error.
    async fn commit_history(&self, path: &str, limit: usize) -> Result<Vec<CommitInfo>>;
}
