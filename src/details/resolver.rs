//! Last-modification lookup for a single path.

use std::sync::Arc;

use crate::upstream::{CommitTimestamp, ContentStore};
use crate::Result;

/// Resolves the date of the most recent commit touching a path.
#[derive(Clone)]
pub struct CommitDateResolver {
    store: Arc<dyn ContentStore>,
}

impl CommitDateResolver {
    /// Create a resolver over `store`.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Date of the latest commit touching `path`.
    ///
    /// `Ok(None)` means the path has no recorded history; that is a valid
    /// answer, not a failure.
    pub async fn latest_modification(&self, path: &str) -> Result<Option<CommitTimestamp>> {
        let history = self.store.commit_history(path, 1).await?;
        Ok(history.into_iter().next().map(|commit| commit.timestamp))
    }
}
