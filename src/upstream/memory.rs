//! In-memory content store.
//!
//! Holds a fixed tree with per-path commit dates and optional injected
//! failures. Used to exercise the aggregation engine and the HTTP surface
//! without a network, and records how many calls were in flight at once.
//! Compiled for unit tests and behind the `test-util` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::async_trait;

use super::types::{CommitInfo, CommitTimestamp, Entry, EntryKind};
use super::ContentStore;
use crate::error::{RepoDriveError, Result};

/// Store operation a failure can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get_entry`.
    Entry,
    /// `list_children`.
    Listing,
    /// `commit_history`.
    History,
}

/// Failure returned for an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Behave like an upstream 500.
    Unavailable,
    /// Behave like an exhausted upstream rate limit.
    RateLimited(Option<u64>),
}

impl Fault {
    fn to_error(self) -> RepoDriveError {
        match self {
            Fault::Unavailable => RepoDriveError::UpstreamUnavailable {
                status: Some(500),
                reason: "Internal Server Error".to_string(),
            },
            Fault::RateLimited(retry_after_secs) => {
                RepoDriveError::UpstreamRateLimited { retry_after_secs }
            }
        }
    }
}

/// In-memory [`ContentStore`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: BTreeMap<String, Entry>,
    history: HashMap<String, CommitTimestamp>,
    faults: HashMap<(Operation, String), Fault>,
    latency: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store containing only the repository root.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::new(), Entry::directory(""));
        Self {
            entries,
            history: HashMap::new(),
            faults: HashMap::new(),
            latency: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn with_file(
        mut self,
        path: &str,
        size: u64,
        last_commit: Option<CommitTimestamp>,
    ) -> Self {
        self.add_parents(path);
        self.entries.insert(
            path.to_string(),
            Entry::file(path, size).with_content_id(format!("blob-{}", path)),
        );
        if let Some(timestamp) = last_commit {
            self.history.insert(path.to_string(), timestamp);
        }
        self
    }

    /// Add a directory, creating missing parent directories.
    pub fn with_dir(mut self, path: &str) -> Self {
        self.add_parents(path);
        self.entries.insert(path.to_string(), Entry::directory(path));
        self
    }

    /// Make `operation` on `path` fail with `fault`.
    pub fn with_fault(mut self, operation: Operation, path: &str, fault: Fault) -> Self {
        self.faults.insert((operation, path.to_string()), fault);
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls currently in progress.
    pub fn active_calls(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in progress at the same time.
    pub fn peak_calls(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Total number of calls served.
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn add_parents(&mut self, path: &str) {
        let mut parent = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(segment);
            self.entries
                .entry(parent.clone())
                .or_insert_with(|| Entry::directory(parent.clone()));
        }
    }

    /// Account for one call and simulate latency and faults.
    async fn begin(&self, operation: Operation, path: &str) -> Result<CallGuard<'_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = CallGuard {
            active: &self.active,
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(fault) = self.faults.get(&(operation, path.to_string())) {
            return Err(fault.to_error());
        }
        Ok(guard)
    }
}

/// Decrements the active call counter when dropped, including on cancellation.
struct CallGuard<'a> {
    active: &'a AtomicUsize,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_entry(&self, path: &str) -> Result<Entry> {
        let _guard = self.begin(Operation::Entry, path).await?;
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| RepoDriveError::NotFound(path.to_string()))
    }

    async fn list_children(&self, path: &str) -> Result<Vec<Entry>> {
        let _guard = self.begin(Operation::Listing, path).await?;
        match self.entries.get(path) {
            Some(entry) if entry.kind == EntryKind::Directory => {}
            Some(_) => {
                return Err(RepoDriveError::UnexpectedResponse(format!(
                    "'{}' is not a directory",
                    path
                )))
            }
            None => return Err(RepoDriveError::NotFound(path.to_string())),
        }

        Ok(self
            .entries
            .iter()
            .filter(|(key, _)| !key.is_empty() && parent_of(key) == path)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn commit_history(&self, path: &str, limit: usize) -> Result<Vec<CommitInfo>> {
        let _guard = self.begin(Operation::History, path).await?;
        if !self.entries.contains_key(path) {
            return Ok(Vec::new());
        }
        Ok(self
            .history
            .get(path)
            .map(|timestamp| CommitInfo {
                sha: format!("commit-{}", path),
                timestamp: *timestamp,
            })
            .into_iter()
            .take(limit)
            .collect())
    }
}
