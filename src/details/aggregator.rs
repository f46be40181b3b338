//! Details aggregation over a path.
//!
//! A file resolves to its own size and latest commit date. A directory is
//! walked with an explicit work stack: listings and commit-date lookups are
//! pushed as pending work, at most `max_in_flight` of them run at once, and
//! each directory is folded into its parent as soon as its last outstanding
//! child completes. Nothing recurses on the call stack, so tree depth is
//! limited only by memory.
//!
//! Failures on the requested path itself fail the request. Failures on
//! descendants are logged and the descendant is left out of the totals; the
//! returned [`Details`] counts how many were skipped.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::resolver::CommitDateResolver;
use super::summary::{merge, Details, Summary};
use crate::upstream::{normalize_path, CommitTimestamp, ContentStore, Entry, EntryKind};
use crate::{RepoDriveError, Result};

/// Arena index of the requested directory.
const ROOT: usize = 0;

/// Pending upstream work.
enum Lookup {
    /// List the children of directory node `node`.
    Listing { node: usize, path: String },
    /// Resolve the commit date of file `entry` inside directory node `node`.
    Stamp { node: usize, entry: Entry },
}

/// Finished upstream work.
enum Completed {
    Listing {
        node: usize,
        path: String,
        result: Result<Vec<Entry>>,
    },
    Stamp {
        node: usize,
        entry: Entry,
        result: Result<Option<CommitTimestamp>>,
    },
}

/// Directory being aggregated.
struct DirNode {
    entry: Entry,
    parent: Option<usize>,
    parts: Vec<Summary>,
    /// Own listing plus children that have not completed yet.
    outstanding: usize,
    /// Descendants left out of `parts`, including those of settled subdirectories.
    skipped: usize,
}

impl DirNode {
    fn new(entry: Entry, parent: Option<usize>) -> Self {
        Self {
            entry,
            parent,
            parts: Vec::new(),
            outstanding: 1,
            skipped: 0,
        }
    }
}

/// Arena of directories under aggregation.
struct Tree {
    nodes: Vec<DirNode>,
}

impl Tree {
    fn new(root: Entry) -> Self {
        Self {
            nodes: vec![DirNode::new(root, None)],
        }
    }

    /// Register a subdirectory of `parent` awaiting its listing.
    fn add_directory(&mut self, entry: Entry, parent: usize) -> usize {
        self.nodes[parent].outstanding += 1;
        self.nodes.push(DirNode::new(entry, Some(parent)));
        self.nodes.len() - 1
    }

    /// Register a file of `node` awaiting its commit date.
    fn add_file(&mut self, node: usize) {
        self.nodes[node].outstanding += 1;
    }

    /// Mark one outstanding item of `id` complete and fold every directory
    /// that became complete into its parent.
    ///
    /// Returns the root details once the root itself completes.
    fn settle(&mut self, mut id: usize) -> Option<Details> {
        loop {
            let node = &mut self.nodes[id];
            node.outstanding -= 1;
            if node.outstanding > 0 {
                return None;
            }

            let summary = merge(&node.entry, &node.parts);
            let skipped = node.skipped;
            let parent = node.parent;
            node.parts = Vec::new();

            match parent {
                None => return Some(Details { summary, skipped }),
                Some(parent) => {
                    let parent_node = &mut self.nodes[parent];
                    parent_node.parts.push(summary);
                    parent_node.skipped += skipped;
                    id = parent;
                }
            }
        }
    }

    /// Drop directory `id`, which could not be listed, from its parent.
    fn abandon(&mut self, id: usize) -> Option<Details> {
        let parent = self.nodes[id].parent?;
        self.nodes[parent].skipped += 1;
        self.settle(parent)
    }
}

/// Queue the children of listed directory `node` and settle its own listing.
fn expand(
    tree: &mut Tree,
    pending: &mut Vec<Lookup>,
    node: usize,
    children: Vec<Entry>,
) -> Option<Details> {
    for child in children {
        match child.kind {
            EntryKind::File => {
                tree.add_file(node);
                pending.push(Lookup::Stamp { node, entry: child });
            }
            EntryKind::Directory => {
                let path = child.path.clone();
                let id = tree.add_directory(child, node);
                pending.push(Lookup::Listing { node: id, path });
            }
        }
    }
    tree.settle(node)
}

/// Computes [`Details`] for repository paths.
pub struct Aggregator {
    store: Arc<dyn ContentStore>,
    resolver: CommitDateResolver,
    max_in_flight: usize,
}

impl Aggregator {
    /// Create an aggregator keeping at most `max_in_flight` lookups running
    /// per request.
    pub fn new(store: Arc<dyn ContentStore>, max_in_flight: usize) -> Self {
        Self {
            resolver: CommitDateResolver::new(store.clone()),
            store,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Per-request bound on concurrent lookups.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Aggregate size, file count and latest modification of `path`.
    ///
    /// Dropping the returned future cancels every outstanding lookup.
    pub async fn aggregate(&self, path: &str) -> Result<Details> {
        let path = normalize_path(path)?;
        let (root, children) = self.store.get_entry_with_children(&path).await?;

        match (root.kind, children) {
            (EntryKind::File, _) => {
                let last_modified = self.resolver.latest_modification(&root.path).await?;
                Ok(Details {
                    summary: Summary::for_file(&root, last_modified),
                    skipped: 0,
                })
            }
            (EntryKind::Directory, Some(children)) => {
                self.aggregate_directory(root, children).await
            }
            (EntryKind::Directory, None) => {
                let children = self.store.list_children(&root.path).await?;
                self.aggregate_directory(root, children).await
            }
        }
    }

    async fn aggregate_directory(&self, root: Entry, children: Vec<Entry>) -> Result<Details> {
        let mut pending = Vec::new();
        let mut tree = Tree::new(root);
        if let Some(details) = expand(&mut tree, &mut pending, ROOT, children) {
            return Ok(details);
        }
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.max_in_flight {
                match pending.pop() {
                    Some(lookup) => in_flight.push(self.run(lookup)),
                    None => break,
                }
            }

            let Some(completed) = in_flight.next().await else {
                return Err(RepoDriveError::Internal(
                    "aggregation ran out of work before the root settled".to_string(),
                ));
            };

            let settled = match completed {
                Completed::Listing {
                    node,
                    result: Ok(children),
                    ..
                } => expand(&mut tree, &mut pending, node, children),
                Completed::Listing {
                    node,
                    path,
                    result: Err(e),
                } => {
                    warn!(path = %path, error = %e, "Skipping directory that could not be listed");
                    tree.abandon(node)
                }
                Completed::Stamp {
                    node,
                    entry,
                    result: Ok(last_modified),
                } => {
                    tree.nodes[node]
                        .parts
                        .push(Summary::for_file(&entry, last_modified));
                    tree.settle(node)
                }
                Completed::Stamp {
                    node,
                    entry,
                    result: Err(e),
                } => {
                    warn!(path = %entry.path, error = %e, "Skipping file whose history could not be read");
                    tree.nodes[node].skipped += 1;
                    tree.settle(node)
                }
            };

            if let Some(details) = settled {
                debug!(
                    files = details.summary.files(),
                    bytes = details.summary.total_size_bytes,
                    skipped = details.skipped,
                    directories = tree.nodes.len(),
                    "Directory aggregated"
                );
                return Ok(details);
            }
        }
    }

    async fn run(&self, lookup: Lookup) -> Completed {
        match lookup {
            Lookup::Listing { node, path } => {
                let result = self.store.list_children(&path).await;
                Completed::Listing { node, path, result }
            }
            Lookup::Stamp { node, entry } => {
                let result = self.resolver.latest_modification(&entry.path).await;
                Completed::Stamp {
                    node,
                    entry,
                    result,
                }
            }
        }
    }
}
