//! Entry and commit types shared by content store implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point in time of the most recent recorded change to a path.
pub type CommitTimestamp = DateTime<Utc>;

/// Kind of node in the remote content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (also symlinks and submodules, which carry no children).
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Classify a GitHub contents `type` value.
    pub fn from_github_type(value: &str) -> Self {
        match value {
            "dir" => EntryKind::Directory,
            _ => EntryKind::File,
        }
    }
}

/// A named node in the remote content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Last path segment.
    pub name: String,
    /// Slash-separated path relative to the repository root.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes. Always 0 for directories.
    pub size: u64,
    /// Opaque version identifier (blob sha). Not reported for directories
    /// resolved through their listing.
    pub content_id: Option<String>,
}

impl Entry {
    /// Create a file entry.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path).to_string(),
            path,
            kind: EntryKind::File,
            size,
            content_id: None,
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path).to_string(),
            path,
            kind: EntryKind::Directory,
            size: 0,
            content_id: None,
        }
    }

    /// Set the content id.
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Check whether this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One commit touching a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit sha.
    pub sha: String,
    /// Committer date, falling back to the author date.
    pub timestamp: CommitTimestamp,
}

/// Last segment of a slash-separated path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// ============================================================================
// GitHub wire types
// ============================================================================

/// Item of the GitHub contents API.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: Option<String>,
}

impl From<ContentItem> for Entry {
    fn from(item: ContentItem) -> Self {
        let kind = EntryKind::from_github_type(&item.item_type);
        Entry {
            name: item.name,
            path: item.path,
            kind,
            size: if kind == EntryKind::File { item.size } else { 0 },
            content_id: item.sha,
        }
    }
}

/// Body of `GET /repos/{owner}/{repo}/contents/{path}`.
///
/// Files come back as a single object; directories as the array of their
/// immediate children.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentsBody {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

/// Element of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitRecord {
    #[serde(default)]
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
    #[serde(default)]
    pub committer: Option<Signature>,
    #[serde(default)]
    pub author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Signature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CommitRecord {
    /// Convert to a [`CommitInfo`], if the record carries any date.
    pub fn into_info(self) -> Option<CommitInfo> {
        let CommitDetail { committer, author } = self.commit;
        let timestamp = committer
            .and_then(|s| s.date)
            .or_else(|| author.and_then(|s| s.date))?;
        Some(CommitInfo {
            sha: self.sha,
            timestamp,
        })
    }
}
