//! Summary type and the merge fold.

use serde::Serialize;

use crate::upstream::{CommitTimestamp, Entry, EntryKind};

/// Aggregated size, count and modification time of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Entry name.
    pub name: String,
    /// Entry path relative to the repository root.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
    /// File size, or the sum of all descendant file sizes for a directory.
    pub total_size_bytes: u64,
    /// Number of files in the whole subtree. Unset for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    /// Latest commit date among all contributing files, if any has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<CommitTimestamp>,
}

impl Summary {
    /// Summary of a single file.
    pub fn for_file(entry: &Entry, last_modified: Option<CommitTimestamp>) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.clone(),
            kind: EntryKind::File,
            total_size_bytes: entry.size,
            file_count: None,
            last_modified,
        }
    }

    /// Number of files this summary stands for.
    pub fn files(&self) -> u64 {
        match self.kind {
            EntryKind::File => 1,
            EntryKind::Directory => self.file_count.unwrap_or(0),
        }
    }
}

/// Fold child summaries into the summary of the directory `identity`.
///
/// Sizes and file counts are summed, modification times take the maximum, so
/// the result does not depend on the order of `parts`.
pub fn merge<'a, I>(identity: &Entry, parts: I) -> Summary
where
    I: IntoIterator<Item = &'a Summary>,
{
    let mut total_size_bytes = 0u64;
    let mut file_count = 0u64;
    let mut last_modified: Option<CommitTimestamp> = None;

    for part in parts {
        total_size_bytes = total_size_bytes.saturating_add(part.total_size_bytes);
        file_count = file_count.saturating_add(part.files());
        last_modified = match (last_modified, part.last_modified) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    Summary {
        name: identity.name.clone(),
        path: identity.path.clone(),
        kind: EntryKind::Directory,
        total_size_bytes,
        file_count: Some(file_count),
        last_modified,
    }
}

/// Result of a details request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Details {
    /// Aggregated summary.
    pub summary: Summary,
    /// Descendants that could not be resolved and were left out of `summary`.
    pub skipped: usize,
}

impl Details {
    /// Whether some descendants were left out.
    pub fn is_degraded(&self) -> bool {
        self.skipped > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(secs: i64) -> CommitTimestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn file(path: &str, size: u64, t: Option<i64>) -> Summary {
        Summary::for_file(&Entry::file(path, size), t.map(ts))
    }

    #[test]
    fn test_for_file() {
        let entry = Entry::file("storage/a.txt", 42);
        let summary = Summary::for_file(&entry, Some(ts(7)));

        assert_eq!(summary.name, "a.txt");
        assert_eq!(summary.kind, EntryKind::File);
        assert_eq!(summary.total_size_bytes, 42);
        assert_eq!(summary.file_count, None);
        assert_eq!(summary.last_modified, Some(ts(7)));
    }

    #[test]
    fn test_merge_sums_and_maxes() {
        let dir = Entry::directory("storage");
        let parts = vec![file("storage/a", 10, Some(5)), file("storage/b", 20, Some(10))];

        let summary = merge(&dir, &parts);
        assert_eq!(summary.kind, EntryKind::Directory);
        assert_eq!(summary.name, "storage");
        assert_eq!(summary.total_size_bytes, 30);
        assert_eq!(summary.file_count, Some(2));
        assert_eq!(summary.last_modified, Some(ts(10)));
    }

    #[test]
    fn test_merge_counts_nested_directory_files() {
        let sub = merge(
            &Entry::directory("storage/sub"),
            &[file("storage/sub/x", 7, Some(9)), file("storage/sub/y", 1, None)],
        );
        let parts = vec![file("storage/a", 5, Some(3)), sub];

        let summary = merge(&Entry::directory("storage"), &parts);
        assert_eq!(summary.total_size_bytes, 13);
        assert_eq!(summary.file_count, Some(3));
        assert_eq!(summary.last_modified, Some(ts(9)));
    }

    #[test]
    fn test_merge_empty() {
        let summary = merge(&Entry::directory("empty"), Vec::<&Summary>::new());
        assert_eq!(summary.total_size_bytes, 0);
        assert_eq!(summary.file_count, Some(0));
        assert_eq!(summary.last_modified, None);
    }

    #[test]
    fn test_merge_saturates_counts_and_sizes() {
        let mut huge = merge(&Entry::directory("d/huge"), Vec::<&Summary>::new());
        huge.total_size_bytes = u64::MAX;
        huge.file_count = Some(u64::MAX);
        let parts = vec![huge, file("d/a", 7, None)];

        let summary = merge(&Entry::directory("d"), &parts);
        assert_eq!(summary.total_size_bytes, u64::MAX);
        assert_eq!(summary.file_count, Some(u64::MAX));
    }

    #[test]
    fn test_merge_without_timestamps_stays_absent() {
        let parts = vec![file("a", 1, None), file("b", 2, None)];
        let summary = merge(&Entry::directory(""), &parts);
        assert_eq!(summary.last_modified, None);
    }

    #[test]
    fn test_merge_order_independent() {
        let dir = Entry::directory("d");
        let sub = merge(&Entry::directory("d/s"), &[file("d/s/z", 4, Some(2))]);
        let parts = vec![
            file("d/a", 1, Some(8)),
            file("d/b", 2, None),
            sub,
            file("d/c", 3, Some(1)),
        ];
        let expected = merge(&dir, &parts);

        // Every rotation and the reverse order fold to the same summary.
        for shift in 0..parts.len() {
            let mut rotated = parts.clone();
            rotated.rotate_left(shift);
            assert_eq!(merge(&dir, &rotated), expected);
        }
        let reversed: Vec<Summary> = parts.iter().rev().cloned().collect();
        assert_eq!(merge(&dir, &reversed), expected);
    }

    #[test]
    fn test_merge_associative() {
        let a = file("d/a", 1, Some(3));
        let b = file("d/b", 2, Some(8));
        let c = file("d/c", 4, None);

        let flat = merge(&Entry::directory("d"), [&a, &b, &c]);
        let grouped = merge(
            &Entry::directory("d"),
            [&merge(&Entry::directory("d/ab"), [&a, &b]), &c],
        );

        assert_eq!(flat.total_size_bytes, grouped.total_size_bytes);
        assert_eq!(flat.file_count, grouped.file_count);
        assert_eq!(flat.last_modified, grouped.last_modified);
    }

    #[test]
    fn test_summary_serialization() {
        let file_json = serde_json::to_value(file("storage/a.txt", 3, None)).unwrap();
        assert_eq!(file_json["kind"], "file");
        assert_eq!(file_json["totalSizeBytes"], 3);
        assert!(file_json.get("fileCount").is_none());
        assert!(file_json.get("lastModified").is_none());

        let dir = merge(
            &Entry::directory("storage"),
            &[file("storage/a.txt", 3, Some(0))],
        );
        let dir_json = serde_json::to_value(dir).unwrap();
        assert_eq!(dir_json["kind"], "directory");
        assert_eq!(dir_json["fileCount"], 1);
        assert_eq!(dir_json["lastModified"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_details_degraded() {
        let summary = merge(&Entry::directory(""), Vec::<&Summary>::new());
        let complete = Details {
            summary: summary.clone(),
            skipped: 0,
        };
        let partial = Details {
            summary,
            skipped: 2,
        };
        assert!(!complete.is_degraded());
        assert!(partial.is_degraded());
    }
}
