//! Aggregate views over a scanned subtree: where the bytes are by file type,
//! and which individual files are the biggest.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use diskman_core::Entry;

/// Label used for files without an extension.
pub const NO_EXTENSION: &str = "(none)";

/// Bytes and files sharing one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionStats {
    /// Lowercased extension without the dot, or [`NO_EXTENSION`].
    pub extension: String,
    pub file_count: u64,
    pub total_size: u64,
}

/// Per-extension totals for every file below `root`, largest first,
/// limited to `limit` rows.
pub fn extension_breakdown(root: &Entry, limit: usize) -> Vec<ExtensionStats> {
    let mut totals: HashMap<String, (u64, u64)> = HashMap::new();
    for file in files(root) {
        let key = file.extension().unwrap_or_else(|| NO_EXTENSION.to_string());
        let slot = totals.entry(key).or_default();
        slot.0 += 1;
        slot.1 += file.size;
    }

    let mut rows: Vec<ExtensionStats> = totals
        .into_iter()
        .map(|(extension, (file_count, total_size))| ExtensionStats {
            extension,
            file_count,
            total_size,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_size
            .cmp(&a.total_size)
            .then_with(|| a.extension.cmp(&b.extension))
    });
    rows.truncate(limit);
    rows
}

/// The `limit` largest files below `root`, largest first.
pub fn largest_files(root: &Arc<Entry>, limit: usize) -> Vec<Arc<Entry>> {
    if limit == 0 {
        return Vec::new();
    }

    // Min-heap of the best `limit` seen so far.
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::with_capacity(limit + 1);
    let mut seen: Vec<Arc<Entry>> = Vec::new();

    let mut stack: Vec<&Arc<Entry>> = vec![root];
    while let Some(entry) = stack.pop() {
        stack.extend(entry.children.iter().rev());
        if !entry.is_file() || entry.has_error() {
            continue;
        }
        let index = seen.len();
        seen.push(Arc::clone(entry));
        heap.push(Reverse((entry.size, usize::MAX - index)));
        if heap.len() > limit {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse((_, rank))| Arc::clone(&seen[usize::MAX - rank]))
        .collect()
}

fn files(root: &Entry) -> impl Iterator<Item = &Entry> {
    std::iter::once(root)
        .chain(root.descendants())
        .filter(|e| e.is_file() && !e.has_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn sample() -> Arc<Entry> {
        let file = |p: &str, s| Arc::new(Entry::new_file(p, s, SystemTime::UNIX_EPOCH));
        let mut src = Entry::new_directory("/p/src", SystemTime::UNIX_EPOCH);
        src.children = vec![file("/p/src/main.rs", 300), file("/p/src/lib.RS", 200)];
        src.update_totals();

        let mut root = Entry::new_directory("/p", SystemTime::UNIX_EPOCH);
        root.children = vec![
            Arc::new(src),
            file("/p/logo.png", 1000),
            file("/p/Makefile", 50),
            file("/p/notes.txt", 50),
        ];
        root.update_totals();
        Arc::new(root)
    }

    #[test]
    fn test_extension_breakdown() {
        let rows = extension_breakdown(&sample(), 15);
        assert_eq!(rows[0].extension, "png");
        assert_eq!(rows[1].extension, "rs");
        assert_eq!((rows[1].file_count, rows[1].total_size), (2, 500));
        assert_eq!(rows[2].extension, NO_EXTENSION);
        assert_eq!(rows[3].extension, "txt");

        assert_eq!(extension_breakdown(&sample(), 2).len(), 2);
    }

    #[test]
    fn test_largest_files() {
        let top: Vec<String> = largest_files(&sample(), 3)
            .iter()
            .map(|e| e.name.to_string())
            .collect();
        assert_eq!(top, vec!["logo.png", "main.rs", "lib.RS"]);

        assert_eq!(largest_files(&sample(), 50).len(), 5);
        assert!(largest_files(&sample(), 0).is_empty());
    }

    #[test]
    fn test_largest_files_ties_keep_walk_order() {
        let top = largest_files(&sample(), 5);
        assert_eq!(top[3].name.as_str(), "Makefile");
        assert_eq!(top[4].name.as_str(), "notes.txt");
    }
}
