//! Recursive name search across a scanned subtree.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use diskman_core::{Entry, EntryError, InodeInfo};
use diskman_scan::SnapshotCache;

/// Lazy, pre-order search over every descendant of a root entry.
///
/// Yields files and directories whose name contains the needle, ignoring
/// case. The walk keeps its own stack, so arbitrarily deep trees are fine and
/// callers can stop early without paying for the rest.
pub struct DeepSearch<'a> {
    root: Arc<Entry>,
    needle: String,
    stack: Vec<Arc<Entry>>,
    /// Directories already expanded, so a tree reached twice is walked once.
    expanded: HashSet<InodeInfo>,
    cache: Option<&'a SnapshotCache>,
}

/// Search `root`'s descendants for names containing `needle`.
///
/// An empty needle matches nothing.
pub fn deep_search<'a>(root: Arc<Entry>, needle: &str) -> DeepSearch<'a> {
    let mut search = DeepSearch {
        root,
        needle: String::new(),
        stack: Vec::new(),
        expanded: HashSet::new(),
        cache: None,
    };
    search.restart(needle);
    search
}

impl<'a> DeepSearch<'a> {
    /// Ask `cache` for directories the scan could not read instead of
    /// skipping them. Cycle markers are never re-requested.
    pub fn with_cache(mut self, cache: &'a SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Start over from the root with a new needle.
    pub fn restart(&mut self, needle: &str) {
        self.needle = needle.to_lowercase();
        self.stack.clear();
        self.expanded.clear();
        if !self.needle.is_empty() {
            self.expanded.extend(self.root.inode);
            self.stack.extend(self.root.children.iter().rev().cloned());
        }
    }

    /// Lowercased needle currently searched for.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    fn children_of(&mut self, entry: &Arc<Entry>) -> Vec<Arc<Entry>> {
        if !entry.is_dir() {
            return Vec::new();
        }
        match entry.error {
            None if self.first_expansion(entry) => entry.children.clone(),
            Some(EntryError::PermissionDenied | EntryError::IoTransient) => {
                let Some(cache) = self.cache else {
                    return Vec::new();
                };
                match cache.open(&entry.path) {
                    Ok(fresh) if !fresh.has_error() && self.first_expansion(&fresh) => {
                        fresh.children.clone()
                    }
                    Ok(_) => Vec::new(),
                    Err(err) => {
                        debug!(path = %entry.path.display(), error = %err, "search skipped directory");
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        }
    }

    /// Record `dir` as expanded; `false` if its inode was expanded before.
    fn first_expansion(&mut self, dir: &Entry) -> bool {
        match dir.inode {
            Some(info) => self.expanded.insert(info),
            None => true,
        }
    }
}

impl Iterator for DeepSearch<'_> {
    type Item = Arc<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entry) = self.stack.pop() {
            let children = self.children_of(&entry);
            self.stack.extend(children.into_iter().rev());

            if entry.name.to_lowercase().contains(&self.needle) {
                return Some(entry);
            }
        }
        None
    }
}
