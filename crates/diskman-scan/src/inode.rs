//! Inode tracking for cycle detection and hardlink deduplication.

use dashmap::DashSet;
use diskman_core::InodeInfo;

/// Concurrent set of `(inode, device)` pairs seen during one scan.
///
/// The scanner keeps two of these: one for directories it has entered (the
/// cycle guard) and one for hardlinked files whose bytes were already
/// counted. Both are shared by every worker of the scan.
#[derive(Debug, Default)]
pub struct InodeTracker {
    seen: DashSet<InodeInfo>,
}

impl InodeTracker {
    /// Create a new inode tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Track an inode. Returns `true` if this is the first time seeing it.
    pub fn track(&self, info: InodeInfo) -> bool {
        self.seen.insert(info)
    }

    /// Check if an inode has been seen (without tracking).
    pub fn has_seen(&self, info: &InodeInfo) -> bool {
        self.seen.contains(info)
    }

    /// Get the number of unique inodes tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no inodes have been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
