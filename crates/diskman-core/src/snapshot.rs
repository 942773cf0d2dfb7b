//! Snapshot container and statistics.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::ScanWarning;

/// Summary statistics for a scanned tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories (the root excluded).
    pub total_dirs: u64,
    /// Total number of symbolic links.
    pub total_symlinks: u64,
    /// Entries recorded with an error marker.
    pub total_errors: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, size: u64, depth: u32) {
        self.total_files += 1;
        self.total_size += size;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a symlink.
    pub fn record_symlink(&mut self, size: u64) {
        self.total_symlinks += 1;
        self.total_size += size;
    }

    /// Record an entry that failed to read.
    pub fn record_error(&mut self) {
        self.total_errors += 1;
    }

    /// Fold another set of stats into this one.
    pub fn merge(&mut self, other: &TreeStats) {
        self.total_size += other.total_size;
        self.total_files += other.total_files;
        self.total_dirs += other.total_dirs;
        self.total_symlinks += other.total_symlinks;
        self.total_errors += other.total_errors;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// The materialized result of scanning one directory.
///
/// Snapshots are immutable once published; a rescan produces a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canonical root path that was scanned.
    pub root_path: PathBuf,

    /// Root entry of the tree.
    pub root: Arc<Entry>,

    /// When this scan finished.
    pub created_at: SystemTime,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Warnings encountered during scan.
    pub warnings: Vec<ScanWarning>,

    /// Cache epoch this snapshot was published in (0 until published).
    #[serde(default)]
    pub epoch: u64,
}

impl Snapshot {
    /// Create a new snapshot.
    pub fn new(
        root: Entry,
        stats: TreeStats,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        Self {
            root_path: root.path.clone(),
            root: Arc::new(root),
            created_at: SystemTime::now(),
            scan_duration,
            stats,
            warnings,
            epoch: 0,
        }
    }

    /// Get the total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.root.size
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.root.file_count()
    }

    /// Get the total number of directories.
    pub fn total_dirs(&self) -> u64 {
        self.root.dir_count()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether `path` is the root or lies underneath it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root_path)
    }

    /// Entry at `path` inside this snapshot, without touching the disk.
    pub fn entry(&self, path: &Path) -> Option<Arc<Entry>> {
        self.root.find(path)
    }
}
