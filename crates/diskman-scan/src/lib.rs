//! File system scanning and snapshot caching for diskman.
//!
//! # Overview
//!
//! `diskman-scan` turns a directory into an immutable [`Snapshot`] and keeps
//! those snapshots around so that browsing never rescans. Key features:
//!
//! - **Parallel traversal** using jwalk on a dedicated rayon pool
//! - **Cycle protection** through an inode set of entered directories
//! - **Hardlink detection** to avoid double-counting
//! - **Cancellation** at every directory boundary
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use diskman_scan::SnapshotCache;
//!
//! let cache = SnapshotCache::default();
//! let snapshot = cache.get_or_scan("/path/to/scan").unwrap();
//! println!("Total size: {} bytes", snapshot.total_size());
//!
//! // Served from memory, no second scan.
//! let docs = cache.open("/path/to/scan/docs").unwrap();
//! println!("docs: {} bytes", docs.size);
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use diskman_scan::SnapshotCache;
//!
//! let cache = SnapshotCache::default();
//! let mut progress_rx = cache.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod cache;
mod inode;
mod progress;
mod scanner;

pub use cache::SnapshotCache;
pub use inode::InodeTracker;
pub use progress::ScanProgress;
pub use scanner::TreeScanner;

// Re-export core types for convenience
pub use diskman_core::{
    Entry, EntryError, EntryKind, ScanConfig, ScanError, ScanWarning, Snapshot, TreeStats,
    WarningKind,
};
