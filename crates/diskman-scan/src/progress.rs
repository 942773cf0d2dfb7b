//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Root of the scan this update belongs to.
    pub root: PathBuf,
    /// Number of files scanned so far.
    pub files_scanned: u64,
    /// Number of directories listed so far.
    pub dirs_scanned: u64,
    /// Total bytes seen so far.
    pub bytes_scanned: u64,
    /// Directory that was just listed.
    pub current_path: PathBuf,
    /// Number of entries that failed to read.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

/// Shared counters updated from the scan workers.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    root: PathBuf,
    start_time: Instant,
    interval: u64,
    files: AtomicU64,
    dirs: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
}

impl ProgressTracker {
    pub fn new(root: &Path, interval: u64) -> Self {
        Self {
            root: root.to_path_buf(),
            start_time: Instant::now(),
            interval: interval.max(1),
            files: AtomicU64::new(0),
            dirs: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn record_files(&self, count: u64, bytes: u64) {
        self.files.fetch_add(count, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_errors(&self, count: u64) {
        self.errors.fetch_add(count, Ordering::Relaxed);
    }

    /// Count a finished directory and publish an update every `interval`.
    pub fn finish_dir(&self, path: &Path, tx: &broadcast::Sender<ScanProgress>) {
        let listed = self.dirs.fetch_add(1, Ordering::Relaxed) + 1;
        if listed % self.interval == 0 && tx.receiver_count() > 0 {
            let mut update = self.snapshot();
            update.current_path = path.to_path_buf();
            let _ = tx.send(update);
        }
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            root: self.root.clone(),
            files_scanned: self.files.load(Ordering::Relaxed),
            dirs_scanned: self.dirs.load(Ordering::Relaxed),
            bytes_scanned: self.bytes.load(Ordering::Relaxed),
            current_path: self.root.clone(),
            errors_count: self.errors.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut progress = ScanProgress::new("/data");
        assert_eq!(progress.files_per_second(), 0.0);

        progress.files_scanned = 100;
        progress.dirs_scanned = 4;
        progress.elapsed = Duration::from_secs(2);
        assert_eq!(progress.files_per_second(), 50.0);
        assert_eq!(progress.total_items(), 104);
    }

    #[test]
    fn test_tracker_publishes_on_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let tracker = ProgressTracker::new(Path::new("/data"), 2);
        tracker.record_files(3, 30);

        tracker.finish_dir(Path::new("/data/a"), &tx);
        assert!(rx.try_recv().is_err());

        tracker.finish_dir(Path::new("/data/b"), &tx);
        let update = rx.try_recv().unwrap();
        assert_eq!(update.dirs_scanned, 2);
        assert_eq!(update.files_scanned, 3);
        assert_eq!(update.bytes_scanned, 30);
        assert_eq!(update.current_path, PathBuf::from("/data/b"));
    }
}
