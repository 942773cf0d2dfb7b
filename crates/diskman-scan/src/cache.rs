//! Snapshot cache keyed by canonical directory path.
//!
//! The cache is the only way the rest of the system obtains directory data.
//! It scans a path at most once per cache epoch, serves navigation into any
//! directory below a cached root straight from memory, and only rescans when
//! told to. There is no time-based expiry and no filesystem watching: a
//! snapshot stays valid until [`SnapshotCache::force_rescan`] or
//! [`SnapshotCache::invalidate`] replaces it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use diskman_core::{Entry, ScanConfig, ScanError, Snapshot};

use crate::progress::ScanProgress;
use crate::scanner::TreeScanner;

/// Per-key coordination for scans of one path.
///
/// `publish` serializes scans of the key. `generation` grows with every
/// forced rescan; a scan may only publish if the generation it started
/// under is still current. A slot only lives while some call holds it.
#[derive(Debug, Default)]
struct ScanSlot {
    publish: Mutex<()>,
    generation: AtomicU64,
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
}

impl ScanSlot {
    /// Register a scan under the current generation.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut in_flight = lock(&self.in_flight);
        let generation = self.generation.load(Ordering::SeqCst);
        let token = CancellationToken::new();
        *in_flight = Some((generation, token.clone()));
        (generation, token)
    }

    /// Register a forced scan, unless a newer one has been requested since.
    fn begin_at(&self, generation: u64) -> Option<CancellationToken> {
        let mut in_flight = lock(&self.in_flight);
        if self.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        let token = CancellationToken::new();
        *in_flight = Some((generation, token.clone()));
        Some(token)
    }

    /// Start a new generation and cancel any older scan still running.
    fn supersede(&self) -> u64 {
        let in_flight = lock(&self.in_flight);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((started, token)) = in_flight.as_ref() {
            if *started < generation {
                token.cancel();
            }
        }
        generation
    }

    fn cancel(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Cache of scanned directory trees.
///
/// Create one per session and share it (`Arc<SnapshotCache>`) between every
/// consumer. Published snapshots are immutable, so readers never wait on a
/// running scan.
pub struct SnapshotCache {
    config: ScanConfig,
    scanner: TreeScanner,
    snapshots: DashMap<PathBuf, Arc<Snapshot>>,
    slots: DashMap<PathBuf, Arc<ScanSlot>>,
    epoch: AtomicU64,
    scans: AtomicU64,
}

impl SnapshotCache {
    /// Create an empty cache. `config.root` is ignored; every scan uses the
    /// requested path as its root.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            scanner: TreeScanner::new(),
            snapshots: DashMap::new(),
            slots: DashMap::new(),
            epoch: AtomicU64::new(0),
            scans: AtomicU64::new(0),
        }
    }

    /// Scan settings applied to every path.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Subscribe to progress of every scan this cache runs.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.scanner.subscribe()
    }

    /// Return the cached snapshot for `path`, scanning it on first use.
    ///
    /// Concurrent callers for the same path share a single scan.
    pub fn get_or_scan(&self, path: impl AsRef<Path>) -> Result<Arc<Snapshot>, ScanError> {
        let key = canonical(path.as_ref())?;
        let result = self.get_or_scan_key(&key);
        self.release_slot(&key);
        result
    }

    fn get_or_scan_key(&self, key: &Path) -> Result<Arc<Snapshot>, ScanError> {
        loop {
            if let Some(snapshot) = self.get_exact(key) {
                debug!(path = %key.display(), "snapshot cache hit");
                return Ok(snapshot);
            }

            let slot = self.slot(key);
            let guard = lock(&slot.publish);
            if let Some(snapshot) = self.get_exact(key) {
                return Ok(snapshot);
            }

            debug!(path = %key.display(), "snapshot cache miss");
            let (generation, token) = slot.begin();
            match self.scan_and_publish(key, &slot, generation, &token) {
                // A forced rescan took over; wait for its result.
                Err(ScanError::Interrupted) if slot.current() != generation => {
                    drop(guard);
                    continue;
                }
                result => return result,
            }
        }
    }

    /// Scan `path` again and replace whatever was cached.
    ///
    /// The newest request wins: starting a rescan cancels an older scan of
    /// the same path, and a scan that was superseded returns
    /// [`ScanError::Interrupted`] without publishing anything.
    pub fn force_rescan(&self, path: impl AsRef<Path>) -> Result<Arc<Snapshot>, ScanError> {
        let key = canonical(path.as_ref())?;
        let result = self.rescan_key(&key);
        self.release_slot(&key);
        result
    }

    fn rescan_key(&self, key: &Path) -> Result<Arc<Snapshot>, ScanError> {
        let slot = self.slot(key);
        let generation = slot.supersede();

        let _guard = lock(&slot.publish);
        let Some(token) = slot.begin_at(generation) else {
            debug!(path = %key.display(), "rescan superseded before it started");
            return Err(ScanError::Interrupted);
        };

        debug!(path = %key.display(), generation, "forced rescan");
        self.scan_and_publish(key, &slot, generation, &token)
    }

    /// Whether `path` can be served without scanning: it is a cached root
    /// or a readable directory inside one.
    pub fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        let key = canonical_or_absolute(path.as_ref());
        self.snapshots.contains_key(&key)
            || self
                .find_in_ancestors(&key)
                .is_some_and(|entry| entry.is_dir())
    }

    /// Entry for `path`, taken from the cache when possible.
    ///
    /// Directories below a cached root are served from that root's snapshot
    /// without touching the disk; anything else is scanned through
    /// [`get_or_scan`](Self::get_or_scan).
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<Entry>, ScanError> {
        let key = canonical(path.as_ref())?;
        if let Some(snapshot) = self.get_exact(&key) {
            return Ok(Arc::clone(&snapshot.root));
        }
        if let Some(entry) = self.find_in_ancestors(&key) {
            trace!(path = %key.display(), "served from ancestor snapshot");
            return Ok(entry);
        }
        Ok(Arc::clone(&self.get_or_scan(&key)?.root))
    }

    /// Cached snapshot for exactly `path`, if any.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Snapshot>> {
        self.get_exact(&canonical_or_absolute(path.as_ref()))
    }

    /// Drop the snapshot for `path`. Returns whether one was cached.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        let key = canonical_or_absolute(path.as_ref());
        if !self.snapshots.contains_key(&key) {
            return false;
        }

        let removed = {
            let slot = self.slot(&key);
            let _guard = lock(&slot.publish);
            self.snapshots.remove(&key).is_some()
        };
        self.release_slot(&key);
        if removed {
            debug!(path = %key.display(), "snapshot invalidated");
        }
        removed
    }

    /// Drop every snapshot.
    pub fn clear(&self) {
        self.snapshots.clear();
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    /// Cancel a running scan of `path`. Returns whether one was running.
    pub fn cancel(&self, path: impl AsRef<Path>) -> bool {
        let key = canonical_or_absolute(path.as_ref());
        self.slots
            .get(&key)
            .map(|slot| slot.cancel())
            .unwrap_or(false)
    }

    /// Update every snapshot after `path` was removed by someone else.
    ///
    /// Snapshots containing `path` are republished without it, with the
    /// sizes of all its ancestors reduced. Snapshots rooted at or below
    /// `path` are dropped. Nothing is read from disk. Returns whether any
    /// snapshot changed.
    pub fn forget_entry(&self, path: impl AsRef<Path>) -> bool {
        let target = removed_path(path.as_ref());
        let keys: Vec<PathBuf> = self
            .snapshots
            .iter()
            .filter(|item| target.starts_with(item.key()) || item.key().starts_with(&target))
            .map(|item| item.key().clone())
            .collect();

        let mut changed = false;
        for key in keys {
            changed |= self.forget_in(&key, &target);
            self.release_slot(&key);
        }
        changed
    }

    /// Apply [`forget_entry`](Self::forget_entry) to the snapshot at `key`.
    fn forget_in(&self, key: &Path, target: &Path) -> bool {
        let slot = self.slot(key);
        let _guard = lock(&slot.publish);

        if key.starts_with(target) {
            return self.snapshots.remove(key).is_some();
        }

        let Some(current) = self.get_exact(key) else {
            return false;
        };
        let Some(removed) = current.entry(target) else {
            return false;
        };
        let Some(root) = current.root.without(target) else {
            return false;
        };

        let mut stats = current.stats.clone();
        stats.total_size = stats.total_size.saturating_sub(removed.size);
        stats.total_files = stats.total_files.saturating_sub(removed.file_count());
        stats.total_dirs = stats
            .total_dirs
            .saturating_sub(removed.dir_count() + u64::from(removed.is_dir()));

        let updated = Snapshot {
            root: Arc::new(root),
            stats,
            ..(*current).clone()
        };
        self.snapshots.insert(key.to_path_buf(), Arc::new(updated));
        debug!(path = %target.display(), root = %key.display(), "entry forgotten");
        true
    }

    /// Roots of all cached snapshots, sorted.
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.snapshots.iter().map(|s| s.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of scans this cache has started.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    fn get_exact(&self, key: &Path) -> Option<Arc<Snapshot>> {
        self.snapshots.get(key).map(|s| Arc::clone(s.value()))
    }

    fn slot(&self, key: &Path) -> Arc<ScanSlot> {
        Arc::clone(
            self.slots
                .entry(key.to_path_buf())
                .or_default()
                .value(),
        )
    }

    /// Drop the slot of `key` unless another call still holds it.
    fn release_slot(&self, key: &Path) {
        self.slots.remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
    }

    /// Deepest cached snapshot strictly above `key` that holds a readable
    /// entry for it.
    fn find_in_ancestors(&self, key: &Path) -> Option<Arc<Entry>> {
        let snapshot = self
            .snapshots
            .iter()
            .filter(|item| key != item.key() && key.starts_with(item.key()))
            .max_by_key(|item| item.key().components().count())
            .map(|item| Arc::clone(item.value()))?;

        snapshot.entry(key).filter(|entry| !entry.has_error())
    }

    /// Run the scanner and publish the result if `generation` is still current.
    /// Must be called with the slot's publish lock held.
    fn scan_and_publish(
        &self,
        key: &Path,
        slot: &ScanSlot,
        generation: u64,
        token: &CancellationToken,
    ) -> Result<Arc<Snapshot>, ScanError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let result = self
            .scanner
            .scan_with_cancel(&self.config.with_root(key), token);

        let mut in_flight = lock(&slot.in_flight);
        if in_flight
            .as_ref()
            .is_some_and(|(started, _)| *started == generation)
        {
            *in_flight = None;
        }

        let mut snapshot = result?;
        if slot.current() != generation || token.is_cancelled() {
            debug!(path = %key.display(), "scan superseded, result dropped");
            return Err(ScanError::Interrupted);
        }

        snapshot.epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(snapshot);
        self.snapshots.insert(key.to_path_buf(), Arc::clone(&snapshot));
        info!(
            path = %key.display(),
            epoch = snapshot.epoch,
            bytes = snapshot.root.size,
            "snapshot published"
        );
        Ok(snapshot)
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn canonical(path: &Path) -> Result<PathBuf, ScanError> {
    path.canonicalize().map_err(|e| ScanError::io(path, e))
}

fn canonical_or_absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Best guess at the cached key of a path that may no longer exist.
fn removed_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => canonical_or_absolute(parent).join(name),
        _ => canonical_or_absolute(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("docs/drafts")).unwrap();
        fs::write(root.join("docs/report.txt"), "quarterly numbers").unwrap();
        fs::write(root.join("docs/drafts/v1.txt"), "draft").unwrap();
        fs::write(root.join("notes.md"), "# notes").unwrap();
        temp
    }

    #[test]
    fn test_get_or_scan_is_idempotent() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();

        let first = cache.get_or_scan(temp.path()).unwrap();
        let second = cache.get_or_scan(temp.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.scan_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_force_rescan_replaces() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();

        let first = cache.get_or_scan(temp.path()).unwrap();
        assert!(cache.is_cached(temp.path()));

        fs::write(temp.path().join("new.bin"), vec![1u8; 64]).unwrap();
        let fresh = cache.force_rescan(temp.path()).unwrap();

        assert_eq!(cache.scan_count(), 2);
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(fresh.root.size, first.root.size + 64);
        assert!(fresh.epoch > first.epoch);
        assert!(Arc::ptr_eq(&fresh, &cache.get(temp.path()).unwrap()));
    }

    #[test]
    fn test_navigation_uses_parent_snapshot() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();
        cache.get_or_scan(temp.path()).unwrap();

        let docs = temp.path().join("docs");
        assert!(cache.is_cached(&docs));
        let entry = cache.open(&docs).unwrap();

        assert_eq!(entry.size, 17 + 5);
        assert_eq!(cache.scan_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();

        let result = cache.get_or_scan(temp.path().join("missing"));
        assert!(matches!(result, Err(ScanError::NotFound { .. })));
        assert!(!cache.is_cached(temp.path().join("missing")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget_entry_updates_sizes() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();
        let before = cache.get_or_scan(temp.path()).unwrap();

        let report = temp.path().join("docs/report.txt");
        fs::remove_file(&report).unwrap();
        assert!(cache.forget_entry(&report));

        let after = cache.get(temp.path()).unwrap();
        assert_eq!(after.root.size, before.root.size - 17);
        assert_eq!(after.stats.total_files, before.stats.total_files - 1);
        assert!(after.entry(&after.root_path.join("docs/report.txt")).is_none());
        assert_eq!(cache.scan_count(), 1);
    }

    #[test]
    fn test_invalidate_then_rescan() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();
        cache.get_or_scan(temp.path()).unwrap();

        assert!(cache.invalidate(temp.path()));
        assert!(!cache.is_cached(temp.path()));
        cache.get_or_scan(temp.path()).unwrap();
        assert_eq!(cache.scan_count(), 2);
    }

    #[test]
    fn test_cancel_without_scan() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();
        assert!(!cache.cancel(temp.path()));
    }

    #[test]
    fn test_files_are_not_cached_directories() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();
        cache.get_or_scan(temp.path()).unwrap();

        assert!(cache.is_cached(temp.path().join("docs/drafts")));
        assert!(!cache.is_cached(temp.path().join("notes.md")));
        assert!(!cache.is_cached(temp.path().join("docs/report.txt")));
    }

    #[test]
    fn test_slots_are_released() {
        let temp = create_test_tree();
        let cache = SnapshotCache::default();

        cache.get_or_scan(temp.path()).unwrap();
        assert!(cache.slots.is_empty());

        cache.force_rescan(temp.path()).unwrap();
        assert!(cache.slots.is_empty());

        assert!(!cache.invalidate(temp.path().join("never-scanned")));
        assert!(cache.forget_entry(temp.path().join("notes.md")));
        assert!(cache.slots.is_empty());

        let held = cache.slot(temp.path());
        cache.clear();
        assert_eq!(cache.slots.len(), 1);
        drop(held);
        cache.clear();
        assert!(cache.slots.is_empty());
    }

    #[test]
    fn test_supersede_invalidates_older_generations() {
        let slot = ScanSlot::default();
        let (started, token) = slot.begin();
        assert_eq!(started, 0);

        let first = slot.supersede();
        assert!(token.is_cancelled());
        let second = slot.supersede();

        assert!(slot.begin_at(first).is_none());
        let current = slot.begin_at(second).unwrap();
        assert!(!current.is_cancelled());
        assert!(slot.cancel());
        assert!(current.is_cancelled());
    }

    #[test]
    fn test_last_forced_rescan_wins() {
        let temp = create_test_tree();
        let cache = Arc::new(SnapshotCache::default());
        let key = temp.path().canonicalize().unwrap();

        // Hold the publish lock so both rescans are requested before
        // either can start.
        let slot = cache.slot(&key);
        let guard = lock(&slot.publish);

        let spawn = |cache: &Arc<SnapshotCache>| {
            let cache = Arc::clone(cache);
            let key = key.clone();
            thread::spawn(move || cache.force_rescan(key))
        };
        let older = spawn(&cache);
        while slot.current() < 1 {
            thread::sleep(Duration::from_millis(1));
        }
        let newer = spawn(&cache);
        while slot.current() < 2 {
            thread::sleep(Duration::from_millis(1));
        }
        drop(guard);
        drop(slot);

        let older = older.join().unwrap();
        let newer = newer.join().unwrap();
        assert!(matches!(older, Err(ScanError::Interrupted)));
        let newer = newer.unwrap();

        assert_eq!(cache.scan_count(), 1);
        assert!(Arc::ptr_eq(&newer, &cache.get(&key).unwrap()));
        assert_eq!(newer.epoch, 1);
    }
}
