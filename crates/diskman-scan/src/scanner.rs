//! JWalk-based parallel directory scanner.
//!
//! A scan runs in two phases:
//!
//! 1. **Walk**: jwalk lists directories on a dedicated rayon pool. Every
//!    listing is classified inside `process_read_dir`, on the worker that read
//!    it, which is also where descent is decided: cycles and error entries get
//!    their `read_children_path` cleared, followed symlinks get one set.
//! 2. **Assemble**: the collected listings are folded into an [`Entry`] tree
//!    depth-first with an explicit work stack, finishing every subdirectory
//!    before its parent's size is computed.

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use compact_str::CompactString;
use jwalk::{Parallelism, WalkDirGeneric};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use diskman_core::{
    Entry, EntryError, EntryKind, InodeInfo, ScanConfig, ScanError, ScanWarning, SizeMode,
    Snapshot, TreeStats, WarningKind,
};

use crate::inode::InodeTracker;
use crate::progress::{ProgressTracker, ScanProgress};

/// jwalk client state: nothing per directory, a [`Visit`] per entry.
type WalkState = ((), Visit);
type WalkEntry = jwalk::DirEntry<WalkState>;

/// Scanner that builds one [`Snapshot`] per call.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Perform a scan of `config.root`.
    pub fn scan(&self, config: &ScanConfig) -> Result<Snapshot, ScanError> {
        self.scan_with_cancel(config, &CancellationToken::new())
    }

    /// Perform a scan that stops at the next directory boundary once
    /// `cancel` fires. A cancelled scan returns [`ScanError::Interrupted`]
    /// and never yields a partial tree.
    pub fn scan_with_cancel(
        &self,
        config: &ScanConfig,
        cancel: &CancellationToken,
    ) -> Result<Snapshot, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        let root_metadata =
            fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }
        // An unreadable root is the caller's problem, not a zero-size leaf.
        fs::read_dir(&root_path).map_err(|e| ScanError::io(&root_path, e))?;

        debug!(root = %root_path.display(), threads = config.threads, "starting scan");

        let walk = Arc::new(Walk {
            config: config.clone(),
            visited: InodeTracker::new(),
            hardlinks: InodeTracker::new(),
            progress: ProgressTracker::new(&root_path, config.progress_interval),
            progress_tx: self.progress_tx.clone(),
            cancel: cancel.clone(),
        });
        if let Some(info) = inode_of(&root_metadata) {
            walk.visited.track(info);
        }

        // A pool per scan; 0 threads lets rayon pick.
        let shared = Arc::clone(&walk);
        let walker = WalkDirGeneric::<WalkState>::new(&root_path)
            .parallelism(Parallelism::RayonNewPool(config.threads))
            .skip_hidden(false)
            .follow_links(false)
            .sort(false)
            .process_read_dir(move |depth, dir, _, children| {
                shared.read_dir(depth, dir, children)
            });

        let mut listings: HashMap<PathBuf, Listing> = HashMap::new();
        let mut warnings = Vec::new();

        for item in walker {
            if cancel.is_cancelled() {
                debug!(root = %root_path.display(), "scan cancelled");
                return Err(ScanError::Interrupted);
            }

            let mut dir_entry = match item {
                Ok(dir_entry) => dir_entry,
                Err(err) => {
                    if let Some(path) = err.path() {
                        mark_unreadable(&mut listings, &mut warnings, path, &err);
                    }
                    continue;
                }
            };

            if let Some(err) = dir_entry.read_children_error.take() {
                mark_unreadable(&mut listings, &mut warnings, &dir_entry.path(), &err);
            }

            let visit = std::mem::take(&mut dir_entry.client_state);
            warnings.extend(visit.warning);
            // The root itself carries no visit.
            let Some(entry) = visit.entry else { continue };
            let parent = entry.path.parent().map(Path::to_path_buf).unwrap_or_default();
            listings.entry(parent).or_default().children.push(Pending {
                entry,
                descend: visit.descend,
            });
        }

        if cancel.is_cancelled() {
            debug!(root = %root_path.display(), "scan cancelled");
            return Err(ScanError::Interrupted);
        }

        let mut root = Entry::new_directory(&root_path, modified_of(&root_metadata));
        root.inode = inode_of(&root_metadata);
        root.hidden = is_hidden(&root.name, &root_metadata);

        let mut stats = TreeStats::new();
        let root = assemble(root, &mut listings, &mut stats).ok_or_else(|| {
            ScanError::NotFound {
                path: root_path.clone(),
            }
        })?;

        let scan_duration = start.elapsed();
        debug!(
            root = %root_path.display(),
            files = stats.total_files,
            dirs = stats.total_dirs,
            errors = stats.total_errors,
            elapsed_ms = scan_duration.as_millis() as u64,
            "scan finished"
        );

        Ok(Snapshot::new(root, stats, scan_duration, warnings))
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// What the worker that listed an entry decided about it.
#[derive(Debug, Default)]
struct Visit {
    entry: Option<Entry>,
    descend: bool,
    warning: Option<ScanWarning>,
}

impl Visit {
    fn leaf(entry: Entry) -> Self {
        Self {
            entry: Some(entry),
            descend: false,
            warning: None,
        }
    }

    fn with_warning(mut self, warning: ScanWarning) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// A child recorded while walking, before the tree is assembled.
struct Pending {
    entry: Entry,
    descend: bool,
}

/// Children of one directory in listing order.
#[derive(Default)]
struct Listing {
    children: Vec<Pending>,
    error: Option<EntryError>,
}

/// Record that `dir` could not be listed. Only the first failure counts.
fn mark_unreadable(
    listings: &mut HashMap<PathBuf, Listing>,
    warnings: &mut Vec<ScanWarning>,
    dir: &Path,
    err: &jwalk::Error,
) {
    let listing = listings.entry(dir.to_path_buf()).or_default();
    if listing.error.is_some() {
        return;
    }

    let error = err
        .io_error()
        .map(EntryError::from_io)
        .unwrap_or(EntryError::IoTransient);
    listing.error = Some(error);
    if error == EntryError::NotFound {
        return;
    }

    warn!(path = %dir.display(), error = %err, "cannot list directory");
    warnings.push(match err.io_error() {
        Some(io) => ScanWarning::from_io(dir, io),
        None => ScanWarning::new(dir, err.to_string(), WarningKind::ReadError),
    });
}

/// State shared by every worker of one scan.
struct Walk {
    config: ScanConfig,
    visited: InodeTracker,
    hardlinks: InodeTracker,
    progress: ProgressTracker,
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
}

impl Walk {
    /// `process_read_dir` hook: classify the children of `dir`.
    fn read_dir(
        &self,
        depth: Option<usize>,
        dir: &Path,
        children: &mut Vec<jwalk::Result<WalkEntry>>,
    ) {
        // No depth means jwalk is handing over the root entry itself.
        let Some(depth) = depth else { return };
        if self.cancel.is_cancelled() {
            children.clear();
            return;
        }

        let child_depth = depth as u32 + 1;
        let mut tally = TreeStats::new();
        children.retain_mut(|child| match child {
            Ok(child) => self.visit(child, child_depth, &mut tally),
            Err(_) => true,
        });

        self.progress
            .record_files(tally.total_files, tally.total_size);
        self.progress.record_errors(tally.total_errors);
        self.progress.finish_dir(dir, &self.progress_tx);
    }

    /// Classify one child. Returns `false` if it vanished and should be
    /// dropped from the listing.
    fn visit(&self, child: &mut WalkEntry, depth: u32, tally: &mut TreeStats) -> bool {
        let path = child.path();

        // Does not traverse symlinks.
        let visit = match fs::symlink_metadata(&path) {
            Ok(metadata) => self.classify(path, &metadata),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return false,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read metadata");
                let kind = if child.file_type().is_dir() {
                    EntryKind::Directory {
                        file_count: 0,
                        dir_count: 0,
                    }
                } else {
                    EntryKind::File
                };
                let warning = ScanWarning::from_io(&path, &err);
                let entry =
                    Entry::leaf(path, kind, 0, UNIX_EPOCH).with_error(EntryError::from_io(&err));
                Visit::leaf(entry).with_warning(warning)
            }
        };

        if let Some(entry) = &visit.entry {
            if entry.has_error() {
                tally.record_error();
            } else if entry.is_file() {
                tally.record_file(entry.size, depth);
            }
        }

        child.read_children_path = match (&visit.entry, visit.descend) {
            (Some(entry), true) => Some(Arc::from(entry.path.as_path())),
            _ => None,
        };
        child.client_state = visit;
        true
    }

    fn classify(&self, path: PathBuf, metadata: &Metadata) -> Visit {
        let file_type = metadata.file_type();
        if file_type.is_dir() {
            self.directory(path, metadata)
        } else if file_type.is_symlink() {
            self.symlink(path, metadata)
        } else if file_type.is_file() {
            self.file(path, metadata, false)
        } else {
            let mut entry = Entry::leaf(
                path,
                EntryKind::Other,
                self.size_of(metadata),
                modified_of(metadata),
            );
            entry.hidden = is_hidden(&entry.name, metadata);
            Visit::leaf(entry)
        }
    }

    /// Record a directory and let jwalk descend into it, unless it was
    /// already entered during this scan.
    fn directory(&self, path: PathBuf, metadata: &Metadata) -> Visit {
        let mut entry = Entry::new_directory(path, modified_of(metadata));
        entry.hidden = is_hidden(&entry.name, metadata);
        entry.inode = inode_of(metadata);

        if let Some(info) = entry.inode {
            if !self.visited.track(info) {
                warn!(path = %entry.path.display(), "directory already visited, skipping");
                let warning = ScanWarning::cycle(&entry.path);
                return Visit::leaf(entry.with_error(EntryError::CycleDetected))
                    .with_warning(warning);
            }
        }

        Visit {
            entry: Some(entry),
            descend: true,
            warning: None,
        }
    }

    fn file(&self, path: PathBuf, metadata: &Metadata, via_link: bool) -> Visit {
        let inode = inode_of(metadata);
        let mut size = self.size_of(metadata);
        if self.config.count_hardlinks_once && (via_link || get_nlink(metadata) > 1) {
            if let Some(info) = inode {
                if !self.hardlinks.track(info) {
                    size = 0;
                }
            }
        }

        let mut entry = Entry::new_file(path, size, modified_of(metadata));
        entry.hidden = is_hidden(&entry.name, metadata);
        entry.inode = inode;
        Visit::leaf(entry)
    }

    fn symlink(&self, path: PathBuf, metadata: &Metadata) -> Visit {
        let target = fs::read_link(&path)
            .map(|p| CompactString::new(p.to_string_lossy()))
            .unwrap_or_default();

        let resolved = match fs::metadata(&path) {
            Ok(resolved) => resolved,
            Err(_) => {
                let warning = ScanWarning::broken_symlink(&path, &target);
                let mut entry = Entry::leaf(
                    path,
                    EntryKind::Symlink {
                        target,
                        broken: true,
                    },
                    0,
                    modified_of(metadata),
                )
                .with_error(EntryError::NotFound);
                entry.hidden = is_hidden(&entry.name, metadata);
                return Visit::leaf(entry).with_warning(warning);
            }
        };

        if self.config.follow_symlinks {
            if resolved.is_dir() {
                return self.directory(path, &resolved);
            }
            if resolved.is_file() {
                return self.file(path, &resolved, true);
            }
        }

        let mut entry = Entry::leaf(
            path,
            EntryKind::Symlink {
                target,
                broken: false,
            },
            self.size_of(metadata),
            modified_of(metadata),
        );
        entry.hidden = is_hidden(&entry.name, metadata);
        Visit::leaf(entry)
    }

    fn size_of(&self, metadata: &Metadata) -> u64 {
        match self.config.size_mode {
            SizeMode::Apparent => metadata.len(),
            SizeMode::Allocated => get_blocks(metadata) * 512,
        }
    }
}

/// Open frame of the assembly stack.
struct Frame {
    entry: Entry,
    pending: std::vec::IntoIter<Pending>,
}

impl Frame {
    /// `None` if the directory vanished before it could be listed.
    fn open(mut entry: Entry, listings: &mut HashMap<PathBuf, Listing>) -> Option<Self> {
        let listing = listings.remove(&entry.path).unwrap_or_default();
        match listing.error {
            Some(EntryError::NotFound) => return None,
            Some(error) => entry = entry.with_error(error),
            None => {}
        }
        entry.children.reserve(listing.children.len());
        Some(Self {
            entry,
            pending: listing.children.into_iter(),
        })
    }
}

/// Fold listings into a tree, children before parents, tallying `stats`
/// from the entries that end up in it.
fn assemble(
    root: Entry,
    listings: &mut HashMap<PathBuf, Listing>,
    stats: &mut TreeStats,
) -> Option<Entry> {
    let mut stack = vec![Frame::open(root, listings)?];

    loop {
        let depth = stack.len() as u32;
        let frame = stack.last_mut()?;
        match frame.pending.next() {
            Some(child) if child.descend => {
                if let Some(opened) = Frame::open(child.entry, listings) {
                    stack.push(opened);
                }
            }
            Some(child) => {
                record_leaf(stats, &child.entry, depth);
                frame.entry.children.push(Arc::new(child.entry));
            }
            None => {
                let done = stack.pop()?;
                let mut entry = done.entry;
                entry.update_totals();
                let Some(parent) = stack.last_mut() else {
                    return Some(entry);
                };
                stats.record_dir(depth - 1);
                if entry.has_error() {
                    stats.record_error();
                }
                parent.entry.children.push(Arc::new(entry));
            }
        }
    }
}

fn record_leaf(stats: &mut TreeStats, entry: &Entry, depth: u32) {
    if entry.has_error() {
        stats.record_error();
    }
    match entry.kind {
        EntryKind::File if !entry.has_error() => stats.record_file(entry.size, depth),
        EntryKind::Symlink { .. } => stats.record_symlink(entry.size),
        EntryKind::Other => stats.total_size += entry.size,
        _ => {}
    }
}

fn modified_of(metadata: &Metadata) -> SystemTime {
    metadata.modified().unwrap_or(UNIX_EPOCH)
}

#[cfg(windows)]
fn is_hidden(name: &str, metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    name.starts_with('.') || metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
fn is_hidden(name: &str, _metadata: &Metadata) -> bool {
    name.starts_with('.')
}

// Cross-platform metadata helpers

/// Get the `(inode, device)` pair from metadata.
#[cfg(unix)]
fn inode_of(metadata: &Metadata) -> Option<InodeInfo> {
    Some(InodeInfo::new(metadata.ino(), metadata.dev()))
}

#[cfg(not(unix))]
fn inode_of(_metadata: &Metadata) -> Option<InodeInfo> {
    None
}

/// Get the number of hard links from metadata.
#[cfg(unix)]
fn get_nlink(metadata: &Metadata) -> u64 {
    metadata.nlink()
}

#[cfg(not(unix))]
fn get_nlink(_metadata: &Metadata) -> u64 {
    1 // Assume single link on Windows
}

/// Get the number of 512-byte blocks from metadata.
#[cfg(unix)]
fn get_blocks(metadata: &Metadata) -> u64 {
    metadata.blocks()
}

#[cfg(not(unix))]
fn get_blocks(metadata: &Metadata) -> u64 {
    // Estimate blocks from file size (512-byte blocks, rounded up)
    metadata.len().div_ceil(512)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();
        fs::write(root.join(".hidden"), "secret").unwrap();

        temp
    }

    fn check_sizes(entry: &Entry) {
        if entry.is_dir() {
            let sum: u64 = entry.children.iter().map(|c| c.size).sum();
            assert_eq!(entry.size, sum, "{}", entry.path.display());
        }
        for child in entry.descendants() {
            if child.is_dir() {
                let sum: u64 = child.children.iter().map(|c| c.size).sum();
                assert_eq!(child.size, sum, "{}", child.path.display());
            }
        }
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let snapshot = TreeScanner::new().scan(&config).unwrap();

        assert_eq!(snapshot.stats.total_files, 5);
        assert_eq!(snapshot.stats.total_dirs, 3);
        assert_eq!(snapshot.root.size, 5 + 17 + 4 + 17 + 6);
        assert_eq!(snapshot.root.file_count(), 5);
        assert_eq!(snapshot.root.dir_count(), 3);
        check_sizes(&snapshot.root);
    }

    #[test]
    fn test_hidden_entries_are_kept() {
        let temp = create_test_tree();
        let snapshot = TreeScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();

        let hidden = snapshot
            .root
            .children
            .iter()
            .find(|c| c.name.as_str() == ".hidden")
            .unwrap();
        assert!(hidden.hidden);
        assert_eq!(hidden.size, 6);
    }

    #[test]
    fn test_single_thread_matches_parallel() {
        let temp = create_test_tree();
        let scanner = TreeScanner::new();

        let parallel = scanner.scan(&ScanConfig::new(temp.path())).unwrap();
        let mut config = ScanConfig::new(temp.path());
        config.threads = 1;
        let serial = scanner.scan(&config).unwrap();

        assert_eq!(parallel.root.size, serial.root.size);
        assert_eq!(parallel.stats, serial.stats);
    }

    #[test]
    fn test_root_errors() {
        let temp = create_test_tree();
        let scanner = TreeScanner::new();

        let missing = scanner.scan(&ScanConfig::new(temp.path().join("nope")));
        assert!(matches!(missing, Err(ScanError::NotFound { .. })));

        let file = scanner.scan(&ScanConfig::new(temp.path().join("file1.txt")));
        assert!(matches!(file, Err(ScanError::NotADirectory { .. })));
    }

    #[test]
    fn test_cancelled_scan_yields_nothing() {
        let temp = create_test_tree();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = TreeScanner::new().scan_with_cancel(&ScanConfig::new(temp.path()), &cancel);
        assert!(matches!(result, Err(ScanError::Interrupted)));
    }

    #[test]
    fn test_progress_updates() {
        let temp = create_test_tree();
        let scanner = TreeScanner::new();
        let mut rx = scanner.subscribe();

        let mut config = ScanConfig::new(temp.path());
        config.progress_interval = 1;
        scanner.scan(&config).unwrap();

        let mut updates = 0;
        while rx.try_recv().is_ok() {
            updates += 1;
        }
        // root + dir1 + dir2 + subdir
        assert_eq!(updates, 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_ancestor_is_not_followed() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("dir1/loop")).unwrap();

        let snapshot = TreeScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();
        let link = snapshot
            .entry(&snapshot.root_path.join("dir1/loop"))
            .unwrap();
        assert!(link.is_symlink());
        assert!(link.children.is_empty());
        check_sizes(&snapshot.root);
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_symlink_cycle_is_cut() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("dir1/loop")).unwrap();

        let mut config = ScanConfig::new(temp.path());
        config.follow_symlinks = true;
        let snapshot = TreeScanner::new().scan(&config).unwrap();

        let link = snapshot
            .entry(&snapshot.root_path.join("dir1/loop"))
            .unwrap();
        assert_eq!(link.error, Some(EntryError::CycleDetected));
        assert_eq!(link.size, 0);
        assert_eq!(snapshot.root.size, 5 + 17 + 4 + 17 + 6);
        check_sizes(&snapshot.root);
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_symlink_lists_under_link_path() {
        let temp = create_test_tree();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("far.bin"), vec![0u8; 64]).unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("dir2/link")).unwrap();

        let mut config = ScanConfig::new(temp.path());
        config.follow_symlinks = true;
        let snapshot = TreeScanner::new().scan(&config).unwrap();

        let far = snapshot
            .entry(&snapshot.root_path.join("dir2/link/far.bin"))
            .unwrap();
        assert_eq!(far.size, 64);
        assert_eq!(snapshot.root.size, 5 + 17 + 4 + 17 + 6 + 64);
        check_sizes(&snapshot.root);
    }

    #[test]
    fn test_vanished_directory_is_dropped() {
        let epoch = SystemTime::UNIX_EPOCH;
        let pending = |entry: Entry, descend| Pending { entry, descend };

        let mut listings: HashMap<PathBuf, Listing> = HashMap::new();
        listings.insert(
            PathBuf::from("/r"),
            Listing {
                children: vec![
                    pending(Entry::new_directory("/r/gone", epoch), true),
                    pending(Entry::new_directory("/r/locked", epoch), true),
                    pending(Entry::new_file("/r/kept.txt", 10, epoch), false),
                ],
                error: None,
            },
        );
        listings.insert(
            PathBuf::from("/r/gone"),
            Listing {
                children: Vec::new(),
                error: Some(EntryError::NotFound),
            },
        );
        listings.insert(
            PathBuf::from("/r/locked"),
            Listing {
                children: Vec::new(),
                error: Some(EntryError::PermissionDenied),
            },
        );

        let mut stats = TreeStats::new();
        let root = assemble(Entry::new_directory("/r", epoch), &mut listings, &mut stats).unwrap();

        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["locked", "kept.txt"]);
        assert_eq!(root.size, 10);
        assert_eq!(stats.total_dirs, 1);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_errors, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling"))
            .unwrap();

        let snapshot = TreeScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();
        let link = snapshot
            .entry(&snapshot.root_path.join("dangling"))
            .unwrap();
        assert!(matches!(link.kind, EntryKind::Symlink { broken: true, .. }));
        assert_eq!(link.error, Some(EntryError::NotFound));
        assert_eq!(link.size, 0);
        assert!(snapshot.has_warnings());
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlinks_counted_once() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), vec![0u8; 100]).unwrap();
        fs::hard_link(temp.path().join("a"), temp.path().join("b")).unwrap();

        let snapshot = TreeScanner::new()
            .scan(&ScanConfig::new(temp.path()))
            .unwrap();
        assert_eq!(snapshot.root.size, 100);

        let mut config = ScanConfig::new(temp.path());
        config.count_hardlinks_once = false;
        let snapshot = TreeScanner::new().scan(&config).unwrap();
        assert_eq!(snapshot.root.size, 200);
    }
}
