//! Duplicate file detection using content hashing.
//!
//! 1. Collect files from an already-scanned tree and group them by size
//! 2. Optionally drop candidates whose head and tail differ
//! 3. Compute the full BLAKE3 hash of every remaining candidate
//!
//! Only byte-identical files end up in the same group; sizes are compared
//! before any file is opened.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use blake3::Hasher;
use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use diskman_core::{ContentHash, Entry};

/// Files above this size are hashed with blake3's multi-threaded mmap path.
const PARALLEL_HASH_THRESHOLD: u64 = 128 * 1024;

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Minimum file size to consider. The default skips empty files.
    #[builder(default = "1")]
    pub min_size: u64,

    /// Maximum file size to consider.
    #[builder(default = "u64::MAX")]
    pub max_size: u64,

    /// Compare head and tail bytes before computing full hashes.
    #[builder(default = "false")]
    pub quick_compare: bool,

    /// Number of bytes for partial hash from start of file.
    #[builder(default = "4096")]
    pub partial_hash_head: usize,

    /// Number of bytes for partial hash from end of file.
    #[builder(default = "4096")]
    pub partial_hash_tail: usize,

    /// Substrings of paths to leave out.
    #[builder(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: u64::MAX,
            quick_compare: false,
            partial_hash_head: 4096,
            partial_hash_tail: 4096,
            exclude_patterns: Vec::new(),
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of files with identical content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Paths of the identical files, sorted.
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    fn new(hash: ContentHash, size: u64, mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        let wasted_bytes = size * (paths.len() as u64 - 1);
        Self {
            hash,
            size,
            paths,
            wasted_bytes,
        }
    }

    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Files that could go if one copy is kept.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups, largest waste first.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Files that passed the size filters.
    pub files_analyzed: u64,

    /// Files that could not be opened while hashing.
    pub files_skipped: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }
}

/// Duplicate file finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self {
            config: DuplicateConfig::default(),
        }
    }

    /// Create a new duplicate finder with custom config.
    pub fn with_config(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Find duplicates among the files below `root`.
    ///
    /// Files are read from disk for hashing; files that vanished or became
    /// unreadable since the scan are skipped.
    pub fn find_duplicates(&self, root: &Entry) -> DuplicateReport {
        let files = self.collect_files(root);
        let files_analyzed = files.len() as u64;

        let size_groups = group_by_size(files);
        debug!(
            candidates = size_groups.values().map(Vec::len).sum::<usize>(),
            sizes = size_groups.len(),
            "hashing duplicate candidates"
        );

        let results: Vec<(Vec<DuplicateGroup>, u64)> = size_groups
            .into_par_iter()
            .map(|(size, paths)| {
                if self.config.quick_compare {
                    self.find_in_size_group_partial(size, paths)
                } else {
                    self.find_in_size_group_full(size, paths)
                }
            })
            .collect();

        let files_skipped: u64 = results.iter().map(|(_, skipped)| skipped).sum();
        let mut groups: Vec<DuplicateGroup> =
            results.into_iter().flat_map(|(groups, _)| groups).collect();

        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then(b.size.cmp(&a.size))
                .then_with(|| a.paths.first().cmp(&b.paths.first()))
        });

        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        let total_duplicate_size: u64 = groups.iter().map(|g| g.size * g.paths.len() as u64).sum();
        let total_wasted_space: u64 = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates: u64 = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();

        DuplicateReport {
            groups,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed,
            files_skipped,
            files_with_duplicates,
            group_count,
        }
    }

    /// Regular, readable files inside the size bounds.
    fn collect_files(&self, root: &Entry) -> Vec<(PathBuf, u64)> {
        std::iter::once(root)
            .chain(root.descendants())
            .filter(|e| e.is_file() && !e.has_error())
            .filter(|e| e.size >= self.config.min_size && e.size <= self.config.max_size)
            .filter(|e| {
                let path = e.path.to_string_lossy();
                !self
                    .config
                    .exclude_patterns
                    .iter()
                    .any(|p| path.contains(p.as_str()))
            })
            .map(|e| (e.path.clone(), e.size))
            .collect()
    }

    /// Narrow a size group by partial hash, then confirm with full hashes.
    fn find_in_size_group_partial(&self, size: u64, paths: Vec<PathBuf>) -> (Vec<DuplicateGroup>, u64) {
        let partial: Vec<(PathBuf, Option<[u8; 32]>)> = paths
            .into_par_iter()
            .map(|path| {
                let hash = self.compute_partial_hash(&path);
                (path, hash)
            })
            .collect();

        let mut skipped = 0;
        let mut buckets: HashMap<[u8; 32], Vec<PathBuf>> = HashMap::new();
        for (path, hash) in partial {
            match hash {
                Some(h) => buckets.entry(h).or_default().push(path),
                None => skipped += 1,
            }
        }

        let mut groups = Vec::new();
        for candidates in buckets.into_values().filter(|c| c.len() > 1) {
            let (found, missed) = self.find_in_size_group_full(size, candidates);
            groups.extend(found);
            skipped += missed;
        }
        (groups, skipped)
    }

    /// Group a size group by full content hash.
    fn find_in_size_group_full(&self, size: u64, paths: Vec<PathBuf>) -> (Vec<DuplicateGroup>, u64) {
        let hashes: Vec<(PathBuf, Option<ContentHash>)> = paths
            .into_par_iter()
            .map(|path| {
                let hash = compute_full_hash(&path, size);
                (path, hash)
            })
            .collect();

        let mut skipped = 0;
        let mut by_hash: HashMap<ContentHash, Vec<PathBuf>> = HashMap::new();
        for (path, hash) in hashes {
            match hash {
                Some(h) => by_hash.entry(h).or_default().push(path),
                None => skipped += 1,
            }
        }

        let groups = by_hash
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(hash, paths)| DuplicateGroup::new(hash, size, paths))
            .collect();
        (groups, skipped)
    }

    /// Hash of the first and last bytes of a file plus its length.
    fn compute_partial_hash(&self, path: &Path) -> Option<[u8; 32]> {
        let mut file = open_for_hashing(path)?;
        let file_size = file.metadata().ok()?.len();

        let mut hasher = Hasher::new();

        let head_size = (self.config.partial_hash_head as u64).min(file_size);
        let mut head_buf = vec![0u8; head_size as usize];
        file.read_exact(&mut head_buf).ok()?;
        hasher.update(&head_buf);

        if file_size > head_size {
            let tail_size = (self.config.partial_hash_tail as u64).min(file_size - head_size);
            if tail_size > 0 {
                file.seek(SeekFrom::End(-(tail_size as i64))).ok()?;
                let mut tail_buf = vec![0u8; tail_size as usize];
                file.read_exact(&mut tail_buf).ok()?;
                hasher.update(&tail_buf);
            }
        }

        hasher.update(&file_size.to_le_bytes());
        Some(*hasher.finalize().as_bytes())
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn group_by_size(files: Vec<(PathBuf, u64)>) -> HashMap<u64, Vec<PathBuf>> {
    let mut groups: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    for (path, size) in files {
        groups.entry(size).or_default().push(path);
    }
    groups.retain(|_, v| v.len() > 1);
    groups
}

fn open_for_hashing(path: &Path) -> Option<File> {
    match File::open(path) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            None
        }
    }
}

/// Full BLAKE3 hash of a file, memory-mapped where blake3 decides it pays off.
fn compute_full_hash(path: &Path, size: u64) -> Option<ContentHash> {
    let mut hasher = Hasher::new();
    let result = if size > PARALLEL_HASH_THRESHOLD {
        hasher.update_mmap_rayon(path).map(|_| ())
    } else {
        hasher.update_mmap(path).map(|_| ())
    };

    match result {
        Ok(_) => Some(ContentHash::new(*hasher.finalize().as_bytes())),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            None
        }
    }
}
