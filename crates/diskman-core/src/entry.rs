//! File and directory entry types.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// BLAKE3 content hash for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Inode information for hardlink and cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Inode number.
    pub inode: u64,
    /// Device ID.
    pub device: u64,
}

impl InodeInfo {
    /// Create new inode info.
    pub fn new(inode: u64, device: u64) -> Self {
        Self { inode, device }
    }
}

/// Type of file system entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory {
        /// Total number of files in this subtree.
        file_count: u64,
        /// Total number of directories in this subtree.
        dir_count: u64,
    },
    /// Symbolic link, kept as a leaf.
    Symlink {
        /// Link target path.
        target: CompactString,
        /// Whether the link target exists.
        broken: bool,
    },
    /// Other file types (sockets, devices, etc.).
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory { .. })
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink { .. })
    }
}

/// A single file or directory as seen by one scan.
///
/// Entries are immutable once built. Children are shared behind [`Arc`] so a
/// sub-entry can be handed out (navigation, search results) without copying
/// its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path.
    pub path: PathBuf,

    /// File/directory name (last path component).
    pub name: CompactString,

    /// Entry type and associated metadata.
    pub kind: EntryKind,

    /// Size in bytes (aggregate for directories).
    pub size: u64,

    /// Last modification time (`UNIX_EPOCH` when unknown).
    pub modified: SystemTime,

    /// Hidden by platform convention. Never used to exclude at scan time.
    pub hidden: bool,

    /// Set when the entry could not be fully read.
    pub error: Option<EntryError>,

    /// Inode info, when the platform provides it.
    pub inode: Option<InodeInfo>,

    /// Children (directories only), in directory-listing order.
    pub children: Vec<Arc<Entry>>,
}

impl Entry {
    /// Create a new file entry.
    pub fn new_file(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        Self::leaf(path.into(), EntryKind::File, size, modified)
    }

    /// Create a new, empty directory entry.
    pub fn new_directory(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self::leaf(
            path.into(),
            EntryKind::Directory {
                file_count: 0,
                dir_count: 0,
            },
            0,
            modified,
        )
    }

    /// Create a childless entry of any kind.
    pub fn leaf(path: PathBuf, kind: EntryKind, size: u64, modified: SystemTime) -> Self {
        let name = name_of(&path);
        Self {
            hidden: name.starts_with('.'),
            name,
            path,
            kind,
            size,
            modified,
            error: None,
            inode: None,
            children: Vec::new(),
        }
    }

    /// Mark this entry as failed. Failed entries never contribute bytes.
    pub fn with_error(mut self, error: EntryError) -> Self {
        self.error = Some(error);
        self.size = 0;
        self
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this entry is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }

    /// Whether the scan recorded a failure for this entry.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Get file count for directories, 1 for files.
    pub fn file_count(&self) -> u64 {
        match &self.kind {
            EntryKind::Directory { file_count, .. } => *file_count,
            EntryKind::File => 1,
            _ => 0,
        }
    }

    /// Get directory count for directories.
    pub fn dir_count(&self) -> u64 {
        match &self.kind {
            EntryKind::Directory { dir_count, .. } => *dir_count,
            _ => 0,
        }
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Direct child with the given file name.
    pub fn child(&self, name: &OsStr) -> Option<&Arc<Entry>> {
        self.children
            .iter()
            .find(|c| c.path.file_name() == Some(name))
    }

    /// Locate a descendant (or this entry) by absolute path.
    pub fn find(self: &Arc<Self>, path: &Path) -> Option<Arc<Entry>> {
        let relative = path.strip_prefix(&self.path).ok()?;
        let mut current = Arc::clone(self);
        for component in relative.components() {
            let next = Arc::clone(current.child(component.as_os_str())?);
            current = next;
        }
        Some(current)
    }

    /// Pre-order iterator over all descendants (not including `self`).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().map(Arc::as_ref).collect(),
        }
    }

    /// Build a copy of this tree with the descendant at `target` removed.
    ///
    /// Every ancestor of the removed entry gets its size and counts reduced;
    /// untouched subtrees are shared with `self`. Returns `None` when
    /// `target` is not a strict descendant.
    pub fn without(&self, target: &Path) -> Option<Entry> {
        let relative = target.strip_prefix(&self.path).ok()?;
        let names: Vec<&OsStr> = relative.components().map(|c| c.as_os_str()).collect();
        let (last, parents) = names.split_last()?;

        let mut chain: Vec<&Entry> = vec![self];
        let mut cursor: &Entry = self;
        for name in parents {
            cursor = Arc::as_ref(cursor.child(name)?);
            chain.push(cursor);
        }
        let removed = cursor.child(last)?;
        let (bytes, files, dirs) = (
            removed.size,
            removed.file_count(),
            removed.dir_count() + u64::from(removed.is_dir()),
        );

        let mut replacement: Option<Entry> = None;
        for (ancestor, name) in chain.iter().zip(names.iter()).rev() {
            let mut rebuilt = (*ancestor).clone();
            match replacement.take() {
                Some(child) => {
                    if let Some(slot) = rebuilt
                        .children
                        .iter_mut()
                        .find(|c| c.path.file_name() == Some(*name))
                    {
                        *slot = Arc::new(child);
                    }
                }
                None => rebuilt
                    .children
                    .retain(|c| c.path.file_name() != Some(*name)),
            }
            rebuilt.size = rebuilt.size.saturating_sub(bytes);
            if let EntryKind::Directory {
                ref mut file_count,
                ref mut dir_count,
            } = rebuilt.kind
            {
                *file_count = file_count.saturating_sub(files);
                *dir_count = dir_count.saturating_sub(dirs);
            }
            replacement = Some(rebuilt);
        }
        replacement
    }

    /// Recompute size and counts from the direct children.
    pub fn update_totals(&mut self) {
        if let EntryKind::Directory {
            ref mut file_count,
            ref mut dir_count,
        } = self.kind
        {
            *file_count = 0;
            *dir_count = 0;
            let mut size = 0u64;

            for child in &self.children {
                size += child.size;
                match &child.kind {
                    EntryKind::File => *file_count += 1,
                    EntryKind::Directory {
                        file_count: fc,
                        dir_count: dc,
                    } => {
                        *file_count += fc;
                        *dir_count += dc + 1;
                    }
                    _ => {}
                }
            }

            if self.error.is_none() {
                self.size = size;
            }
        }
    }
}

/// Pre-order walk over an entry's descendants using an explicit stack.
pub struct Descendants<'a> {
    stack: Vec<&'a Entry>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.stack
            .extend(entry.children.iter().rev().map(Arc::as_ref));
        Some(entry)
    }
}

fn name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}
