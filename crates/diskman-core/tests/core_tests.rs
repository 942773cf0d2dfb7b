use diskman_core::{
    ContentHash, Entry, EntryError, EntryKind, InodeInfo, ScanConfig, ScanError, SizeMode,
    Snapshot, TreeStats,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn file(path: &str, size: u64) -> Entry {
    Entry::new_file(path, size, SystemTime::UNIX_EPOCH)
}

fn dir(path: &str, children: Vec<Entry>) -> Entry {
    let mut entry = Entry::new_directory(path, SystemTime::UNIX_EPOCH);
    entry.children = children.into_iter().map(Arc::new).collect();
    entry.update_totals();
    entry
}

fn assert_sizes_consistent(entry: &Entry) {
    for node in std::iter::once(entry).chain(entry.descendants()) {
        if node.is_dir() && node.error.is_none() {
            let sum: u64 = node.children.iter().map(|c| c.size).sum();
            assert_eq!(node.size, sum, "size mismatch at {}", node.path.display());
        }
    }
}

#[test]
fn test_content_hash_creation_and_hex() {
    let bytes = [0xab; 32];
    let hash = ContentHash::new(bytes);

    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(hex.starts_with("ab"));

    assert_eq!(hash, ContentHash::new(bytes));
    assert_ne!(hash, ContentHash::new([0xcd; 32]));
}

#[test]
fn test_inode_info() {
    let inode1 = InodeInfo::new(12345, 67890);
    assert_eq!(inode1.inode, 12345);
    assert_eq!(inode1.device, 67890);
    assert_eq!(inode1, InodeInfo::new(12345, 67890));
}

#[test]
fn test_entry_kind_discrimination() {
    assert!(EntryKind::File.is_file());
    assert!(!EntryKind::File.is_dir());

    let dir_kind = EntryKind::Directory {
        file_count: 10,
        dir_count: 5,
    };
    assert!(dir_kind.is_dir());
    assert!(!dir_kind.is_symlink());

    let link = EntryKind::Symlink {
        target: "target/path".into(),
        broken: false,
    };
    assert!(link.is_symlink());
    assert!(!link.is_file());

    assert!(!EntryKind::Other.is_file());
    assert!(!EntryKind::Other.is_dir());
}

#[test]
fn test_nested_directory_totals() {
    let root = dir(
        "/root",
        vec![
            dir("/root/dir1", vec![file("/root/dir1/file1.txt", 512)]),
            dir(
                "/root/dir2",
                vec![
                    file("/root/dir2/file2.txt", 1024),
                    dir("/root/dir2/empty", vec![]),
                ],
            ),
            file("/root/.hidden", 3),
        ],
    );

    assert_eq!(root.size, 1539);
    assert_eq!(root.file_count(), 3);
    assert_eq!(root.dir_count(), 3);
    assert_sizes_consistent(&root);

    // listing order is preserved, nothing is sorted here
    let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["dir1", "dir2", ".hidden"]);
}

#[test]
fn test_error_entries_contribute_nothing() {
    let blocked = dir("/root/blocked", vec![]).with_error(EntryError::PermissionDenied);
    let root = dir("/root", vec![blocked, file("/root/ok", 8)]);
    assert_eq!(root.size, 8);
    assert_sizes_consistent(&root);
}

#[test]
fn test_without_keeps_invariant() {
    let root = dir(
        "/root",
        vec![
            dir(
                "/root/a",
                vec![dir("/root/a/b", vec![file("/root/a/b/big", 100)])],
            ),
            file("/root/small", 1),
        ],
    );

    let pruned = root.without(Path::new("/root/a/b/big")).unwrap();
    assert_eq!(pruned.size, 1);
    assert_eq!(pruned.file_count(), 1);
    assert_eq!(pruned.dir_count(), 2);
    assert_sizes_consistent(&pruned);

    // original untouched
    assert_eq!(root.size, 101);
    assert!(root.without(Path::new("/root/nope")).is_none());
}

#[test]
fn test_scan_config_builder() {
    let config = ScanConfig::builder()
        .root("/test/path")
        .follow_symlinks(true)
        .count_hardlinks_once(false)
        .size_mode(SizeMode::Allocated)
        .build()
        .unwrap();

    assert_eq!(config.root.to_str().unwrap(), "/test/path");
    assert!(config.follow_symlinks);
    assert!(!config.count_hardlinks_once);
    assert_eq!(config.size_mode, SizeMode::Allocated);

    let default_config = ScanConfig::new("/default");
    assert!(!default_config.follow_symlinks);
    assert!(default_config.count_hardlinks_once);
    assert_eq!(default_config.progress_interval, 256);
}

#[test]
fn test_snapshot_navigation() {
    let root = dir(
        "/data",
        vec![dir("/data/photos", vec![file("/data/photos/cat.jpg", 42)])],
    );
    let snapshot = Snapshot::new(root, TreeStats::new(), Duration::from_millis(5), Vec::new());

    let photos = snapshot.entry(Path::new("/data/photos")).unwrap();
    assert_eq!(photos.size, 42);
    assert!(Arc::ptr_eq(&photos, &snapshot.root.children[0]));
    assert_eq!(snapshot.total_files(), 1);
    assert_eq!(snapshot.total_dirs(), 1);
    assert_eq!(snapshot.epoch, 0);
}

#[test]
fn test_scan_error_display() {
    let err = ScanError::NotFound {
        path: "/missing".into(),
    };
    assert_eq!(err.to_string(), "Path not found: /missing");
    assert!(ScanError::Interrupted.is_interrupted());
}

#[test]
fn test_entry_serializes() {
    let root = dir("/r", vec![file("/r/a.txt", 1)]);
    let json = serde_json::to_string(&root).unwrap();
    let back: Entry = serde_json::from_str(&json).unwrap();
    assert_eq!(back.size, 1);
    assert_eq!(back.children[0].name.as_str(), "a.txt");
}
