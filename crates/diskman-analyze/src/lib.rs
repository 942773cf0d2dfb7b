//! Analysis over scanned trees for diskman.
//!
//! Nothing in this crate walks the filesystem itself; it works on entries
//! handed out by the snapshot cache.
//!
//! - **Listing queries** - filter, sort and paginate a directory's children
//! - **Deep search** - lazy recursive name search
//! - **Duplicate detection** - find identical files using BLAKE3 hashing
//! - **Statistics** - extension breakdown, largest files, age buckets
//!
//! # Listing
//!
//! ```rust,no_run
//! use diskman_analyze::{query, QueryConfig, SortKey};
//! use diskman_scan::SnapshotCache;
//!
//! let cache = SnapshotCache::default();
//! let dir = cache.open("/path/to/scan").unwrap();
//!
//! let config = QueryConfig::builder()
//!     .sort_key(SortKey::Name)
//!     .page_size(10usize)
//!     .build()
//!     .unwrap();
//! for entry in query(&dir, &config).entries {
//!     println!("{} {}", entry.size, entry.name);
//! }
//! ```
//!
//! # Duplicate Detection
//!
//! Files are grouped by size first; only same-size files are hashed.
//!
//! ```rust,no_run
//! use diskman_analyze::DuplicateFinder;
//! use diskman_scan::SnapshotCache;
//!
//! let cache = SnapshotCache::default();
//! let snapshot = cache.get_or_scan("/path/to/scan").unwrap();
//!
//! let report = DuplicateFinder::new().find_duplicates(&snapshot.root);
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//! ```

pub mod age;
mod duplicates;
mod query;
mod search;
mod stats;

pub use age::{AgeCategory, AgeStats, age_breakdown, format_age};
pub use duplicates::{DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup, DuplicateReport};
pub use query::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, QueryConfig, QueryConfigBuilder, QueryPage,
    SortDirection, SortKey, filter_children, query, sort_entries,
};
pub use search::{DeepSearch, deep_search};
pub use stats::{ExtensionStats, NO_EXTENSION, extension_breakdown, largest_files};

// Re-export core types
pub use diskman_core::{ContentHash, Entry};
