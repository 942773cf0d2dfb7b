//! Filtering, sorting and pagination of a directory's children.
//!
//! Everything here works on an already-scanned [`Entry`]; changing the sort
//! key, the filter or the page never touches the disk.

use std::cmp::Ordering;
use std::sync::Arc;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use diskman_core::Entry;

/// Smallest page size the front end accepts.
pub const MIN_PAGE_SIZE: usize = 5;
/// Largest page size the front end accepts.
pub const MAX_PAGE_SIZE: usize = 50;
/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Column a listing is ordered by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortKey {
    #[default]
    Size,
    Name,
    Date,
}

impl SortKey {
    /// Next key in the size → name → date cycle.
    pub fn next(self) -> Self {
        match self {
            SortKey::Size => SortKey::Name,
            SortKey::Name => SortKey::Date,
            SortKey::Date => SortKey::Size,
        }
    }

    /// Direction used when none is requested: largest and newest first,
    /// names alphabetically.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortKey::Size | SortKey::Date => SortDirection::Descending,
            SortKey::Name => SortDirection::Ascending,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// What to show from a directory and in which order.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct QueryConfig {
    /// Case-insensitive substring the name must contain. Empty matches all.
    #[builder(default)]
    pub filter: String,

    #[builder(default)]
    pub sort_key: SortKey,

    /// Overrides the key's default direction.
    #[builder(default)]
    pub sort_direction: Option<SortDirection>,

    #[builder(default = "false")]
    pub show_hidden: bool,

    /// List directories before everything else.
    #[builder(default = "false")]
    pub dirs_first: bool,

    /// Entries per page; 0 is treated as 1.
    #[builder(default = "DEFAULT_PAGE_SIZE")]
    pub page_size: usize,

    /// Zero-based page; clamped to the last page.
    #[builder(default = "0")]
    pub page_index: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort_key: SortKey::default(),
            sort_direction: None,
            show_hidden: false,
            dirs_first: false,
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 0,
        }
    }
}

impl QueryConfig {
    /// Create a new config builder.
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    /// Direction actually applied.
    pub fn direction(&self) -> SortDirection {
        self.sort_direction
            .unwrap_or_else(|| self.sort_key.default_direction())
    }
}

/// One page of a directory listing.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Entries on this page, in display order.
    pub entries: Vec<Arc<Entry>>,
    /// Entries that passed the filters, across all pages.
    pub total_count: usize,
    /// Number of pages; 0 when nothing matched.
    pub page_count: usize,
    /// Page actually returned after clamping.
    pub page_index: usize,
}

impl QueryPage {
    /// Whether a later page exists.
    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }

    /// Whether an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }
}

/// Filter, sort and paginate the direct children of `entry`.
pub fn query(entry: &Entry, config: &QueryConfig) -> QueryPage {
    let mut matched = filter_children(entry, config);
    sort_entries(&mut matched, config.sort_key, config.direction(), config.dirs_first);

    let total_count = matched.len();
    let page_size = config.page_size.max(1);
    let page_count = total_count.div_ceil(page_size);
    let page_index = config.page_index.min(page_count.saturating_sub(1));

    let entries = matched
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .collect();

    QueryPage {
        entries,
        total_count,
        page_count,
        page_index,
    }
}

/// Children of `entry` that pass the name and hidden filters, unsorted.
pub fn filter_children(entry: &Entry, config: &QueryConfig) -> Vec<Arc<Entry>> {
    let needle = config.filter.to_lowercase();
    entry
        .children
        .iter()
        .filter(|child| config.show_hidden || !child.hidden)
        .filter(|child| needle.is_empty() || child.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stable sort by `key` in `direction`; ties fall back to name ascending.
pub fn sort_entries(
    entries: &mut [Arc<Entry>],
    key: SortKey,
    direction: SortDirection,
    dirs_first: bool,
) {
    entries.sort_by(|a, b| {
        let group = if dirs_first {
            b.is_dir().cmp(&a.is_dir())
        } else {
            Ordering::Equal
        };

        let primary = match key {
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Name => compare_names(a, b),
            SortKey::Date => a.modified.cmp(&b.modified),
        };
        let primary = match direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };

        group.then(primary).then_with(|| compare_names(a, b))
    });
}

fn compare_names(a: &Entry, b: &Entry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn file(name: &str, size: u64, age_days: u64) -> Entry {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000 - age_days * 86_400);
        Entry::new_file(format!("/r/{name}"), size, modified)
    }

    fn dir_of(children: Vec<Entry>) -> Entry {
        let mut root = Entry::new_directory("/r", SystemTime::UNIX_EPOCH);
        root.children = children.into_iter().map(Arc::new).collect();
        root.update_totals();
        root
    }

    fn names(page: &QueryPage) -> Vec<&str> {
        page.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_sort_by_size_and_name() {
        let root = dir_of(vec![file("b", 10, 0), file("a", 30, 0), file("c", 20, 0)]);

        let by_size = query(&root, &QueryConfig::default());
        assert_eq!(names(&by_size), vec!["a", "c", "b"]);

        let config = QueryConfig {
            sort_key: SortKey::Name,
            ..Default::default()
        };
        assert_eq!(names(&query(&root, &config)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_date_sort_newest_first() {
        let root = dir_of(vec![file("old", 1, 30), file("new", 1, 1), file("mid", 1, 10)]);
        let config = QueryConfig {
            sort_key: SortKey::Date,
            ..Default::default()
        };
        assert_eq!(names(&query(&root, &config)), vec!["new", "mid", "old"]);

        let config = QueryConfig {
            sort_key: SortKey::Date,
            sort_direction: Some(SortDirection::Ascending),
            ..Default::default()
        };
        assert_eq!(names(&query(&root, &config)), vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_ties_break_by_name() {
        let root = dir_of(vec![file("Zeta", 5, 0), file("alpha", 5, 0), file("Beta", 5, 0)]);
        let page = query(&root, &QueryConfig::default());
        assert_eq!(names(&page), vec!["alpha", "Beta", "Zeta"]);
    }

    #[test]
    fn test_filter_and_hidden() {
        let root = dir_of(vec![
            file("Report.PDF", 3, 0),
            file("report-old.pdf", 2, 0),
            file(".report.swp", 1, 0),
            file("photo.jpg", 9, 0),
        ]);

        let config = QueryConfig {
            filter: "REPORT".into(),
            ..Default::default()
        };
        let page = query(&root, &config);
        assert_eq!(names(&page), vec!["Report.PDF", "report-old.pdf"]);
        assert_eq!(page.total_count, 2);

        let config = QueryConfig {
            filter: "report".into(),
            show_hidden: true,
            ..Default::default()
        };
        assert_eq!(query(&root, &config).total_count, 3);
    }

    #[test]
    fn test_dirs_first() {
        let mut sub = Entry::new_directory("/r/sub", SystemTime::UNIX_EPOCH);
        sub.children.push(Arc::new(Entry::new_file("/r/sub/x", 1, SystemTime::UNIX_EPOCH)));
        sub.update_totals();
        let root = dir_of(vec![file("big", 100, 0), sub]);

        let config = QueryConfig {
            dirs_first: true,
            ..Default::default()
        };
        assert_eq!(names(&query(&root, &config)), vec!["sub", "big"]);
        assert_eq!(names(&query(&root, &QueryConfig::default())), vec!["big", "sub"]);
    }

    #[test]
    fn test_pagination() {
        let children = (0..12).map(|i| file(&format!("f{i:02}"), 100 - i, 0)).collect();
        let root = dir_of(children);

        let config = QueryConfig {
            page_size: 5,
            page_index: 2,
            ..Default::default()
        };
        let page = query(&root, &config);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.total_count, 12);
        assert_eq!(names(&page), vec!["f10", "f11"]);
        assert!(!page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_page_index_clamps() {
        let root = dir_of((0..7).map(|i| file(&format!("f{i}"), 10 - i, 0)).collect());
        let config = QueryConfig {
            page_size: 5,
            page_index: 40,
            ..Default::default()
        };
        let page = query(&root, &config);
        assert_eq!(page.page_index, 1);
        assert_eq!(page.entries.len(), 2);

        let config = QueryConfig {
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(query(&root, &config).page_count, 7);
    }

    #[test]
    fn test_empty_directory() {
        let root = dir_of(Vec::new());
        let page = query(&root, &QueryConfig::default());
        assert_eq!(page.page_count, 0);
        assert_eq!(page.page_index, 0);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_sort_key_cycle_and_parse() {
        assert_eq!(SortKey::Size.next(), SortKey::Name);
        assert_eq!(SortKey::Name.next(), SortKey::Date);
        assert_eq!(SortKey::Date.next(), SortKey::Size);
        assert_eq!("NAME".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!(SortKey::Date.to_string(), "date");
        assert_eq!(SortDirection::Ascending.reverse(), SortDirection::Descending);
    }

    #[test]
    fn test_builder_defaults() {
        let config = QueryConfig::builder().filter("x").build().unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.direction(), SortDirection::Descending);
        assert!(!config.show_hidden);
    }
}
