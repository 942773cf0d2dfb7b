//! Age-based file analysis.
//!
//! Files are put into one of three buckets by last modification time,
//! plus a bucket for files whose timestamp could not be read.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use diskman_core::Entry;

const DAY: u64 = 24 * 60 * 60;

/// Files younger than this are [`AgeCategory::Recent`].
pub const RECENT_THRESHOLD: Duration = Duration::from_secs(90 * DAY);
/// Files older than this are [`AgeCategory::Old`].
pub const OLD_THRESHOLD: Duration = Duration::from_secs(365 * DAY);

/// Age bucket of a file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgeCategory {
    /// Modified within the last 90 days.
    Recent,
    /// Modified between 90 days and a year ago.
    Medium,
    /// Not modified for more than a year.
    Old,
    /// No usable timestamp.
    Unknown,
}

impl AgeCategory {
    /// Bucket for a file last modified at `modified`, as seen at `now`.
    ///
    /// Timestamps in the future count as recent.
    pub fn classify(modified: SystemTime, now: SystemTime) -> Self {
        if modified == UNIX_EPOCH {
            return AgeCategory::Unknown;
        }
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < RECENT_THRESHOLD {
            AgeCategory::Recent
        } else if age <= OLD_THRESHOLD {
            AgeCategory::Medium
        } else {
            AgeCategory::Old
        }
    }

    /// Short label for display.
    pub fn label(self) -> &'static str {
        match self {
            AgeCategory::Recent => "< 90 days",
            AgeCategory::Medium => "90 days - 1 year",
            AgeCategory::Old => "> 1 year",
            AgeCategory::Unknown => "unknown",
        }
    }
}

/// Totals for one age bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeStats {
    pub category: AgeCategory,
    pub file_count: u64,
    pub total_size: u64,
}

/// Bytes and file counts per age bucket for every file below `root`.
///
/// Always returns one row per category, in category order.
pub fn age_breakdown(root: &Entry, now: SystemTime) -> Vec<AgeStats> {
    let mut stats: Vec<AgeStats> = AgeCategory::iter()
        .map(|category| AgeStats {
            category,
            file_count: 0,
            total_size: 0,
        })
        .collect();

    for file in std::iter::once(root)
        .chain(root.descendants())
        .filter(|e| e.is_file() && !e.has_error())
    {
        let category = AgeCategory::classify(file.modified, now);
        if let Some(row) = stats.iter_mut().find(|s| s.category == category) {
            row.file_count += 1;
            row.total_size += file.size;
        }
    }
    stats
}

/// Format a duration as a human-readable string.
pub fn format_age(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < DAY {
        format!("{} hours", secs / 3600)
    } else if secs < 30 * DAY {
        format!("{} days", secs / DAY)
    } else if secs < 365 * DAY {
        format!("{} months", secs / (30 * DAY))
    } else {
        format!("{:.1} years", secs as f64 / (365 * DAY) as f64)
    }
}
