//! Core types for diskman.
//!
//! This crate provides the data structures shared by the scanner, the
//! snapshot cache and the analysis layer: entries, snapshots, scan
//! configuration and the error taxonomy.

mod config;
mod entry;
mod error;
mod snapshot;

pub use config::{ScanConfig, ScanConfigBuilder, SizeMode};
pub use entry::{ContentHash, Descendants, Entry, EntryKind, InodeInfo};
pub use error::{EntryError, ScanError, ScanWarning, WarningKind};
pub use snapshot::{Snapshot, TreeStats};
