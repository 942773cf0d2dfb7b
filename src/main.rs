//! diskman - explore where disk space goes, scanning each tree only once.
//!
//! Usage:
//!   diskman [PATH]                  List the largest entries of PATH
//!   diskman list [PATH]             Same, with sorting/filtering/paging flags
//!   diskman search PATH NEEDLE      Find entries by name below PATH
//!   diskman duplicates [PATH]       Find duplicate files
//!   diskman largest [PATH]          Largest files below PATH
//!   diskman extensions [PATH]       Space used per file extension
//!   diskman age [PATH]              Space used per modification age
//!   diskman export [PATH]           Export scan to JSON
//!   diskman config [OPTIONS]        Show or change saved defaults
//!   diskman --help                  Show help

mod logging;
mod paths;
mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};

use diskman_analyze::{
    DuplicateConfig, DuplicateFinder, QueryConfig, SortKey, age_breakdown, deep_search,
    extension_breakdown, largest_files, query,
};
use diskman_core::{Entry, ScanConfig, SizeMode};
use diskman_scan::SnapshotCache;

use crate::settings::{SettingsUpdate, UserSettings};

#[derive(Parser)]
#[command(
    name = "diskman",
    version,
    about = "Disk usage explorer",
    long_about = "diskman scans a directory once and answers every further question \
                  (listing, sorting, searching, duplicates) from that snapshot.\n\n\
                  Defaults are read from ~/.config/diskman/settings.toml; set \
                  DISKMAN_LOG=debug for diagnostics.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    list: ListArgs,

    #[command(flatten)]
    scan: ScanArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Scan behaviour shared by every command.
#[derive(Args)]
struct ScanArgs {
    /// Descend into symlinked directories
    #[arg(long, global = true)]
    follow_symlinks: bool,

    /// Count allocated blocks instead of apparent file sizes
    #[arg(long, global = true)]
    allocated: bool,

    /// Scan threads (0 = one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Args)]
struct ListArgs {
    /// Directory to list (defaults to current directory)
    #[arg(default_value = ".")]
    path: String,

    /// Sort by size, name or date
    #[arg(short, long)]
    sort: Option<SortKey>,

    /// Reverse the sort key's usual direction
    #[arg(short, long)]
    reverse: bool,

    /// Only show entries whose name contains this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Include hidden entries
    #[arg(short = 'a', long)]
    hidden: bool,

    /// List directories before files
    #[arg(short = 'd', long)]
    dirs_first: bool,

    /// Page to show, starting at 1
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Entries per page
    #[arg(long, value_parser = clap::value_parser!(u16).range(5..=50))]
    page_size: Option<u16>,
}

#[derive(Subcommand)]
enum Command {
    /// List one directory
    List(ListArgs),

    /// Search names below a directory
    Search {
        /// Directory to search
        path: String,

        /// Case-insensitive text to look for
        needle: String,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
    },

    /// Find duplicate files
    Duplicates {
        /// Path to scan
        #[arg(default_value = ".")]
        path: String,

        /// Minimum file size to consider (e.g., "1KB", "1MB")
        #[arg(short, long, default_value = "1B")]
        min_size: String,

        /// Maximum number of duplicate groups to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Compare file heads and tails before hashing whole files
        #[arg(short, long)]
        quick: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the largest files
    Largest {
        /// Path to scan
        #[arg(default_value = ".")]
        path: String,

        /// Number of files to show
        #[arg(short = 'n', long, default_value = "50")]
        top: usize,
    },

    /// Show space used per file extension
    Extensions {
        /// Path to scan
        #[arg(default_value = ".")]
        path: String,

        /// Number of extensions to show
        #[arg(short = 'n', long, default_value = "15")]
        top: usize,
    },

    /// Show space used per modification age
    Age {
        /// Path to scan
        #[arg(default_value = ".")]
        path: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export scan results to JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change the saved defaults
    Config {
        /// Default sort key
        #[arg(long)]
        sort: Option<SortKey>,

        /// Default entries per page
        #[arg(long, value_parser = clap::value_parser!(u16).range(5..=50))]
        page_size: Option<u16>,

        /// Show hidden entries by default (true/false)
        #[arg(long)]
        hidden: Option<bool>,

        /// List directories first by default (true/false)
        #[arg(long)]
        dirs_first: Option<bool>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    logging::init_logger();

    let cli = Cli::parse();
    let settings = UserSettings::load();
    let cache = SnapshotCache::new(scan_config(&cli.scan, &settings));

    match cli.command {
        Some(Command::List(args)) => run_list(&cache, &settings, &args),
        Some(Command::Search {
            path,
            needle,
            limit,
        }) => run_search(&cache, &resolve(&path)?, &needle, limit),
        Some(Command::Duplicates {
            path,
            min_size,
            top,
            quick,
            format,
        }) => run_duplicates(&cache, &resolve(&path)?, &min_size, top, quick, format),
        Some(Command::Largest { path, top }) => run_largest(&cache, &resolve(&path)?, top),
        Some(Command::Extensions { path, top }) => run_extensions(&cache, &resolve(&path)?, top),
        Some(Command::Age { path, format }) => run_age(&cache, &resolve(&path)?, format),
        Some(Command::Export { path, output }) => run_export(&cache, &resolve(&path)?, output),
        Some(Command::Config {
            sort,
            page_size,
            hidden,
            dirs_first,
        }) => {
            let update = SettingsUpdate {
                sort,
                page_size: page_size.map(usize::from),
                show_hidden: hidden,
                dirs_first,
            };
            run_config(settings, &update)
        }
        None => run_list(&cache, &settings, &cli.list),
    }
}

fn scan_config(args: &ScanArgs, settings: &UserSettings) -> ScanConfig {
    let mut config = ScanConfig::default();
    config.follow_symlinks = args.follow_symlinks || settings.follow_symlinks;
    config.threads = args.threads.unwrap_or(settings.threads);
    if args.allocated {
        config.size_mode = SizeMode::Allocated;
    }
    config
}

fn resolve(input: &str) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let home = dirs::home_dir();
    Ok(paths::resolve(input, &cwd, home.as_deref()))
}

/// Scan (or reuse) the tree containing `path` and return its entry.
fn open(cache: &SnapshotCache, path: &Path) -> Result<Arc<Entry>> {
    if !cache.is_cached(path) {
        eprintln!("Scanning {}...", path.display());
    }
    cache
        .open(path)
        .with_context(|| format!("Scan of {} failed", path.display()))
}

/// Print one page of a directory listing.
fn run_list(cache: &SnapshotCache, settings: &UserSettings, args: &ListArgs) -> Result<()> {
    let path = resolve(&args.path)?;
    let entry = open(cache, &path)?;

    let sort_key = args.sort.unwrap_or(settings.sort);
    let page_size = args
        .page_size
        .map(usize::from)
        .unwrap_or_else(|| crate::settings::clamp_page_size(settings.page_size));
    let config = QueryConfig {
        filter: args.filter.clone().unwrap_or_default(),
        sort_key,
        sort_direction: args
            .reverse
            .then(|| sort_key.default_direction().reverse()),
        show_hidden: args.hidden || settings.show_hidden,
        dirs_first: args.dirs_first || settings.dirs_first,
        page_size,
        page_index: args.page.saturating_sub(1),
    };
    let page = query(&entry, &config);

    println!();
    println!("{}", "─".repeat(70));
    println!(" {} - {}", entry.path.display(), format_size(entry.size));
    println!(
        " {} files, {} directories",
        entry.file_count(),
        entry.dir_count()
    );
    if let Some(error) = &entry.error {
        println!(" ! {}", error.label());
    }
    println!("{}", "─".repeat(70));

    if page.entries.is_empty() {
        println!(" (empty)");
        return Ok(());
    }

    for child in &page.entries {
        let ratio = if entry.size > 0 {
            child.size as f64 / entry.size as f64 * 100.0
        } else {
            0.0
        };
        let name = if child.is_dir() {
            format!("{}/", child.name)
        } else {
            child.name.to_string()
        };
        let marker = if child.has_error() { "!" } else { " " };
        println!(
            " {}{:<40} {:>10} {:>5.1}% {} {}",
            marker,
            truncate(&name, 40),
            format_size(child.size),
            ratio,
            make_bar(ratio / 100.0, 10),
            format_time(child.modified)
        );
    }

    println!();
    println!(
        " Page {}/{} ({} entries, sorted by {})",
        page.page_index + 1,
        page.page_count,
        page.total_count,
        sort_key
    );
    Ok(())
}

/// Print entries below `path` whose name contains `needle`.
fn run_search(cache: &SnapshotCache, path: &Path, needle: &str, limit: usize) -> Result<()> {
    let root = open(cache, path)?;

    let mut shown = 0;
    for hit in deep_search(Arc::clone(&root), needle)
        .with_cache(cache)
        .take(limit)
    {
        let relative = hit.path.strip_prefix(&root.path).unwrap_or(&hit.path);
        let suffix = if hit.is_dir() { "/" } else { "" };
        println!(
            " {:>10}  {}{}",
            format_size(hit.size),
            relative.display(),
            suffix
        );
        shown += 1;
    }

    if shown == 0 {
        println!(" No matches for \"{}\".", needle);
    } else if shown == limit {
        println!(" (showing the first {})", limit);
    }
    Ok(())
}

/// Run duplicate detection.
fn run_duplicates(
    cache: &SnapshotCache,
    path: &Path,
    min_size: &str,
    top_n: usize,
    quick: bool,
    format: OutputFormat,
) -> Result<()> {
    let min_bytes = parse_size(min_size)?;
    let root = open(cache, path)?;

    eprintln!("Finding duplicates (min size: {})...", min_size);

    let dup_config = DuplicateConfig::builder()
        .min_size(min_bytes)
        .max_groups(top_n)
        .quick_compare(quick)
        .build()
        .map_err(|e| eyre!("Invalid duplicate settings: {e}"))?;

    let finder = DuplicateFinder::with_config(dup_config);
    let report = finder.find_duplicates(&root);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report");
            println!("{}", "─".repeat(70));
            println!();

            if report.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    report.group_count, report.files_with_duplicates
                );
                println!(
                    " Total wasted space: {}",
                    format_size(report.total_wasted_space)
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(
                        " Group {} ({} files, {} each, {} wasted)",
                        i + 1,
                        group.count(),
                        format_size(group.size),
                        format_size(group.wasted_bytes)
                    );
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }
            }
            if report.files_skipped > 0 {
                println!(" {} file(s) could not be read", report.files_skipped);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn run_largest(cache: &SnapshotCache, path: &Path, top_n: usize) -> Result<()> {
    let root = open(cache, path)?;
    for (i, file) in largest_files(&root, top_n).iter().enumerate() {
        let relative = file.path.strip_prefix(&root.path).unwrap_or(&file.path);
        println!(
            " {:>3}. {:>10}  {}  {}",
            i + 1,
            format_size(file.size),
            format_time(file.modified),
            relative.display()
        );
    }
    Ok(())
}

fn run_extensions(cache: &SnapshotCache, path: &Path, top_n: usize) -> Result<()> {
    let root = open(cache, path)?;
    let rows = extension_breakdown(&root, top_n);
    let max_size = rows.first().map(|r| r.total_size).unwrap_or(1).max(1);

    for row in &rows {
        println!(
            " {:<12} {:>10} {:>8} files  {}",
            row.extension,
            format_size(row.total_size),
            row.file_count,
            make_bar(row.total_size as f64 / max_size as f64, 30)
        );
    }
    Ok(())
}

/// Run age analysis.
fn run_age(cache: &SnapshotCache, path: &Path, format: OutputFormat) -> Result<()> {
    let root = open(cache, path)?;
    let rows = age_breakdown(&root, SystemTime::now());

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Age Distribution Report");
            println!("{}", "─".repeat(70));
            println!();

            let max_size = rows.iter().map(|r| r.total_size).max().unwrap_or(1).max(1);
            for row in &rows {
                let bar_len = ((row.total_size as f64 / max_size as f64) * 30.0) as usize;
                println!(
                    "   {:<18} {:>10} {:>8} files  {}",
                    row.category.label(),
                    format_size(row.total_size),
                    row.file_count,
                    "█".repeat(bar_len)
                );
            }
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

/// Export scan results to JSON.
fn run_export(cache: &SnapshotCache, path: &Path, output: Option<PathBuf>) -> Result<()> {
    eprintln!("Scanning {}...", path.display());
    let snapshot = cache
        .get_or_scan(path)
        .with_context(|| format!("Scan of {} failed", path.display()))?;

    let json = serde_json::to_string_pretty(&*snapshot)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Cannot write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Print the saved defaults, storing any changes first.
fn run_config(mut settings: UserSettings, update: &SettingsUpdate) -> Result<()> {
    if settings.apply(update) {
        let path = settings.save().context("Cannot save settings")?;
        eprintln!("Saved {}", path.display());
    }
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Local modification time, or a dash when unknown.
fn format_time(time: SystemTime) -> String {
    if time == UNIX_EPOCH {
        return "-".repeat(16);
    }
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Truncate a string to max length (in characters).
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let unit = &s[digits.len()..];

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => return Err(eyre!("Unknown size unit: {other}")),
    };
    let num: f64 = digits
        .parse()
        .with_context(|| format!("Invalid size: {s}"))?;

    Ok((num * multiplier as f64) as u64)
}
