//! Persistent defaults for the command-line front end.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use diskman_analyze::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, SortKey};

/// Persistent user settings stored in config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Sort key used when `--sort` is not given.
    pub sort: SortKey,
    /// Entries per page.
    pub page_size: usize,
    /// Show hidden files by default.
    pub show_hidden: bool,
    /// List directories before files.
    pub dirs_first: bool,
    /// Descend into symlinked directories while scanning.
    pub follow_symlinks: bool,
    /// Scan threads (0 = one per core).
    pub threads: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            sort: SortKey::Size,
            page_size: DEFAULT_PAGE_SIZE,
            show_hidden: false,
            dirs_first: false,
            follow_symlinks: false,
            threads: 0,
        }
    }
}

/// Changes requested by `diskman config`; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub sort: Option<SortKey>,
    pub page_size: Option<usize>,
    pub show_hidden: Option<bool>,
    pub dirs_first: Option<bool>,
}

impl UserSettings {
    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("diskman").join("settings.toml"))
    }

    /// Load settings from disk, or return defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from `path`, or return defaults.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .map(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    /// Parse settings text; anything unreadable falls back to defaults.
    pub fn parse(content: &str) -> Self {
        match toml::from_str::<Self>(content) {
            Ok(settings) => settings.normalized(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Save settings to the config file and return its path.
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No config directory"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        std::fs::write(path, content)
    }

    /// Apply `update`. Returns whether any value changed.
    pub fn apply(&mut self, update: &SettingsUpdate) -> bool {
        let before = self.clone();
        if let Some(sort) = update.sort {
            self.sort = sort;
        }
        if let Some(page_size) = update.page_size {
            self.page_size = clamp_page_size(page_size);
        }
        if let Some(show_hidden) = update.show_hidden {
            self.show_hidden = show_hidden;
        }
        if let Some(dirs_first) = update.dirs_first {
            self.dirs_first = dirs_first;
        }
        *self != before
    }

    fn normalized(mut self) -> Self {
        self.page_size = clamp_page_size(self.page_size);
        self
    }
}

/// Keep a page size inside the supported range.
pub fn clamp_page_size(size: usize) -> usize {
    size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}
