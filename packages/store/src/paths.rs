//! Canonical file paths.
//!
//! Everything lives under one data directory (by default `data/` in the
//! workspace root):
//!
//! ```text
//! data/
//!   latest.json
//!   history/YYYY-MM-DD.json
//!   trend.json
//!   trend_min.json
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .map_or_else(|| manifest.to_path_buf(), Path::to_path_buf)
}

/// Returns the default `data/` directory path.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    project_root().join("data")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// The files of one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current bulletin.
    #[must_use]
    pub fn latest_path(&self) -> PathBuf {
        self.root.join("latest.json")
    }

    #[must_use]
    pub fn history_dir(&self) -> PathBuf {
        self.root.join("history")
    }

    /// The history snapshot for a run date.
    #[must_use]
    pub fn history_path(&self, date: NaiveDate) -> PathBuf {
        self.history_dir()
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    #[must_use]
    pub fn trend_path(&self) -> PathBuf {
        self.root.join("trend.json")
    }

    #[must_use]
    pub fn trend_min_path(&self) -> PathBuf {
        self.root.join("trend_min.json")
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}
