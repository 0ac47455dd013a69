#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flat-file persistence for bulletins and trend documents.
//!
//! Every file is written atomically: the JSON is written to a temporary
//! file in the destination directory, which is then renamed over the
//! target.

pub mod paths;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fuel_watch_models::Bulletin;
use serde::Serialize;

pub use paths::DataDir;

/// Errors that can occur while reading or writing the data directory.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `value` as pretty-printed JSON (two-space indent, non-ASCII
/// characters kept as UTF-8).
///
/// # Errors
///
/// Returns [`StoreError::Json`] if `value` cannot be serialized.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Writes `bytes` to `path` through a temporary file in the same
/// directory, creating the directory if needed.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the directory, the temporary file or the
/// rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    paths::ensure_dir(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Serializes `value` and writes it atomically to `path`.
///
/// # Errors
///
/// Returns [`StoreError`] if serialization or writing fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    write_atomic(path, &to_pretty_json(value)?)
}

/// Where a bulletin was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBulletin {
    pub latest: PathBuf,
    pub history: PathBuf,
}

impl DataDir {
    /// Writes `bulletin` to `latest.json` and to the history file for
    /// `run_date`, replacing a snapshot from an earlier run the same day.
    /// Both files receive the same serialized bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or either write fails.
    pub fn write_bulletin(
        &self,
        bulletin: &Bulletin,
        run_date: NaiveDate,
    ) -> Result<WrittenBulletin, StoreError> {
        let bytes = to_pretty_json(bulletin)?;
        let latest = self.latest_path();
        let history = self.history_path(run_date);

        write_atomic(&latest, &bytes)?;
        write_atomic(&history, &bytes)?;

        log::info!(
            "Saved {} items to {} and {}",
            bulletin.items.len(),
            latest.display(),
            history.display()
        );

        Ok(WrittenBulletin { latest, history })
    }

    /// Lists history snapshots (`*.json`) sorted by file name. A missing
    /// history directory is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be read.
    pub fn history_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.history_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use fuel_watch_models::{PriceItem, Unit, WeekRange};

    use super::*;

    fn bulletin() -> Bulletin {
        let now = DateTime::parse_from_rfc3339("2025-09-06T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Bulletin::new(
            "https://micm.gob.do/aviso.pdf",
            now,
            WeekRange::default(),
            vec![PriceItem {
                label: "Gasoil Óptimo".to_owned(),
                key: "gasoil_optimo".to_owned(),
                price_dop: 241.1,
                unit: Unit::Galon,
                change: None,
            }],
        )
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 6).unwrap()
    }

    #[test]
    fn latest_and_history_are_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());

        let written = dir.write_bulletin(&bulletin(), run_date()).unwrap();

        let latest = std::fs::read(&written.latest).unwrap();
        let history = std::fs::read(&written.history).unwrap();
        assert_eq!(latest, history);
        assert!(written.history.ends_with("history/2025-09-06.json"));
    }

    #[test]
    fn json_is_pretty_and_keeps_accents() {
        let json = String::from_utf8(to_pretty_json(&bulletin()).unwrap()).unwrap();
        assert!(json.contains("\n  \"source\""));
        assert!(json.contains("Gasoil Óptimo"));
        assert!(json.contains("\"change\": null"));
    }

    #[test]
    fn same_day_rerun_overwrites_history() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());

        dir.write_bulletin(&bulletin(), run_date()).unwrap();
        let mut second = bulletin();
        second.items.clear();
        dir.write_bulletin(&second, run_date()).unwrap();

        let files = dir.history_files().unwrap();
        assert_eq!(files.len(), 1);
        let stored: Bulletin =
            serde_json::from_slice(&std::fs::read(&files[0]).unwrap()).unwrap();
        assert!(stored.items.is_empty());
    }

    #[test]
    fn history_files_are_sorted_json_only() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        assert!(dir.history_files().unwrap().is_empty());

        let history = dir.history_dir();
        paths::ensure_dir(&history).unwrap();
        for name in ["2025-09-13.json", "2025-09-06.json", "notes.txt"] {
            std::fs::write(history.join(name), "{}").unwrap();
        }

        let names: Vec<_> = dir
            .history_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2025-09-06.json", "2025-09-13.json"]);
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out/trend.json");
        write_json(&target, &serde_json::json!({"a": 1})).unwrap();
        write_json(&target, &serde_json::json!({"a": 2})).unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path().join("out"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "{\n  \"a\": 2\n}"
        );
    }
}
