//! Lenient reading of history snapshots.
//!
//! History files are bulletins written by earlier runs, possibly by older
//! versions of the scraper. Only the fields the trend needs are read, and
//! malformed items are skipped rather than failing the file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use fuel_watch_store::DataDir;
use serde::Deserialize;

use crate::TrendError;

#[derive(Debug, Default, Deserialize)]
struct HistoryWeek {
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    updated_at_utc: Option<String>,
    #[serde(default)]
    week: Option<HistoryWeek>,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// The prices of one history file, dated.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub path: PathBuf,
    /// Week end date, or the date in the file name.
    pub date: NaiveDate,
    pub updated_at_utc: Option<DateTime<Utc>>,
    /// `(key, price_dop)` in file order.
    pub prices: Vec<(String, f64)>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn item_price(item: &serde_json::Value) -> Option<(String, f64)> {
    let key = item.get("key")?.as_str()?.trim();
    if key.is_empty() {
        return None;
    }
    let price = item.get("price_dop")?.as_f64()?;
    Some((key.to_owned(), price))
}

/// Parses one history file.
///
/// # Errors
///
/// Returns [`TrendError::Json`] if the file is not a JSON object with the
/// expected shape, and [`TrendError::Undated`] if neither the week end date
/// nor the file name yields a date.
pub fn parse_history(path: &Path, contents: &str) -> Result<HistoryRecord, TrendError> {
    let file: HistoryFile = serde_json::from_str(contents)?;

    let date = file
        .week
        .as_ref()
        .and_then(|w| w.end_date.as_deref())
        .and_then(parse_date)
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).and_then(parse_date))
        .ok_or_else(|| TrendError::Undated {
            path: path.to_path_buf(),
        })?;

    let updated_at_utc = file
        .updated_at_utc
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let prices = file.items.iter().filter_map(item_price).collect();

    Ok(HistoryRecord {
        path: path.to_path_buf(),
        date,
        updated_at_utc,
        prices,
    })
}

/// Loads every history file in `dir`, in file-name order. Files that
/// cannot be read or parsed are logged and skipped.
///
/// # Errors
///
/// Returns [`TrendError::Store`] if the history directory cannot be listed.
pub fn load_history(dir: &DataDir) -> Result<Vec<HistoryRecord>, TrendError> {
    let files = dir.history_files()?;
    log::debug!("Reading {} history files", files.len());

    let records = files
        .iter()
        .filter_map(|path| {
            let parsed = std::fs::read_to_string(path)
                .map_err(TrendError::from)
                .and_then(|contents| parse_history(path, &contents));
            match parsed {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping history file {}: {e}", path.display());
                    None
                }
            }
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_week_end_date() {
        let record = parse_history(
            Path::new("history/2025-09-06.json"),
            r#"{
                "updated_at_utc": "2025-09-06T12:00:00Z",
                "week": {"start_date": "2025-09-06", "end_date": "2025-09-12"},
                "items": [{"key": "avtur", "price_dop": 210.5}]
            }"#,
        )
        .unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 9, 12).unwrap());
        assert_eq!(record.prices, vec![("avtur".to_owned(), 210.5)]);
        assert!(record.updated_at_utc.is_some());
    }

    #[test]
    fn falls_back_to_file_name_and_skips_bad_items() {
        let record = parse_history(
            Path::new("history/2025-09-06.json"),
            r#"{
                "week": {"start_date": null, "end_date": null},
                "items": [
                    {"key": "avtur"},
                    {"price_dop": 100.0},
                    {"key": "kerosene", "price_dop": "n/a"},
                    {"key": "gas_natural", "price_dop": 43}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 9, 6).unwrap());
        assert_eq!(record.prices, vec![("gas_natural".to_owned(), 43.0)]);
        assert_eq!(record.updated_at_utc, None);
    }

    #[test]
    fn undated_file_is_an_error() {
        let result = parse_history(Path::new("history/latest-copy.json"), r#"{"items": []}"#);
        assert!(matches!(result, Err(TrendError::Undated { .. })));
    }

    #[test]
    fn load_skips_unreadable_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        let history = dir.history_dir();
        std::fs::create_dir_all(&history).unwrap();
        std::fs::write(history.join("2025-09-06.json"), r#"{"items": []}"#).unwrap();
        std::fs::write(history.join("2025-09-13.json"), "not json").unwrap();

        let records = load_history(&dir).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 9, 6).unwrap());
    }
}
