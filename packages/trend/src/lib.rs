#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trend series over the bulletin history.
//!
//! Every history file contributes one dated price per fuel key. Series are
//! grouped by key, ordered by date, and annotated with the change since the
//! previous point.

pub mod history;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use fuel_watch_models::trend::{TrendDocument, TrendMinDocument, TrendMinPoint, TrendPoint};
use fuel_watch_store::{DataDir, StoreError};

pub use history::{HistoryRecord, load_history, parse_history};

/// Errors that can occur while building trend documents.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    /// Listing the history or writing an output failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A history file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A history file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither the week nor the file name of a history file has a date.
    #[error("No date for history file {}", .path.display())]
    Undated { path: PathBuf },
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Groups the prices of `records` by key and computes the deltas between
/// adjacent points. Points with equal dates keep file order and are not
/// merged.
#[must_use]
pub fn build_series(records: &[HistoryRecord]) -> BTreeMap<String, Vec<TrendPoint>> {
    let mut grouped: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for record in records {
        for (key, price) in &record.prices {
            grouped
                .entry(key.clone())
                .or_default()
                .push((record.date, *price));
        }
    }

    grouped
        .into_iter()
        .map(|(key, mut points)| {
            points.sort_by_key(|(date, _)| *date);

            let mut previous: Option<f64> = None;
            let series = points
                .into_iter()
                .map(|(date, price_dop)| {
                    let delta_abs = previous.map(|prev| round4(price_dop - prev));
                    let delta_pct = previous
                        .filter(|prev| prev.abs() > 0.0)
                        .map(|prev| round4((price_dop - prev) / prev * 100.0));
                    previous = Some(price_dop);
                    TrendPoint {
                        date,
                        price_dop,
                        delta_abs,
                        delta_pct,
                    }
                })
                .collect();

            (key, series)
        })
        .collect()
}

/// Builds `trend.json` from `records`.
#[must_use]
pub fn build_trend(records: &[HistoryRecord]) -> TrendDocument {
    let updated_at_utc = records.iter().filter_map(|r| r.updated_at_utc).max();
    TrendDocument::new(updated_at_utc, build_series(records))
}

/// Derives `trend_min.json`: whole-peso prices (ties to even), no deltas.
#[must_use]
pub fn trend_min(trend: &TrendDocument) -> TrendMinDocument {
    #[allow(clippy::cast_possible_truncation)]
    let series = trend
        .series
        .iter()
        .map(|(key, points)| {
            let points = points
                .iter()
                .map(|p| TrendMinPoint {
                    date: p.date,
                    price_dop: p.price_dop.round_ties_even() as i64,
                })
                .collect();
            (key.clone(), points)
        })
        .collect();

    TrendMinDocument::new(trend.updated_at_utc, series)
}

/// Summary of one trend run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendSummary {
    pub files: usize,
    pub series: usize,
    pub points: usize,
}

/// Rebuilds `trend.json` and `trend_min.json` from the history in `dir`.
///
/// # Errors
///
/// Returns [`TrendError`] if the history cannot be listed or an output
/// cannot be written. Individual unreadable history files are skipped.
pub fn write_trend(dir: &DataDir) -> Result<TrendSummary, TrendError> {
    let records = load_history(dir)?;
    let trend = build_trend(&records);
    let min = trend_min(&trend);

    fuel_watch_store::write_json(&dir.trend_path(), &trend)?;
    fuel_watch_store::write_json(&dir.trend_min_path(), &min)?;

    let summary = TrendSummary {
        files: records.len(),
        series: trend.keys.len(),
        points: trend.series.values().map(Vec::len).sum(),
    };
    log::info!(
        "Trend built from {} history files: {} series, {} points",
        summary.files,
        summary.series,
        summary.points
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{DateTime, Utc};

    use super::*;

    fn record(date: &str, prices: &[(&str, f64)]) -> HistoryRecord {
        HistoryRecord {
            path: PathBuf::from(format!("history/{date}.json")),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            updated_at_utc: None,
            prices: prices.iter().map(|(k, p)| ((*k).to_owned(), *p)).collect(),
        }
    }

    #[test]
    fn deltas_between_adjacent_points() {
        let series = build_series(&[
            record("2025-09-06", &[("avtur", 100.0)]),
            record("2025-09-13", &[("avtur", 110.0)]),
        ]);
        let avtur = &series["avtur"];
        assert_eq!(avtur[0].delta_abs, None);
        assert_eq!(avtur[0].delta_pct, None);
        assert_eq!(avtur[1].delta_abs, Some(10.0));
        assert_eq!(avtur[1].delta_pct, Some(10.0));
    }

    #[test]
    fn zero_previous_price_has_no_percentage() {
        let series = build_series(&[
            record("2025-09-06", &[("glp", 0.0)]),
            record("2025-09-13", &[("glp", 5.0)]),
        ]);
        assert_eq!(series["glp"][1].delta_abs, Some(5.0));
        assert_eq!(series["glp"][1].delta_pct, None);
    }

    #[test]
    fn points_are_sorted_by_date_and_duplicates_kept() {
        let series = build_series(&[
            record("2025-09-20", &[("avtur", 3.0)]),
            record("2025-09-06", &[("avtur", 1.0)]),
            record("2025-09-20", &[("avtur", 4.0)]),
        ]);
        let prices: Vec<f64> = series["avtur"].iter().map(|p| p.price_dop).collect();
        assert_eq!(prices, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn deltas_are_rounded() {
        let series = build_series(&[
            record("2025-09-06", &[("kerosene", 3.0)]),
            record("2025-09-13", &[("kerosene", 4.0)]),
        ]);
        assert_eq!(series["kerosene"][1].delta_pct, Some(33.3333));
    }

    #[test]
    fn min_rounds_half_to_even() {
        let trend = build_trend(&[
            record("2025-09-06", &[("a", 240.5), ("b", 241.5), ("c", 290.1)]),
        ]);
        let min = trend_min(&trend);
        assert_eq!(min.series["a"][0].price_dop, 240);
        assert_eq!(min.series["b"][0].price_dop, 242);
        assert_eq!(min.series["c"][0].price_dop, 290);
        assert_eq!(min.keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn updated_at_is_newest_history_timestamp() {
        let mut older = record("2025-09-06", &[]);
        older.updated_at_utc = Some(
            DateTime::parse_from_rfc3339("2025-09-06T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let mut newer = record("2025-09-13", &[]);
        newer.updated_at_utc = Some(
            DateTime::parse_from_rfc3339("2025-09-13T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(
            build_trend(&[newer.clone(), older]).updated_at_utc,
            newer.updated_at_utc
        );
        assert_eq!(build_trend(&[]).updated_at_utc, None);
    }

    fn write_history(history: &Path, name: &str, contents: &str) {
        std::fs::create_dir_all(history).unwrap();
        std::fs::write(history.join(name), contents).unwrap();
    }

    #[test]
    fn rebuilding_unchanged_history_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        let history = dir.history_dir();
        write_history(
            &history,
            "2025-09-06.json",
            r#"{"updated_at_utc": "2025-09-06T12:00:00Z", "week": {"end_date": "2025-09-12"},
                "items": [{"key": "avtur", "price_dop": 210.5}]}"#,
        );
        write_history(
            &history,
            "2025-09-13.json",
            r#"{"updated_at_utc": "2025-09-13T12:00:00Z", "week": {"end_date": null},
                "items": [{"key": "avtur", "price_dop": 212.0}]}"#,
        );

        let summary = write_trend(&dir).unwrap();
        assert_eq!(
            summary,
            TrendSummary {
                files: 2,
                series: 1,
                points: 2
            }
        );
        let first = std::fs::read(dir.trend_path()).unwrap();
        let first_min = std::fs::read(dir.trend_min_path()).unwrap();

        write_trend(&dir).unwrap();
        assert_eq!(std::fs::read(dir.trend_path()).unwrap(), first);
        assert_eq!(std::fs::read(dir.trend_min_path()).unwrap(), first_min);

        let trend: TrendDocument = serde_json::from_slice(&first).unwrap();
        assert_eq!(trend.series["avtur"][1].delta_abs, Some(1.5));
    }

    #[test]
    fn empty_history_writes_empty_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        let summary = write_trend(&dir).unwrap();
        assert_eq!(summary.files, 0);
        let trend: TrendDocument =
            serde_json::from_slice(&std::fs::read(dir.trend_path()).unwrap()).unwrap();
        assert!(trend.series.is_empty());
        assert!(trend.keys.is_empty());
    }
}
