//! Derived trend documents (`trend.json` and `trend_min.json`).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Currency;

/// One dated price in a fuel's series, with the change since the previous
/// point. Both deltas are `None` on the first point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub price_dop: f64,
    pub delta_abs: Option<f64>,
    /// `None` also when the previous price is zero.
    pub delta_pct: Option<f64>,
}

/// A dated price rounded to whole pesos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendMinPoint {
    pub date: NaiveDate,
    pub price_dop: i64,
}

/// Envelope shared by both trend documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEnvelope<P> {
    /// Newest `updated_at_utc` among the history files the series were
    /// built from.
    pub updated_at_utc: Option<DateTime<Utc>>,
    pub currency: Currency,
    /// Keyed by canonical fuel key; each series is ordered by date.
    pub series: BTreeMap<String, Vec<P>>,
    /// Sorted list of the keys present in `series`.
    pub keys: Vec<String>,
}

impl<P> TrendEnvelope<P> {
    /// Wraps `series`, deriving the sorted key list.
    #[must_use]
    pub fn new(updated_at_utc: Option<DateTime<Utc>>, series: BTreeMap<String, Vec<P>>) -> Self {
        let keys = series.keys().cloned().collect();
        Self {
            updated_at_utc,
            currency: Currency::Dop,
            series,
            keys,
        }
    }
}

/// Contents of `trend.json`.
pub type TrendDocument = TrendEnvelope<TrendPoint>;

/// Contents of `trend_min.json`.
pub type TrendMinDocument = TrendEnvelope<TrendMinPoint>;
