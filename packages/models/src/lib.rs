#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data model for weekly fuel-price bulletins.
//!
//! A scrape run produces one [`Bulletin`] holding the [`PriceItem`]s found
//! in the ministry's document. Bulletins are written verbatim to the
//! `latest.json` pointer and to a dated history file, from which the trend
//! documents in [`trend`] are derived.
//!
//! The [`document`] module holds the intermediate representations that the
//! extractors hand to the heuristics (tables and OCR-positioned lines).

pub mod document;
pub mod trend;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Unit a fuel is priced in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Unit {
    /// Price per gallon (every liquid fuel and LPG).
    #[serde(rename = "galon")]
    #[strum(serialize = "galon")]
    Galon,
    /// Price per cubic metre (natural gas only).
    #[serde(rename = "m3")]
    #[strum(serialize = "m3")]
    M3,
}

/// Currency of every published price.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    /// Dominican peso.
    #[default]
    Dop,
}

/// Direction of a week-over-week price change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeType {
    Up,
    Down,
    Same,
}

/// Price change announced next to a fuel's price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    /// Announced amount, when the bulletin states one.
    pub amount_dop: Option<f64>,
}

/// One fuel's official public price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceItem {
    /// Canonical display label (e.g. `"Gasoil Óptimo"`).
    pub label: String,
    /// Canonical snake_case identifier (e.g. `"gasoil_optimo"`).
    pub key: String,
    /// Price in Dominican pesos, rounded to two decimals.
    pub price_dop: f64,
    pub unit: Unit,
    /// `None` serializes as `null`; the field is always present.
    pub change: Option<PriceChange>,
}

/// Reporting week of a bulletin. Either bound may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WeekRange {
    /// Builds a fully known range.
    #[must_use]
    pub const fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    /// Returns `true` when neither bound is known.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

/// The full output of one scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulletin {
    /// URL of the document the prices were read from.
    pub source: String,
    pub updated_at_utc: DateTime<Utc>,
    pub week: WeekRange,
    pub currency: Currency,
    /// Empty when the expected section could not be located.
    pub items: Vec<PriceItem>,
}

impl Bulletin {
    /// Creates a DOP bulletin.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        updated_at_utc: DateTime<Utc>,
        week: WeekRange,
        items: Vec<PriceItem>,
    ) -> Self {
        Self {
            source: source.into(),
            updated_at_utc,
            week,
            currency: Currency::Dop,
            items,
        }
    }
}

/// What kind of document a source publishes.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Decide from the downloaded bytes: PDFs go through text extraction
    /// first and OCR when no text layer exists, anything else is HTML.
    #[default]
    Auto,
    /// An HTML page with the prices in a `<table>`.
    HtmlTable,
    /// A PDF with an embedded text layer.
    TextPdf,
    /// A scanned PDF that must be rendered and OCR'd.
    ScannedPdf,
}
