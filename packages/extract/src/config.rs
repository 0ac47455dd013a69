//! Extraction configuration.
//!
//! The defaults live in `config/extract.toml`, baked into the binary with
//! [`include_str!`]. [`ExtractSettings`] is the serde view of that file;
//! [`ExtractConfig`] is the compiled form (aliases as regexes, phrases
//! folded) passed into every heuristic.

use serde::Deserialize;

use crate::fold::fold;
use crate::labels::{FuelCatalog, FuelEntry};
use crate::section::SectionMarkers;

/// Default heuristics, embedded at compile time.
const EMBEDDED_TOML: &str = include_str!("../config/extract.toml");

/// Errors raised while loading or compiling configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A fuel alias is not a valid regex.
    #[error("invalid alias for fuel '{key}': {source}")]
    Alias {
        /// Key of the offending catalog entry.
        key: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration parsed but is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Sanity band for prices; anything outside is never published.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl PriceBounds {
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowSettings {
    pub text_chars: usize,
    pub block_chars: usize,
    pub next_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionSettings {
    pub headers: Vec<String>,
    pub terminators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSettings {
    pub price_column_hints: Vec<String>,
    pub label_column_hints: Vec<String>,
    #[serde(default)]
    pub change_column_hints: Vec<String>,
}

/// Words announcing a price change, by direction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeSettings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub same: Vec<String>,
    #[serde(default)]
    pub skip_line_words: Vec<String>,
}

/// The serde view of `extract.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractSettings {
    pub price: PriceBounds,
    pub window: WindowSettings,
    pub section: SectionSettings,
    pub table: TableSettings,
    pub change: ChangeSettings,
    #[serde(rename = "fuel")]
    pub fuels: Vec<FuelEntry>,
}

impl ExtractSettings {
    /// Parses the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Ok(toml::from_str(EMBEDDED_TOML)?)
    }
}

/// Compiled, immutable extraction configuration.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub price: PriceBounds,
    pub window: WindowSettings,
    pub section: SectionMarkers,
    pub table: TableSettings,
    pub change: ChangeSettings,
    pub catalog: FuelCatalog,
}

fn fold_all(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| fold(p).trim().to_owned())
        .filter(|p| !p.is_empty())
        .collect()
}

impl ExtractConfig {
    /// Compiles the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_settings(&ExtractSettings::embedded()?)
    }

    /// Parses and compiles a complete `extract.toml` document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or invalid.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings: ExtractSettings = toml::from_str(source)?;
        Self::from_settings(&settings)
    }

    /// Compiles parsed settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the price band is empty, no section
    /// header is configured, or the fuel catalog fails to compile.
    pub fn from_settings(settings: &ExtractSettings) -> Result<Self, ConfigError> {
        if settings.price.min > settings.price.max {
            return Err(ConfigError::Invalid(format!(
                "price.min ({}) is greater than price.max ({})",
                settings.price.min, settings.price.max
            )));
        }

        let section = SectionMarkers {
            headers: fold_all(&settings.section.headers),
            terminators: fold_all(&settings.section.terminators),
        };
        if section.headers.is_empty() {
            return Err(ConfigError::Invalid(
                "section.headers must not be empty".to_owned(),
            ));
        }

        let table = TableSettings {
            price_column_hints: fold_all(&settings.table.price_column_hints),
            label_column_hints: fold_all(&settings.table.label_column_hints),
            change_column_hints: fold_all(&settings.table.change_column_hints),
        };

        let change = ChangeSettings {
            up: fold_all(&settings.change.up),
            down: fold_all(&settings.change.down),
            same: fold_all(&settings.change.same),
            skip_line_words: fold_all(&settings.change.skip_line_words),
        };

        let catalog = FuelCatalog::compile(&settings.fuels)?;

        log::debug!(
            "Compiled extraction config: {} fuels, {} section headers",
            catalog.fuels().len(),
            section.headers.len()
        );

        Ok(Self {
            price: settings.price,
            window: settings.window,
            section,
            table,
            change,
            catalog,
        })
    }
}
