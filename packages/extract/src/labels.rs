//! Fuel label normalization.
//!
//! Maps the many spellings found in bulletins ("Gasoil Óptimo", "GASOIL
//! OPTIMO", "Diésel óptimo", ...) onto one canonical label and snake_case
//! key. The synonym table is configuration ([`FuelEntry`]); this module
//! compiles it into a [`FuelCatalog`] of regex aliases matched, in order,
//! against folded text.

use std::ops::Range;

use fuel_watch_models::{PriceChange, PriceItem, Unit};
use regex::Regex;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::fold::fold_label;
use crate::numbers::round2;

/// One synonym-table entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FuelEntry {
    pub key: String,
    pub label: String,
    pub unit: Unit,
    /// Regexes matched against folded text.
    pub aliases: Vec<String>,
}

/// A compiled catalog entry.
#[derive(Debug, Clone)]
pub struct Fuel {
    pub key: String,
    pub label: String,
    pub unit: Unit,
    aliases: Vec<Regex>,
}

impl Fuel {
    /// Returns the earliest alias match in `folded`.
    #[must_use]
    pub fn find(&self, folded: &str) -> Option<Range<usize>> {
        self.find_from(folded, 0)
    }

    /// Returns the earliest alias match in `folded` starting at or after
    /// byte offset `from`.
    #[must_use]
    pub fn find_from(&self, folded: &str, from: usize) -> Option<Range<usize>> {
        if !folded.is_char_boundary(from) {
            return None;
        }
        self.aliases
            .iter()
            .filter_map(|re| re.find_at(folded, from))
            .map(|m| m.range())
            .min_by_key(|r| (r.start, std::cmp::Reverse(r.end)))
    }

    #[must_use]
    pub fn matches(&self, folded: &str) -> bool {
        self.aliases.iter().any(|re| re.is_match(folded))
    }

    /// Builds the output item for a price read from a bulletin.
    #[must_use]
    pub fn item(&self, price: f64, change: Option<PriceChange>) -> PriceItem {
        PriceItem {
            label: self.label.clone(),
            key: self.key.clone(),
            price_dop: round2(price),
            unit: self.unit,
            change,
        }
    }
}

/// The ordered synonym table.
#[derive(Debug, Clone)]
pub struct FuelCatalog {
    fuels: Vec<Fuel>,
}

fn is_snake_case(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('_')
        && !key.ends_with('_')
        && !key.contains("__")
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FuelCatalog {
    /// Compiles configuration entries, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the table is empty, a key is not
    /// snake_case or is repeated, an entry has no aliases, or an alias is
    /// not a valid regex.
    pub fn compile(entries: &[FuelEntry]) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::Invalid("fuel catalog is empty".to_owned()));
        }

        let mut fuels: Vec<Fuel> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !is_snake_case(&entry.key) {
                return Err(ConfigError::Invalid(format!(
                    "fuel key '{}' is not snake_case",
                    entry.key
                )));
            }
            if fuels.iter().any(|f| f.key == entry.key) {
                return Err(ConfigError::Invalid(format!(
                    "fuel key '{}' is defined twice",
                    entry.key
                )));
            }
            if entry.aliases.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "fuel '{}' has no aliases",
                    entry.key
                )));
            }

            let aliases = entry
                .aliases
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| ConfigError::Alias {
                        key: entry.key.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            fuels.push(Fuel {
                key: entry.key.clone(),
                label: entry.label.clone(),
                unit: entry.unit,
                aliases,
            });
        }

        Ok(Self { fuels })
    }

    /// Entries in configuration order (also the output order of items).
    #[must_use]
    pub fn fuels(&self) -> &[Fuel] {
        &self.fuels
    }

    /// Position of `key` in the catalog.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fuels.iter().position(|f| f.key == key)
    }

    /// Normalizes a raw label (any case, accents, parenthetical notes).
    ///
    /// Returns `None` for labels that match no entry.
    #[must_use]
    pub fn classify(&self, raw_label: &str) -> Option<&Fuel> {
        self.classify_folded(&fold_label(raw_label))
    }

    /// Like [`Self::classify`] for text that is already folded.
    #[must_use]
    pub fn classify_folded(&self, folded: &str) -> Option<&Fuel> {
        self.fuels.iter().find(|f| f.matches(folded))
    }

    /// Start of the earliest label of any fuel other than `except` at or
    /// after `from`.
    #[must_use]
    pub fn next_label_start(&self, folded: &str, from: usize, except: &str) -> Option<usize> {
        self.fuels
            .iter()
            .filter(|f| f.key != except)
            .filter_map(|f| f.find_from(folded, from))
            .map(|r| r.start)
            .min()
    }
}
