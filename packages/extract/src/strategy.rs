//! Ordered item-extraction strategies.
//!
//! Each source kind runs a fixed list of strategies over the extracted
//! document and keeps the first one that yields any item.

use std::borrow::Cow;

use fuel_watch_models::PriceItem;
use fuel_watch_models::document::{PositionedLine, Table};
use strum_macros::{AsRefStr, Display};

use crate::config::ExtractConfig;
use crate::fold::{fold, fold_lines};
use crate::matcher::{match_lines, match_tables, match_text};
use crate::section::{HeaderPolicy, locate_lines, locate_text};
use crate::{Tagged, first_success};

/// Everything the extractors recovered from one downloaded document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    /// Plain text (PDF text layer or HTML page text).
    pub text: String,
    pub tables: Vec<Table>,
    /// OCR lines in reading order.
    pub lines: Vec<PositionedLine>,
}

impl ExtractedDocument {
    /// Text used to look for the reporting week: the plain text, or the OCR
    /// lines joined when there is none.
    #[must_use]
    pub fn searchable_text(&self) -> Cow<'_, str> {
        if self.text.trim().is_empty() {
            Cow::Owned(
                self.lines
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tables.is_empty() && self.lines.is_empty()
    }
}

/// One way of reading items out of an [`ExtractedDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ItemStrategy {
    /// Tables with a public-price column.
    Tables,
    /// The located block of the plain text.
    TextSection,
    /// The located run of OCR lines.
    OcrSection,
    /// Every OCR line, for pages where the header was not recognised.
    OcrWholeDocument,
}

/// The strategies to run, in order, and how a missing section header is
/// handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub strategies: Vec<ItemStrategy>,
    pub header_policy: HeaderPolicy,
}

impl ExtractionPlan {
    /// HTML pages and text PDFs: tables first, then the text block.
    #[must_use]
    pub fn text(header_policy: HeaderPolicy) -> Self {
        Self {
            strategies: vec![ItemStrategy::Tables, ItemStrategy::TextSection],
            header_policy,
        }
    }

    /// Scanned PDFs: the located lines, then (when the policy allows it)
    /// every line.
    #[must_use]
    pub fn ocr(header_policy: HeaderPolicy) -> Self {
        let mut strategies = vec![ItemStrategy::OcrSection];
        if header_policy == HeaderPolicy::FallbackToWhole {
            strategies.push(ItemStrategy::OcrWholeDocument);
        }
        Self {
            strategies,
            header_policy,
        }
    }
}

fn run(
    strategy: ItemStrategy,
    document: &ExtractedDocument,
    policy: HeaderPolicy,
    config: &ExtractConfig,
) -> Vec<PriceItem> {
    match strategy {
        ItemStrategy::Tables => match_tables(&document.tables, config),
        ItemStrategy::TextSection => {
            let folded = fold(&document.text);
            let section = locate_text(
                &folded,
                &config.section,
                policy,
                config.window.block_chars,
            );
            log::debug!(
                "Text section: {} chars, header_found={}, terminated={}",
                section.window.chars().count(),
                section.header_found,
                section.terminated
            );
            match_text(section.window, config)
        }
        ItemStrategy::OcrSection => {
            let folded = fold_lines(&document.lines);
            let section = locate_lines(&folded, &config.section, policy);
            log::debug!(
                "OCR section: {} lines, header_found={}, terminated={}",
                section.lines.len(),
                section.header_found,
                section.terminated
            );
            match_lines(section.lines, config)
        }
        ItemStrategy::OcrWholeDocument => match_lines(&fold_lines(&document.lines), config),
    }
}

/// Runs `plan` over `document`, returning the first non-empty item list and
/// the strategy that produced it.
#[must_use]
pub fn extract_items(
    document: &ExtractedDocument,
    plan: &ExtractionPlan,
    config: &ExtractConfig,
) -> Option<Tagged<ItemStrategy, Vec<PriceItem>>> {
    first_success(&plan.strategies, |strategy| {
        let items = run(strategy, document, plan.header_policy, config);
        log::debug!("Strategy {strategy} found {} items", items.len());
        (!items.is_empty()).then_some(items)
    })
}

#[cfg(test)]
mod tests {
    use fuel_watch_models::document::{LineKey, PositionedLine};

    use super::*;

    fn config() -> ExtractConfig {
        ExtractConfig::embedded().unwrap()
    }

    fn line(n: u32, text: &str) -> PositionedLine {
        PositionedLine {
            key: LineKey {
                page: 0,
                block: 1,
                paragraph: 1,
                line: n,
            },
            text: text.to_owned(),
            x_min: 0,
            x_max: 0,
            y: f64::from(n),
            words: Vec::new(),
        }
    }

    #[test]
    fn tables_win_over_text() {
        let document = ExtractedDocument {
            text: "Precio al público\nAvtur 200.00".to_owned(),
            tables: vec![Table::from_rows(vec![
                vec!["Producto", "Precio al Público"],
                vec!["Avtur", "210.50"],
            ])],
            lines: Vec::new(),
        };
        let plan = ExtractionPlan::text(HeaderPolicy::RequireHeader);
        let tagged = extract_items(&document, &plan, &config()).unwrap();
        assert_eq!(tagged.strategy, ItemStrategy::Tables);
        assert!((tagged.value[0].price_dop - 210.50).abs() < 1e-9);
    }

    #[test]
    fn text_section_respects_required_header() {
        let document = ExtractedDocument {
            text: "Paridad de importación\nAvtur 150.00".to_owned(),
            ..ExtractedDocument::default()
        };

        let strict = ExtractionPlan::text(HeaderPolicy::RequireHeader);
        assert!(extract_items(&document, &strict, &config()).is_none());

        let permissive = ExtractionPlan::text(HeaderPolicy::FallbackToWhole);
        let tagged = extract_items(&document, &permissive, &config()).unwrap();
        assert_eq!(tagged.strategy, ItemStrategy::TextSection);
    }

    #[test]
    fn ocr_falls_back_to_whole_document() {
        let document = ExtractedDocument {
            lines: vec![
                line(1, "PRECIO AL PÚBLICO"),
                line(2, "PARIDAD DE IMPORTACIÓN"),
                line(3, "Gasoil Regular 224.60"),
            ],
            ..ExtractedDocument::default()
        };
        let plan = ExtractionPlan::ocr(HeaderPolicy::FallbackToWhole);
        let tagged = extract_items(&document, &plan, &config()).unwrap();
        assert_eq!(tagged.strategy, ItemStrategy::OcrWholeDocument);
        assert_eq!(tagged.value[0].key, "gasoil_regular");

        assert_eq!(
            ExtractionPlan::ocr(HeaderPolicy::RequireHeader).strategies,
            vec![ItemStrategy::OcrSection]
        );
    }

    #[test]
    fn searchable_text_uses_ocr_lines_when_text_is_empty() {
        let document = ExtractedDocument {
            lines: vec![line(1, "del 6 al 12"), line(2, "de septiembre de 2025")],
            ..ExtractedDocument::default()
        };
        assert_eq!(
            document.searchable_text(),
            "del 6 al 12\nde septiembre de 2025"
        );
        assert!(!document.is_empty());
        assert!(ExtractedDocument::default().is_empty());
    }
}
