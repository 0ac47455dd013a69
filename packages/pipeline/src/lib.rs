#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The scrape pipeline.
//!
//! One run locates the week's bulletin, downloads it, reads it according to
//! its [`SourceKind`], extracts the price items and the reporting week, and
//! writes the resulting [`Bulletin`] to the data directory. Every stage
//! runs sequentially.

pub mod config;
pub mod progress;

use std::time::Duration;

use chrono::{DateTime, Datelike as _, SubsecRound as _, Utc};
use fuel_watch_extract::Tagged;
use fuel_watch_extract::config::{ConfigError, ExtractConfig};
use fuel_watch_extract::strategy::{ExtractedDocument, ExtractionPlan, ItemStrategy, extract_items};
use fuel_watch_extract::week::{WeekMatch, parse_week};
use fuel_watch_models::{Bulletin, SourceKind};
use fuel_watch_pdf::PdfError;
use fuel_watch_pdf::ocr::{OcrOptions, ocr_pdf};
use fuel_watch_pdf::text_table::tables_from_text;
use fuel_watch_scraper::{FetchedDocument, ScrapeError, build_client, fetch_document, find_document};
use fuel_watch_store::{DataDir, StoreError, WrittenBulletin};
use fuel_watch_trend::{TrendError, TrendSummary};

use crate::config::{KindPolicies, PipelineConfig, SourceTarget};
use crate::progress::ProgressCallback;

/// Errors that end a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Extraction configuration failed to compile.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A configuration file could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configured URL is malformed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Fetching the listing or the bulletin failed.
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// OCR of a scanned bulletin failed.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Writing the bulletin failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Rebuilding the trend failed.
    #[error("Trend error: {0}")]
    Trend(#[from] TrendError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The plan used for a resolved source kind.
#[must_use]
pub fn plan_for(kind: SourceKind, policies: &KindPolicies) -> ExtractionPlan {
    let policy = policies.for_kind(kind);
    match kind {
        SourceKind::ScannedPdf => ExtractionPlan::ocr(policy),
        SourceKind::Auto | SourceKind::HtmlTable | SourceKind::TextPdf => {
            ExtractionPlan::text(policy)
        }
    }
}

fn html_document(fetched: &FetchedDocument) -> Result<ExtractedDocument, PipelineError> {
    let html = fetched.text();
    Ok(ExtractedDocument {
        text: fuel_watch_scraper::html::html_text(&html),
        tables: fuel_watch_scraper::html::extract_tables(&html)?,
        lines: Vec::new(),
    })
}

/// PDF text layer, or empty text when the PDF cannot be parsed.
fn pdf_text(bytes: &[u8]) -> String {
    fuel_watch_pdf::extract_text(bytes).unwrap_or_else(|e| {
        log::warn!("{e}; treating the text layer as empty");
        String::new()
    })
}

fn text_pdf_document(text: String) -> ExtractedDocument {
    ExtractedDocument {
        tables: tables_from_text(&text),
        text,
        lines: Vec::new(),
    }
}

fn scanned_document(bytes: &[u8], ocr: &OcrOptions) -> Result<ExtractedDocument, PdfError> {
    Ok(ExtractedDocument {
        lines: ocr_pdf(bytes, ocr)?,
        ..ExtractedDocument::default()
    })
}

/// Keeps a text PDF reading when its text plan finds prices, otherwise
/// falls back to `ocr`. A failed OCR keeps the text reading.
fn text_or_ocr(
    document: ExtractedDocument,
    config: &PipelineConfig,
    ocr: impl FnOnce() -> Result<ExtractedDocument, PdfError>,
) -> (SourceKind, ExtractedDocument) {
    let plan = plan_for(SourceKind::TextPdf, &config.source.policy);
    if extract_items(&document, &plan, &config.extract).is_some() {
        return (SourceKind::TextPdf, document);
    }

    log::info!("Text layer has no price items, running OCR");
    match ocr() {
        Ok(scanned) => (SourceKind::ScannedPdf, scanned),
        Err(e) => {
            log::warn!("OCR failed: {e}");
            (SourceKind::TextPdf, document)
        }
    }
}

/// Reads a downloaded bulletin as `kind`, returning the document together
/// with the concrete kind it was read as.
///
/// `Auto` reads non-PDF responses as HTML and PDFs with a text layer as
/// text PDFs. PDFs without a text layer, or whose text yields no price
/// items, go through OCR. OCR failure is fatal for an explicit `ScannedPdf`
/// but only degrades an `Auto` run.
///
/// # Errors
///
/// Returns [`PipelineError`] if HTML parsing fails or OCR of an explicit
/// scanned PDF fails.
pub fn extract_document(
    fetched: &FetchedDocument,
    kind: SourceKind,
    config: &PipelineConfig,
) -> Result<Tagged<SourceKind, ExtractedDocument>, PipelineError> {
    let ocr = &config.source.ocr;
    let (kind, document) = match kind {
        SourceKind::HtmlTable => (SourceKind::HtmlTable, html_document(fetched)?),
        SourceKind::TextPdf => (
            SourceKind::TextPdf,
            text_pdf_document(pdf_text(&fetched.bytes)),
        ),
        SourceKind::ScannedPdf => (
            SourceKind::ScannedPdf,
            scanned_document(&fetched.bytes, ocr)?,
        ),
        SourceKind::Auto if !fetched.is_pdf() => (SourceKind::HtmlTable, html_document(fetched)?),
        SourceKind::Auto => {
            let text = pdf_text(&fetched.bytes);
            if fuel_watch_pdf::is_blank(&text) {
                log::info!("PDF has no text layer, running OCR");
                let document = scanned_document(&fetched.bytes, ocr).unwrap_or_else(|e| {
                    log::warn!("OCR failed: {e}");
                    ExtractedDocument::default()
                });
                (SourceKind::ScannedPdf, document)
            } else {
                text_or_ocr(text_pdf_document(text), config, || {
                    scanned_document(&fetched.bytes, ocr)
                })
            }
        }
    };

    log::info!(
        "Read document as {kind}: {} chars of text, {} tables, {} OCR lines",
        document.text.len(),
        document.tables.len(),
        document.lines.len()
    );

    Ok(Tagged {
        strategy: kind,
        value: document,
    })
}

/// A bulletin together with how its parts were found.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledBulletin {
    pub bulletin: Bulletin,
    /// `None` when no strategy found any item.
    pub strategy: Option<ItemStrategy>,
    /// `None` when the week could not be recovered.
    pub week: Option<WeekMatch>,
}

/// Builds the bulletin for a read document. Never fails: a document
/// without recognizable prices yields an empty item list.
#[must_use]
pub fn assemble_bulletin(
    source_url: &str,
    anchor_text: &str,
    document: &ExtractedDocument,
    plan: &ExtractionPlan,
    config: &ExtractConfig,
    now: DateTime<Utc>,
) -> AssembledBulletin {
    let found = extract_items(document, plan, config);
    match &found {
        Some(tagged) => log::info!(
            "Extracted {} items with strategy {}",
            tagged.value.len(),
            tagged.strategy
        ),
        None => log::warn!("No price items found in {source_url}"),
    }

    let week = parse_week(&document.searchable_text(), anchor_text, source_url);
    match &week {
        Some(m) => log::info!(
            "Week {:?} to {:?} ({} from {})",
            m.range.start_date,
            m.range.end_date,
            m.pattern,
            m.source
        ),
        None => log::warn!("Reporting week not found"),
    }

    let (strategy, items) = found.map_or((None, Vec::new()), |t| (Some(t.strategy), t.value));
    let bulletin = Bulletin::new(
        source_url,
        now,
        week.map(|m| m.range).unwrap_or_default(),
        items,
    );

    AssembledBulletin {
        bulletin,
        strategy,
        week,
    }
}

/// Outcome of one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub assembled: AssembledBulletin,
    /// The kind the document was read as.
    pub kind: SourceKind,
    pub written: WrittenBulletin,
}

/// Fetches, reads and stores this week's bulletin.
///
/// `kind` overrides the configured default source kind.
///
/// # Errors
///
/// Returns [`PipelineError`] on HTTP failure, when no bulletin link is
/// found, when OCR of an explicit scanned PDF fails, or when the bulletin
/// cannot be written.
pub async fn run_scrape(
    config: &PipelineConfig,
    kind: Option<SourceKind>,
    dir: &DataDir,
    progress: &dyn ProgressCallback,
) -> Result<ScrapeReport, PipelineError> {
    let now = Utc::now().trunc_subsecs(0);
    let kind = kind.unwrap_or(config.source.default_kind);
    let http = &config.source.http;

    progress.set_total(4);
    progress.set_message("Locating bulletin".to_owned());

    let client = build_client(http)?;
    let (url, anchor_text) = match config.target()? {
        SourceTarget::Document(url) => {
            log::info!("Using bulletin URL {url}");
            (url, String::new())
        }
        SourceTarget::Listing(listing_urls) => {
            let candidate = find_document(
                &client,
                &listing_urls,
                &config.source.ranking,
                now.year(),
                Duration::from_secs(http.listing_timeout_secs),
            )
            .await?;
            (candidate.url, candidate.anchor_text)
        }
    };
    progress.inc(1);

    progress.set_message(format!("Downloading {url}"));
    let fetched = fetch_document(
        &client,
        &url,
        Duration::from_secs(http.document_timeout_secs),
    )
    .await?;
    progress.inc(1);

    progress.set_message(format!("Reading bulletin ({kind})"));
    let extracted = extract_document(&fetched, kind, config)?;
    let plan = plan_for(extracted.strategy, &config.source.policy);
    let assembled = assemble_bulletin(
        &url,
        &anchor_text,
        &extracted.value,
        &plan,
        &config.extract,
        now,
    );
    progress.inc(1);

    progress.set_message("Saving bulletin".to_owned());
    let written = dir.write_bulletin(&assembled.bulletin, now.date_naive())?;
    progress.inc(1);
    progress.finish(format!(
        "{} prices saved",
        assembled.bulletin.items.len()
    ));

    Ok(ScrapeReport {
        assembled,
        kind: extracted.strategy,
        written,
    })
}

/// Rebuilds the trend documents from the history in `dir`.
///
/// # Errors
///
/// Returns [`PipelineError::Trend`] if the history cannot be listed or the
/// outputs cannot be written.
pub fn run_trend(
    dir: &DataDir,
    progress: &dyn ProgressCallback,
) -> Result<TrendSummary, PipelineError> {
    progress.set_total(1);
    progress.set_message("Building trend".to_owned());
    let summary = fuel_watch_trend::write_trend(dir)?;
    progress.inc(1);
    progress.finish(format!(
        "{} series from {} history files",
        summary.series, summary.files
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use fuel_watch_extract::section::HeaderPolicy;
    use fuel_watch_extract::week::WeekSource;

    use super::*;
    use crate::progress::NullProgress;

    const HTML_BULLETIN: &str = r"
        <html><body>
          <h2>Aviso semanal de precios de combustibles</h2>
          <p>Vigentes del 6 al 12 de septiembre de 2025</p>
          <table>
            <tr><th>Producto</th><th>Precio al Público</th></tr>
            <tr><td>Gasoil Óptimo</td><td>241.10</td></tr>
            <tr><td>Gasolina Premium</td><td>290.10</td></tr>
          </table>
        </body></html>
    ";

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-06T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::embedded().unwrap()
    }

    fn html_response() -> FetchedDocument {
        FetchedDocument {
            url: "https://micm.gob.do/aviso".to_owned(),
            bytes: HTML_BULLETIN.as_bytes().to_vec(),
            content_type: Some("text/html; charset=UTF-8".to_owned()),
        }
    }

    #[test]
    fn auto_reads_html_responses_as_tables() {
        let config = config();
        let extracted = extract_document(&html_response(), SourceKind::Auto, &config).unwrap();
        assert_eq!(extracted.strategy, SourceKind::HtmlTable);
        assert_eq!(extracted.value.tables.len(), 1);

        let plan = plan_for(extracted.strategy, &config.source.policy);
        let assembled = assemble_bulletin(
            "https://micm.gob.do/aviso",
            "",
            &extracted.value,
            &plan,
            &config.extract,
            now(),
        );

        assert_eq!(assembled.strategy, Some(ItemStrategy::Tables));
        let keys: Vec<&str> = assembled
            .bulletin
            .items
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(keys, vec!["gasolina_premium", "gasoil_optimo"]);

        let week = assembled.week.unwrap();
        assert_eq!(week.source, WeekSource::Document);
        assert_eq!(
            assembled.bulletin.week.start_date,
            NaiveDate::from_ymd_opt(2025, 9, 6)
        );
        assert_eq!(
            assembled.bulletin.week.end_date,
            NaiveDate::from_ymd_opt(2025, 9, 12)
        );
    }

    #[test]
    fn text_pdf_without_header_yields_no_items() {
        let config = config();
        let document = text_pdf_document(
            "Paridad de importación\nGasolina Premium 150.00\n".to_owned(),
        );
        let plan = plan_for(SourceKind::TextPdf, &config.source.policy);
        assert_eq!(plan.header_policy, HeaderPolicy::RequireHeader);

        let assembled = assemble_bulletin(
            "https://micm.gob.do/uploads/aviso-del-13-al-19-de-septiembre-de-2025.pdf",
            "",
            &document,
            &plan,
            &config.extract,
            now(),
        );

        assert!(assembled.bulletin.items.is_empty());
        assert_eq!(assembled.strategy, None);
        let week = assembled.week.unwrap();
        assert_eq!(week.source, WeekSource::Filename);
        assert_eq!(
            assembled.bulletin.week.end_date,
            NaiveDate::from_ymd_opt(2025, 9, 19)
        );
    }

    #[test]
    fn empty_document_is_an_empty_bulletin() {
        let config = config();
        let assembled = assemble_bulletin(
            "https://micm.gob.do/aviso.pdf",
            "",
            &ExtractedDocument::default(),
            &plan_for(SourceKind::ScannedPdf, &config.source.policy),
            &config.extract,
            now(),
        );
        assert!(assembled.bulletin.items.is_empty());
        assert!(assembled.bulletin.week.is_unknown());
        assert_eq!(assembled.bulletin.source, "https://micm.gob.do/aviso.pdf");
        assert_eq!(assembled.bulletin.updated_at_utc, now());
    }

    #[test]
    fn scanned_plan_uses_ocr_strategies() {
        let plan = plan_for(SourceKind::ScannedPdf, &KindPolicies::default());
        assert_eq!(
            plan.strategies,
            vec![ItemStrategy::OcrSection, ItemStrategy::OcrWholeDocument]
        );
        let plan = plan_for(SourceKind::HtmlTable, &KindPolicies::default());
        assert_eq!(
            plan.strategies,
            vec![ItemStrategy::Tables, ItemStrategy::TextSection]
        );
    }

    #[test]
    fn unreadable_pdf_degrades_in_auto_mode() {
        let fetched = FetchedDocument {
            url: "https://micm.gob.do/aviso.pdf".to_owned(),
            bytes: b"not a pdf".to_vec(),
            content_type: Some("application/pdf".to_owned()),
        };
        let config = config();
        let extracted = extract_document(&fetched, SourceKind::Auto, &config).unwrap();
        assert_eq!(extracted.strategy, SourceKind::ScannedPdf);
        assert!(extracted.value.is_empty());

        assert!(matches!(
            extract_document(&fetched, SourceKind::ScannedPdf, &config),
            Err(PipelineError::Pdf(_))
        ));
    }

    const PRICED_TEXT: &str = "Precio al Público\nGasolina Premium 290.10\n";

    #[test]
    fn priced_text_layer_skips_ocr() {
        let config = config();
        let (kind, document) = text_or_ocr(
            text_pdf_document(PRICED_TEXT.to_owned()),
            &config,
            || panic!("OCR should not run"),
        );
        assert_eq!(kind, SourceKind::TextPdf);
        assert_eq!(document.text, PRICED_TEXT);
    }

    #[test]
    fn text_layer_without_prices_falls_back_to_ocr() {
        let config = config();
        let (kind, document) = text_or_ocr(
            text_pdf_document("Aviso semanal\nVer imagen adjunta\n".to_owned()),
            &config,
            || {
                Ok(ExtractedDocument {
                    text: PRICED_TEXT.to_owned(),
                    ..ExtractedDocument::default()
                })
            },
        );
        assert_eq!(kind, SourceKind::ScannedPdf);
        assert_eq!(document.text, PRICED_TEXT);
    }

    #[test]
    fn failed_ocr_fallback_keeps_the_text_reading() {
        let config = config();
        let (kind, document) = text_or_ocr(
            text_pdf_document("Aviso semanal\n".to_owned()),
            &config,
            || {
                Err(PdfError::ToolMissing {
                    tool: "tesseract".to_owned(),
                })
            },
        );
        assert_eq!(kind, SourceKind::TextPdf);
        assert_eq!(document.text, "Aviso semanal\n");
    }

    #[test]
    fn trend_over_empty_history() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        let summary = run_trend(&dir, &NullProgress).unwrap();
        assert_eq!(summary.files, 0);
        assert!(dir.trend_path().is_file());
        assert!(dir.trend_min_path().is_file());
    }
}
