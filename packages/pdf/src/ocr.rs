//! OCR of scanned bulletins.
//!
//! Pages are rendered with `pdftoppm` and recognised with `tesseract` in
//! TSV mode, which reports every word with its bounding box and its
//! `(block, paragraph, line)` position. Words are regrouped into
//! [`PositionedLine`]s in reading order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use fuel_watch_models::document::{LineKey, PositionedLine, PositionedWord};
use serde::Deserialize;

use crate::PdfError;

/// Rendering and recognition settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    /// Zero-based page indices to recognise.
    pub pages: Vec<u32>,
    pub dpi: u32,
    /// Tesseract language set tried first.
    pub languages: String,
    /// Language set used when the first one fails (e.g. `spa` data is not
    /// installed).
    pub fallback_languages: String,
    /// Tesseract page segmentation mode.
    pub psm: u8,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            pages: vec![0, 1],
            dpi: 330,
            languages: "spa+eng".to_owned(),
            fallback_languages: "eng".to_owned(),
            psm: 6,
        }
    }
}

fn require_tool(tool: &str) -> Result<(), PdfError> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| PdfError::ToolMissing {
            tool: tool.to_owned(),
        })
}

fn run(command: &mut Command, tool: &str) -> Result<Vec<u8>, PdfError> {
    let output = command.output()?;
    if !output.status.success() {
        return Err(PdfError::ToolFailed {
            tool: tool.to_owned(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output.stdout)
}

/// Renders one page (zero-based) to a PNG next to `pdf` and returns its
/// path.
fn render_page(pdf: &Path, page: u32, dpi: u32) -> Result<PathBuf, PdfError> {
    let page_no = (page + 1).to_string();
    let prefix = pdf.with_file_name(format!("page-{page}"));

    run(
        Command::new("pdftoppm")
            .args(["-r", dpi.to_string().as_str()])
            .args(["-f", page_no.as_str(), "-l", page_no.as_str()])
            .args(["-png", "-singlefile"])
            .arg(pdf)
            .arg(&prefix),
        "pdftoppm",
    )?;

    let image = prefix.with_extension("png");
    if !image.is_file() {
        return Err(PdfError::ToolFailed {
            tool: "pdftoppm".to_owned(),
            message: format!("no image written for page {page}"),
        });
    }
    Ok(image)
}

fn tesseract_tsv(image: &Path, languages: &str, psm: u8) -> Result<String, PdfError> {
    let stdout = run(
        Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", languages])
            .args(["--psm", psm.to_string().as_str()])
            .arg("tsv"),
        "tesseract",
    )?;
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

fn recognise_page(
    pdf: &Path,
    page: u32,
    options: &OcrOptions,
) -> Result<Vec<PositionedLine>, PdfError> {
    let image = render_page(pdf, page, options.dpi)?;

    let tsv = match tesseract_tsv(&image, &options.languages, options.psm) {
        Ok(tsv) => tsv,
        Err(e) if options.fallback_languages != options.languages => {
            log::warn!(
                "tesseract -l {} failed ({e}), retrying with -l {}",
                options.languages,
                options.fallback_languages
            );
            tesseract_tsv(&image, &options.fallback_languages, options.psm)?
        }
        Err(e) => return Err(e),
    };

    Ok(parse_tsv(&tsv, page))
}

/// Renders and recognises the configured pages of a PDF.
///
/// Pages that fail (typically a second page the bulletin does not have)
/// are logged and skipped.
///
/// # Errors
///
/// Returns [`PdfError::ToolMissing`] when `pdftoppm` or `tesseract` is
/// not installed, and the last page error when no page could be
/// recognised.
pub fn ocr_pdf(bytes: &[u8], options: &OcrOptions) -> Result<Vec<PositionedLine>, PdfError> {
    require_tool("pdftoppm")?;
    require_tool("tesseract")?;

    let dir = tempfile::tempdir()?;
    let pdf = dir.path().join("bulletin.pdf");
    std::fs::write(&pdf, bytes)?;

    let mut lines = Vec::new();
    let mut last_error = None;
    let mut recognised = 0_usize;

    for &page in &options.pages {
        match recognise_page(&pdf, page, options) {
            Ok(page_lines) => {
                log::debug!("OCR page {page}: {} lines", page_lines.len());
                recognised += 1;
                lines.extend(page_lines);
            }
            Err(e) => {
                log::warn!("OCR of page {page} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if recognised == 0 => Err(e),
        _ => {
            log::info!("OCR produced {} lines from {recognised} pages", lines.len());
            Ok(lines)
        }
    }
}

/// Column positions resolved from a TSV header.
struct Columns {
    block: usize,
    paragraph: usize,
    line: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    conf: usize,
    text: usize,
}

impl Columns {
    fn from_header(header: &str) -> Option<Self> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &str| names.iter().position(|n| *n == name);
        Some(Self {
            block: find("block_num")?,
            paragraph: find("par_num")?,
            line: find("line_num")?,
            left: find("left")?,
            top: find("top")?,
            width: find("width")?,
            height: find("height")?,
            conf: find("conf")?,
            text: find("text")?,
        })
    }
}

/// Groups the words of a tesseract TSV report into lines.
///
/// Rows with negative confidence (structural rows) or empty text are
/// dropped. Words of a line are sorted by `(left, top)` and joined with a
/// single space; `y` is the mean vertical centre of the words.
#[must_use]
pub fn parse_tsv(tsv: &str, page: u32) -> Vec<PositionedLine> {
    let mut rows = tsv.lines();
    let Some(columns) = rows.next().and_then(Columns::from_header) else {
        log::warn!("tesseract output has no TSV header");
        return Vec::new();
    };

    let mut grouped: BTreeMap<LineKey, Vec<PositionedWord>> = BTreeMap::new();

    for row in rows {
        let fields: Vec<&str> = row.split('\t').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        let number = |i: usize| field(i).trim().parse::<u32>().ok();

        let text = field(columns.text).trim();
        let conf = field(columns.conf).trim().parse::<f64>().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let (Some(block), Some(paragraph), Some(line)) = (
            number(columns.block),
            number(columns.paragraph),
            number(columns.line),
        ) else {
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) = (
            number(columns.left),
            number(columns.top),
            number(columns.width),
            number(columns.height),
        ) else {
            continue;
        };

        grouped
            .entry(LineKey {
                page,
                block,
                paragraph,
                line,
            })
            .or_default()
            .push(PositionedWord {
                text: text.to_owned(),
                left,
                top,
                right: left + width,
                bottom: top + height,
            });
    }

    grouped
        .into_iter()
        .map(|(key, mut words)| {
            words.sort_by_key(|w| (w.left, w.top));
            let text = words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let x_min = words.iter().map(|w| w.left).min().unwrap_or(0);
            let x_max = words.iter().map(|w| w.right).max().unwrap_or(0);
            #[allow(clippy::cast_precision_loss)]
            let y = words
                .iter()
                .map(|w| f64::from(w.top) + f64::from(w.bottom - w.top) / 2.0)
                .sum::<f64>()
                / words.len() as f64;

            PositionedLine {
                key,
                text,
                x_min,
                x_max,
                y,
                words,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn groups_words_into_sorted_lines() {
        let report = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t2550\t3300\t-1\t",
            "4\t1\t2\t1\t1\t0\t100\t400\t900\t40\t-1\t",
            "5\t1\t2\t1\t1\t2\t260\t402\t120\t36\t91.5\tRegular",
            "5\t1\t2\t1\t1\t1\t100\t400\t140\t40\t95.0\tGasoil",
            "5\t1\t2\t1\t1\t3\t800\t398\t100\t44\t88\t224.60",
            "5\t1\t1\t1\t1\t1\t100\t100\t300\t50\t96\tPRECIO",
            "5\t1\t1\t1\t1\t2\t420\t100\t200\t50\t96\t ",
        ]);
        let lines = parse_tsv(&report, 0);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "PRECIO");
        assert_eq!(lines[0].key.block, 1);

        let gasoil = &lines[1];
        assert_eq!(gasoil.text, "Gasoil Regular 224.60");
        assert_eq!(gasoil.x_min, 100);
        assert_eq!(gasoil.x_max, 900);
        assert_eq!(gasoil.words[2].right, 900);
        assert!((gasoil.y - 420.0).abs() < 1e-9);
    }

    #[test]
    fn page_index_comes_from_caller() {
        let report = tsv(&["5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t90\tAvtur"]);
        let lines = parse_tsv(&report, 1);
        assert_eq!(lines[0].key.page, 1);
    }

    #[test]
    fn missing_header_yields_nothing() {
        assert!(parse_tsv("", 0).is_empty());
        assert!(parse_tsv("garbage\nrows", 0).is_empty());
    }

    #[test]
    fn default_options_render_first_two_pages() {
        let options = OcrOptions::default();
        assert_eq!(options.pages, vec![0, 1]);
        assert_eq!(options.dpi, 330);
        assert_eq!(options.languages, "spa+eng");
    }
}
