//! Tables and text from HTML bulletins.
//!
//! Some weeks the ministry publishes the prices as an HTML page instead of
//! a PDF. Every `<table>` becomes a [`Table`] of cell text; the page text is
//! kept line by line so the text heuristics and the week parser can run on
//! it too.

use fuel_watch_models::document::Table;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::ScrapeError;

/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "br", "caption", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "main", "ol", "p", "section", "table", "td", "th",
    "tr", "ul",
];

/// Elements whose text is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts every `<table>` in document order.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if a built-in selector fails to parse.
pub fn extract_tables(html: &str) -> Result<Vec<Table>, ScrapeError> {
    let document = Html::parse_document(html);
    let table_sel = parse_selector("table")?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("th, td")?;

    let tables: Vec<Table> = document
        .select(&table_sel)
        .map(|table| {
            Table::from_rows(
                table
                    .select(&row_sel)
                    .map(|row| row.select(&cell_sel).map(cell_text).collect::<Vec<_>>()),
            )
        })
        .filter(|table| !table.is_empty())
        .collect();

    log::debug!("Found {} HTML tables", tables.len());
    Ok(tables)
}

/// Returns the visible page text, one block element per line, whitespace
/// collapsed within each line.
#[must_use]
pub fn html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                raw.push('\n');
            }
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                });
                if !hidden {
                    raw.push_str(text);
                    raw.push(' ');
                }
            }
            _ => {}
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
