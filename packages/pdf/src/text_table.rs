//! Table reconstruction from column-aligned PDF text.
//!
//! Text extraction keeps the horizontal layout of a table as runs of
//! spaces. Splitting each line on two or more spaces (or tabs) recovers its
//! cells; consecutive lines with at least two cells form one table.

use std::sync::LazyLock;

use fuel_watch_models::document::Table;
use regex::Regex;

/// Gap between two cells of a column-aligned line.
static CELL_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]{2,}|\t").expect("valid regex"));

/// Splits a line into cells; single spaces stay inside a cell.
#[must_use]
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_GAP_RE
        .split(line.trim())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Rebuilds tables from `text`.
///
/// A line with fewer than two cells closes the current table. Blank lines
/// inside a table are skipped so a table split by a stray empty line stays
/// whole.
#[must_use]
pub fn tables_from_text(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let cells = split_cells(line);
        if cells.len() >= 2 {
            rows.push(cells);
        } else if !rows.is_empty() {
            tables.push(Table::from_rows(std::mem::take(&mut rows)));
        }
    }

    if !rows.is_empty() {
        tables.push(Table::from_rows(rows));
    }

    log::debug!("Rebuilt {} tables from PDF text", tables.len());
    tables
}
