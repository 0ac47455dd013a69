//! Intermediate document representations.
//!
//! Extractors (HTML, PDF text layer, OCR) reduce a downloaded document to
//! plain text, [`Table`]s, or [`PositionedLine`]s. The heuristics only ever
//! see these types, never the raw bytes.

use serde::{Deserialize, Serialize};

/// A table as rows of trimmed cell text. Blank rows are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table, trimming cells and dropping rows with no content.
    #[must_use]
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.as_ref().trim().to_owned())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        Self { rows }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One OCR word with its bounding box in image pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Reading-order position of an OCR line.
///
/// Field order matters: the derived `Ord` sorts by page, then block, then
/// paragraph, then line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    /// Zero-based page index within the PDF.
    pub page: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
}

impl LineKey {
    /// Returns `true` when `other` belongs to the same page, block and
    /// paragraph.
    #[must_use]
    pub const fn same_paragraph(&self, other: &Self) -> bool {
        self.page == other.page && self.block == other.block && self.paragraph == other.paragraph
    }
}

/// A text line reconstructed from positioned OCR words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedLine {
    pub key: LineKey,
    /// Words joined by single spaces, left to right.
    pub text: String,
    pub x_min: u32,
    pub x_max: u32,
    /// Mean vertical centre of the line's words.
    pub y: f64,
    /// Sorted by `(left, top)`.
    pub words: Vec<PositionedWord>,
}
