//! Text folding applied symmetrically to documents and configuration.
//!
//! Every heuristic compares *folded* text: lowercase, Spanish accents
//! stripped, non-breaking spaces and tabs turned into spaces, and runs of
//! spaces collapsed. Line breaks are preserved because line structure
//! carries meaning in bulletins.

use std::sync::LazyLock;

use fuel_watch_models::document::PositionedLine;
use regex::Regex;

/// Parenthetical notes such as `(GLP)` or `(*)`.
static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));

const fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        '³' => '3',
        '\u{a0}' | '\t' | '\u{2007}' | '\u{202f}' => ' ',
        _ => c,
    }
}

/// Folds `text` for matching.
#[must_use]
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;

    for raw in text.chars() {
        if raw == '\r' {
            continue;
        }
        let c = fold_char(raw);
        if c == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        out.extend(c.to_lowercase());
    }

    out
}

/// Folds a short label: parenthetical notes are removed and the result is
/// trimmed onto a single line.
#[must_use]
pub fn fold_label(text: &str) -> String {
    let folded = fold(text);
    let stripped = PARENTHETICAL_RE.replace_all(&folded, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An OCR line paired with its folded text.
#[derive(Debug, Clone)]
pub struct FoldedLine<'a> {
    pub source: &'a PositionedLine,
    pub text: String,
}

/// Folds every line of an OCR page set, keeping reading order.
#[must_use]
pub fn fold_lines(lines: &[PositionedLine]) -> Vec<FoldedLine<'_>> {
    lines
        .iter()
        .map(|line| FoldedLine {
            source: line,
            text: fold(&line.text),
        })
        .collect()
}
