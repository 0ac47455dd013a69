//! Locating the official public-price block.
//!
//! Bulletins print several price tables: the public price the ministry
//! fixes, import parity, price structure. Only the first matters. The block
//! starts at a header phrase and ends at the first terminator phrase.

use serde::Deserialize;

use crate::fold::FoldedLine;

/// Folded header and terminator phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarkers {
    pub headers: Vec<String>,
    pub terminators: Vec<String>,
}

/// What to do when no header phrase is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Return an empty window so nothing is extracted.
    RequireHeader,
    /// Scan the whole document and rely on the price band.
    #[default]
    FallbackToWhole,
}

/// A located window of folded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSection<'a> {
    pub window: &'a str,
    pub header_found: bool,
    /// A terminator phrase cut the window short.
    pub terminated: bool,
}

/// A located run of OCR lines.
#[derive(Debug, Clone, Copy)]
pub struct LineSection<'a, 'b> {
    pub lines: &'b [FoldedLine<'a>],
    pub header_found: bool,
    pub terminated: bool,
}

fn earliest(haystack: &str, needles: &[String]) -> Option<(usize, usize)> {
    needles
        .iter()
        .filter_map(|n| haystack.find(n.as_str()).map(|at| (at, n.len())))
        .min_by_key(|&(at, _)| at)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Byte offset `chars` characters after `start`, clamped to the end.
fn advance_chars(text: &str, start: usize, chars: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| start + offset)
}

/// Slices folded `text` to the public-price block.
///
/// The window starts at the earliest header phrase, spans at most
/// `block_chars` characters, and stops at the first terminator after the
/// header.
#[must_use]
pub fn locate_text<'a>(
    text: &'a str,
    markers: &SectionMarkers,
    policy: HeaderPolicy,
    block_chars: usize,
) -> TextSection<'a> {
    let Some((start, header_len)) = earliest(text, &markers.headers) else {
        log::debug!("No section header found (policy {policy:?})");
        let window = match policy {
            HeaderPolicy::RequireHeader => "",
            HeaderPolicy::FallbackToWhole => text,
        };
        return TextSection {
            window,
            header_found: false,
            terminated: false,
        };
    };

    let limit = advance_chars(text, start, block_chars);
    let body_start = (start + header_len).min(limit);
    let terminator = earliest(&text[body_start..limit], &markers.terminators);
    let end = terminator.map_or(limit, |(at, _)| body_start + at);

    TextSection {
        window: &text[start..end],
        header_found: true,
        terminated: terminator.is_some(),
    }
}

/// Slices OCR lines to the public-price block: from the first line
/// containing a header phrase up to (excluding) the next line containing a
/// terminator.
#[must_use]
pub fn locate_lines<'a, 'b>(
    lines: &'b [FoldedLine<'a>],
    markers: &SectionMarkers,
    policy: HeaderPolicy,
) -> LineSection<'a, 'b> {
    let Some(start) = lines
        .iter()
        .position(|line| contains_any(&line.text, &markers.headers))
    else {
        let lines = match policy {
            HeaderPolicy::RequireHeader => &lines[..0],
            HeaderPolicy::FallbackToWhole => lines,
        };
        return LineSection {
            lines,
            header_found: false,
            terminated: false,
        };
    };

    let end = lines[start + 1..]
        .iter()
        .position(|line| contains_any(&line.text, &markers.terminators))
        .map(|offset| start + 1 + offset);

    LineSection {
        lines: &lines[start..end.unwrap_or(lines.len())],
        header_found: true,
        terminated: end.is_some(),
    }
}
