//! Locale-ambiguous number parsing.
//!
//! Bulletins mix `290.10`, `290,10` and `1.234,56`. The rules:
//!
//! * both `.` and `,` present: `.` groups thousands, `,` is the decimal mark
//! * only `,` present: `,` is the decimal mark
//! * stray separators at either end (`6.85.`) are ignored

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// A maximal run of digits and separators starting with a digit.
static NUMBER_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("valid regex"));

/// Parses a single numeric token.
///
/// Returns `None` when the token has no digits or is still ambiguous after
/// applying the separator rules (e.g. `1.234.567`).
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c == '.' || c == ',' || c.is_whitespace());
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let normalized = if trimmed.contains(',') && trimmed.contains('.') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.replace(',', ".")
    };

    normalized.parse::<f64>().ok()
}

/// A number found inside a longer string.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberToken {
    /// Byte range of the token (separators at the end included).
    pub span: Range<usize>,
    pub value: f64,
    /// The token ends in a decimal mark followed by exactly two digits, the
    /// shape every published price has.
    pub price_shaped: bool,
}

impl NumberToken {
    /// Returns `true` when this token could be a published price inside
    /// `[min, max]`.
    #[must_use]
    pub fn is_price_within(&self, min: f64, max: f64) -> bool {
        self.price_shaped && (min..=max).contains(&self.value)
    }
}

fn is_price_shaped(raw: &str) -> bool {
    let trimmed = raw.trim_end_matches(['.', ',']);
    let Some(sep) = trimmed.rfind(['.', ',']) else {
        return false;
    };
    let decimals = &trimmed[sep + 1..];
    decimals.len() == 2 && decimals.chars().all(|c| c.is_ascii_digit())
}

/// Returns every parseable number in `text`, left to right.
#[must_use]
pub fn number_tokens(text: &str) -> Vec<NumberToken> {
    NUMBER_TOKEN_RE
        .find_iter(text)
        .filter_map(|m| {
            let value = parse_number(m.as_str())?;
            Some(NumberToken {
                span: m.range(),
                value,
                price_shaped: is_price_shaped(m.as_str()),
            })
        })
        .collect()
}

/// Returns the first parseable number in `text`.
#[must_use]
pub fn first_number(text: &str) -> Option<f64> {
    number_tokens(text).first().map(|t| t.value)
}

/// Rounds to two decimals, the precision prices are published with.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
