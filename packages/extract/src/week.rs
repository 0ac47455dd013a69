//! Reporting-week recovery.
//!
//! Bulletins announce their week in free text ("del 6 al 12 de septiembre
//! de 2025") that may appear in the document itself, in the link that
//! pointed at it, or in its filename. Patterns are tried in a fixed order on
//! each input in turn; the first valid calendar range wins.

use std::sync::LazyLock;

use chrono::{Datelike as _, Months, NaiveDate};
use fuel_watch_models::WeekRange;
use regex::{Captures, Regex};
use strum_macros::{AsRefStr, Display};

use crate::fold::fold;

/// `del 30 de agosto [de 2025] al 5 de septiembre de 2025`
static CROSS_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"del\s+(\d{1,2})\s+de\s+([a-z]+)(?:\s+(?:de|del)\s+(\d{4}))?(?:\s+al\s+|\s*[-\x{2013}]\s*)(\d{1,2})\s+de\s+([a-z]+)\s+(?:(?:de|del)\s+)?(\d{4})",
    )
    .expect("valid regex")
});

/// `del 6 al 12 de septiembre de 2025`, `del 6 - 12 de septiembre de 2025`
static DAY_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"del\s+(\d{1,2})(?:\s+al\s+|\s*[-\x{2013}]\s*)(\d{1,2})\s+de\s+([a-z]+)\s+(?:(?:de|del)\s+)?(\d{4})",
    )
    .expect("valid regex")
});

/// `del 06 al 12/09/2025`, `del 30/08 al 05-09-2025`
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"del\s+(\d{1,2})(?:[/-](\d{1,2}))?(?:\s+al\s+|\s*[-\x{2013}]\s*)(\d{1,2})[/-](\d{1,2})[/-](\d{4})",
    )
    .expect("valid regex")
});

/// OCR output with noise between the parts of the day-range form.
static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)del\s*(\d{1,2})\D{0,20}?\bal\s*(\d{1,2})\D{0,20}?\bde\s+([a-z]+)\D{0,20}?(\d{4})")
        .expect("valid regex")
});

/// Which pattern produced a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum WeekPattern {
    CrossMonth,
    DayRangeMonthName,
    NumericDayMonth,
    LooseOcr,
}

/// Which input a week was read from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum WeekSource {
    Document,
    LinkText,
    Filename,
}

/// A parsed week with the evidence that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekMatch {
    pub range: WeekRange,
    pub pattern: WeekPattern,
    pub source: WeekSource,
}

/// Month number for a folded Spanish month name.
#[must_use]
pub fn spanish_month(name: &str) -> Option<u32> {
    Some(match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    })
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn year(caps: &Captures<'_>, group: usize) -> Option<i32> {
    caps.get(group)?.as_str().parse().ok()
}

fn month_name(caps: &Captures<'_>, group: usize) -> Option<u32> {
    spanish_month(caps.get(group)?.as_str())
}

fn checked_range(start: NaiveDate, end: NaiveDate) -> Option<WeekRange> {
    (start <= end).then(|| WeekRange::new(start, end))
}

/// Builds a range whose start is only a day number: the start shares the
/// end's month unless its day is larger, in which case it belongs to the
/// previous month.
fn day_only_start(start_day: u32, end: NaiveDate) -> Option<WeekRange> {
    let start = if start_day > end.day() {
        let previous = end.checked_sub_months(Months::new(1))?;
        previous.with_day(start_day)?
    } else {
        end.with_day(start_day)?
    };
    checked_range(start, end)
}

fn cross_month(caps: &Captures<'_>) -> Option<WeekRange> {
    let end_year = year(caps, 6)?;
    let end = NaiveDate::from_ymd_opt(end_year, month_name(caps, 5)?, number(caps, 4)?)?;

    let start_month = month_name(caps, 2)?;
    let start_year = match year(caps, 3) {
        Some(explicit) => explicit,
        None if start_month > end.month() => end_year - 1,
        None => end_year,
    };
    let start = NaiveDate::from_ymd_opt(start_year, start_month, number(caps, 1)?)?;
    checked_range(start, end)
}

fn day_range(caps: &Captures<'_>) -> Option<WeekRange> {
    let end = NaiveDate::from_ymd_opt(year(caps, 4)?, month_name(caps, 3)?, number(caps, 2)?)?;
    day_only_start(number(caps, 1)?, end)
}

fn numeric(caps: &Captures<'_>) -> Option<WeekRange> {
    let end_year = year(caps, 5)?;
    let end = NaiveDate::from_ymd_opt(end_year, number(caps, 4)?, number(caps, 3)?)?;
    let start_day = number(caps, 1)?;

    match number(caps, 2) {
        Some(start_month) => {
            let start_year = if start_month > end.month() {
                end_year - 1
            } else {
                end_year
            };
            let start = NaiveDate::from_ymd_opt(start_year, start_month, start_day)?;
            checked_range(start, end)
        }
        None => day_only_start(start_day, end),
    }
}

type PatternFn = fn(&Captures<'_>) -> Option<WeekRange>;

fn patterns() -> [(WeekPattern, &'static Regex, PatternFn); 4] {
    [
        (WeekPattern::CrossMonth, &*CROSS_MONTH_RE, cross_month as PatternFn),
        (WeekPattern::DayRangeMonthName, &*DAY_RANGE_RE, day_range),
        (WeekPattern::NumericDayMonth, &*NUMERIC_RE, numeric),
        (WeekPattern::LooseOcr, &*LOOSE_RE, day_range),
    ]
}

/// Parses a week range out of free text.
///
/// Each pattern is applied to every occurrence in the text before the next
/// pattern is tried; an occurrence that does not form a valid calendar
/// range is skipped.
#[must_use]
pub fn parse_week_text(text: &str) -> Option<(WeekRange, WeekPattern)> {
    let folded = fold(text);

    patterns().into_iter().find_map(|(pattern, re, build)| {
        re.captures_iter(&folded)
            .find_map(|caps| build(&caps))
            .map(|range| (range, pattern))
    })
}

/// Turns the last path segment of a document URL into searchable text:
/// percent-decoded, with runs of `_`, `-` and `.` replaced by spaces.
#[must_use]
pub fn filename_hint(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_owned(), |d| d.into_owned());

    let mut out = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        if matches!(c, '_' | '-' | '.') {
            if !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Recovers the reporting week from the document text, then the link's
/// anchor text, then the document's filename.
#[must_use]
pub fn parse_week(document_text: &str, link_text: &str, url: &str) -> Option<WeekMatch> {
    let filename = filename_hint(url);
    let inputs = [
        (WeekSource::Document, document_text),
        (WeekSource::LinkText, link_text),
        (WeekSource::Filename, filename.as_str()),
    ];

    inputs.into_iter().find_map(|(source, text)| {
        parse_week_text(text).map(|(range, pattern)| WeekMatch {
            range,
            pattern,
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> WeekRange {
        WeekRange::new(date(start), date(end))
    }

    #[test]
    fn parses_cross_month_range() {
        let (week, pattern) =
            parse_week_text("Semana del 30 de agosto al 5 de septiembre de 2025").unwrap();
        assert_eq!(week, range("2025-08-30", "2025-09-05"));
        assert_eq!(pattern, WeekPattern::CrossMonth);
    }

    #[test]
    fn cross_year_range_rolls_start_year_back() {
        let (week, _) = parse_week_text("del 29 de diciembre al 4 de enero de 2026").unwrap();
        assert_eq!(week, range("2025-12-29", "2026-01-04"));
    }

    #[test]
    fn parses_day_range_with_month_name() {
        let (week, pattern) =
            parse_week_text("PRECIOS DEL 6 AL 12 DE SEPTIEMBRE DE 2025").unwrap();
        assert_eq!(week, range("2025-09-06", "2025-09-12"));
        assert_eq!(pattern, WeekPattern::DayRangeMonthName);
    }

    #[test]
    fn dash_separates_the_days() {
        let (week, pattern) =
            parse_week_text("Semana del 6 - 12 de septiembre de 2025").unwrap();
        assert_eq!(week, range("2025-09-06", "2025-09-12"));
        assert_eq!(pattern, WeekPattern::DayRangeMonthName);

        let (week, pattern) =
            parse_week_text("del 30 de agosto \u{2013} 5 de septiembre de 2025").unwrap();
        assert_eq!(week, range("2025-08-30", "2025-09-05"));
        assert_eq!(pattern, WeekPattern::CrossMonth);
    }

    #[test]
    fn day_only_start_rolls_back_a_month() {
        let (week, _) = parse_week_text("del 27 al 2 de enero de 2026").unwrap();
        assert_eq!(week, range("2025-12-27", "2026-01-02"));
    }

    #[test]
    fn accepts_setiembre() {
        let (week, _) = parse_week_text("del 13 al 19 de setiembre de 2025").unwrap();
        assert_eq!(week, range("2025-09-13", "2025-09-19"));
    }

    #[test]
    fn parses_numeric_forms() {
        let (week, pattern) = parse_week_text("vigente del 06 al 12/09/2025").unwrap();
        assert_eq!(week, range("2025-09-06", "2025-09-12"));
        assert_eq!(pattern, WeekPattern::NumericDayMonth);

        let (week, _) = parse_week_text("del 30-08 al 05-09-2025").unwrap();
        assert_eq!(week, range("2025-08-30", "2025-09-05"));
    }

    #[test]
    fn parses_noisy_ocr_form() {
        let (week, pattern) =
            parse_week_text("del  6 , | al 12 ;\nde septiembre . de 2025").unwrap();
        assert_eq!(week, range("2025-09-06", "2025-09-12"));
        assert_eq!(pattern, WeekPattern::LooseOcr);
    }

    #[test]
    fn invalid_dates_fall_through() {
        assert_eq!(parse_week_text("del 30 al 31 de febrero de 2025"), None);
        assert_eq!(parse_week_text("del 1 al 7 de brumario de 2025"), None);
        assert_eq!(parse_week_text("sin fecha"), None);
    }

    #[test]
    fn filename_hint_cleans_separators() {
        assert_eq!(
            filename_hint("https://micm.gob.do/x/Aviso_precios-del_6_al_12_de_septiembre__2025.pdf?v=1"),
            "Aviso precios del 6 al 12 de septiembre 2025 pdf"
        );
        assert_eq!(
            filename_hint("https://micm.gob.do/Aviso%20del%206%20al%2012%20de%20julio%202025.pdf"),
            "Aviso del 6 al 12 de julio 2025 pdf"
        );
    }

    #[test]
    fn sources_are_tried_in_priority_order() {
        let url = "https://micm.gob.do/aviso-del-6-al-12-de-septiembre-de-2025.pdf";

        let from_doc = parse_week(
            "del 13 al 19 de septiembre de 2025",
            "del 20 al 26 de septiembre de 2025",
            url,
        )
        .unwrap();
        assert_eq!(from_doc.source, WeekSource::Document);
        assert_eq!(from_doc.range, range("2025-09-13", "2025-09-19"));

        let from_link = parse_week("", "Aviso del 20 al 26 de septiembre de 2025", url).unwrap();
        assert_eq!(from_link.source, WeekSource::LinkText);

        let from_file = parse_week("", "Aviso semanal", url).unwrap();
        assert_eq!(from_file.source, WeekSource::Filename);
        assert_eq!(from_file.range, range("2025-09-06", "2025-09-12"));

        assert_eq!(parse_week("", "", "https://micm.gob.do/aviso.pdf"), None);
    }
}
