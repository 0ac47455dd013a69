//! Pairing fuel labels with prices.
//!
//! Three shapes of input are supported, one per extractor:
//!
//! * [`match_text`]: a folded text window (PDF text layer, HTML text)
//! * [`match_lines`]: OCR lines with word boxes
//! * [`match_tables`]: tables with a header row
//!
//! Every mode yields at most one item per canonical key and returns items in
//! catalog order.

use std::collections::BTreeSet;
use std::ops::Range;

use fuel_watch_models::document::Table;
use fuel_watch_models::{ChangeType, PriceChange, PriceItem};

use crate::config::{ChangeSettings, ExtractConfig, PriceBounds, TableSettings};
use crate::fold::{FoldedLine, fold, fold_label};
use crate::labels::{Fuel, FuelCatalog};
use crate::numbers::{NumberToken, first_number, number_tokens, round2};

/// Byte offset `chars` characters after `start`, clamped to the end.
fn char_limit(text: &str, start: usize, chars: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| start + offset)
}

fn price_token(tokens: &[NumberToken], price: PriceBounds) -> Option<&NumberToken> {
    tokens
        .iter()
        .find(|t| t.is_price_within(price.min, price.max))
}

/// Reads the change announcement in folded text following a price.
///
/// The earliest change word decides the direction; the first number after
/// it, if any, becomes the amount. A bare `same` announcement carries no
/// amount.
#[must_use]
pub fn detect_change(folded: &str, words: &ChangeSettings) -> Option<PriceChange> {
    let candidates = [
        (ChangeType::Up, &words.up),
        (ChangeType::Down, &words.down),
        (ChangeType::Same, &words.same),
    ];

    let (kind, at, len) = candidates
        .iter()
        .flat_map(|(kind, list)| {
            list.iter()
                .filter_map(move |w| folded.find(w.as_str()).map(|at| (*kind, at, w.len())))
        })
        .min_by_key(|&(_, at, len)| (at, std::cmp::Reverse(len)))?;

    let amount_dop = match kind {
        ChangeType::Same => None,
        ChangeType::Up | ChangeType::Down => number_tokens(&folded[at + len..])
            .first()
            .map(|t| round2(t.value)),
    };

    Some(PriceChange { kind, amount_dop })
}

fn in_catalog_order(mut items: Vec<PriceItem>, catalog: &FuelCatalog) -> Vec<PriceItem> {
    let mut seen = BTreeSet::new();
    items.retain(|item| seen.insert(item.key.clone()));
    items.sort_by_key(|item| catalog.position(&item.key).unwrap_or(usize::MAX));
    items
}

/// Reads the item for `fuel` from the window opened by one label match.
fn text_item(
    window: &str,
    label: &Range<usize>,
    fuel: &Fuel,
    config: &ExtractConfig,
) -> Option<PriceItem> {
    let mut end = char_limit(window, label.end, config.window.text_chars);
    if let Some(next) = config
        .catalog
        .next_label_start(window, label.end, &fuel.key)
    {
        end = end.min(next);
    }
    let chunk = &window[label.end..end];

    let tokens = number_tokens(chunk);
    let token = price_token(&tokens, config.price)?;

    let rest = &chunk[token.span.end..];
    let rest = rest.split('\n').next().unwrap_or(rest);
    let change = detect_change(rest, &config.change);

    Some(fuel.item(token.value, change))
}

/// Matches fuels against a folded text window.
///
/// Each alias occurrence opens a search window of `window.text_chars`
/// characters, cut short where another fuel's label begins. The nearest
/// price-shaped number inside the price band wins; occurrences without one
/// (a label named in a heading, say) are passed over.
#[must_use]
pub fn match_text(window: &str, config: &ExtractConfig) -> Vec<PriceItem> {
    let mut items = Vec::new();

    for fuel in config.catalog.fuels() {
        let mut cursor = 0;
        let mut found = None;

        while let Some(label) = fuel.find_from(window, cursor) {
            found = text_item(window, &label, fuel, config);
            if found.is_some() {
                break;
            }
            cursor = if label.is_empty() {
                window[label.end..]
                    .chars()
                    .next()
                    .map_or(window.len() + 1, |c| label.end + c.len_utf8())
            } else {
                label.end
            };
        }

        match found {
            Some(item) => items.push(item),
            None => log::debug!("No price near label for {}", fuel.key),
        }
    }

    items
}

/// A price read from one OCR line.
struct LinePrice {
    value: f64,
    /// Text after the price on the same line.
    rest: String,
}

fn price_in_line(line: &FoldedLine<'_>, price: PriceBounds) -> Option<LinePrice> {
    let words = &line.source.words;

    if words.is_empty() {
        let token = number_tokens(&line.text)
            .into_iter()
            .rfind(|t| t.is_price_within(price.min, price.max))?;
        return Some(LinePrice {
            value: token.value,
            rest: line.text[token.span.end..].to_owned(),
        });
    }

    let (index, value) = words
        .iter()
        .enumerate()
        .filter_map(|(i, word)| {
            price_token(&number_tokens(&word.text), price).map(|t| (i, word.right, t.value))
        })
        .max_by_key(|&(_, right, _)| right)
        .map(|(i, _, value)| (i, value))?;

    let rest = words[index + 1..]
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(LinePrice {
        value,
        rest: fold(&rest),
    })
}

/// Finds a price on the lines following `lines[index]`: at most
/// `next_lines` lines, stopping at the first line of another paragraph,
/// line number one or two past the label's, skipping lines that announce a
/// change.
fn price_below(
    lines: &[FoldedLine<'_>],
    index: usize,
    config: &ExtractConfig,
) -> Option<LinePrice> {
    let anchor = lines[index].source.key;

    lines
        .iter()
        .skip(index + 1)
        .take(config.window.next_lines)
        .take_while(|line| line.source.key.same_paragraph(&anchor))
        .filter(|line| {
            let line = line.source.key.line;
            line == anchor.line + 1 || line == anchor.line + 2
        })
        .filter(|line| {
            !config
                .change
                .skip_line_words
                .iter()
                .any(|w| line.text.contains(w.as_str()))
        })
        .find_map(|line| price_in_line(line, config.price))
}

/// Matches fuels against OCR lines.
///
/// The price is the rightmost in-band price-shaped word of the label's own
/// line; failing that, a nearby line of the same paragraph is tried. A label
/// line with neither is passed over for the next line naming the fuel.
#[must_use]
pub fn match_lines(lines: &[FoldedLine<'_>], config: &ExtractConfig) -> Vec<PriceItem> {
    let mut items = Vec::new();

    for fuel in config.catalog.fuels() {
        let found = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| fuel.matches(&line.text))
            .find_map(|(index, line)| {
                price_in_line(line, config.price).or_else(|| price_below(lines, index, config))
            });

        match found {
            Some(LinePrice { value, rest }) => {
                let change = detect_change(&rest, &config.change);
                items.push(fuel.item(value, change));
            }
            None => log::debug!("OCR line for {} has no price", fuel.key),
        }
    }

    items
}

fn find_column(row: &[String], hints: &[String], exclude: Option<usize>) -> Option<usize> {
    row.iter()
        .enumerate()
        .filter(|&(i, _)| Some(i) != exclude)
        .find(|(_, cell)| {
            let folded = fold_label(cell);
            hints.iter().any(|h| folded.contains(h.as_str()))
        })
        .map(|(i, _)| i)
}

/// Column indices resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableLayout {
    header_row: usize,
    label: usize,
    price: usize,
    change: Option<usize>,
}

fn table_layout(table: &Table, hints: &TableSettings) -> Option<TableLayout> {
    table
        .rows
        .iter()
        .take(2)
        .enumerate()
        .find_map(|(header_row, row)| {
            let price = find_column(row, &hints.price_column_hints, None)?;
            let label = find_column(row, &hints.label_column_hints, Some(price)).unwrap_or(0);
            let change = find_column(row, &hints.change_column_hints, Some(price));
            Some(TableLayout {
                header_row,
                label,
                price,
                change,
            })
        })
}

/// Reads a change cell: either words (`sube 3.00`) or a signed number
/// (`-3.00`, `+1,50`, `0.00`).
fn parse_change_cell(cell: &str, words: &ChangeSettings) -> Option<PriceChange> {
    let folded = fold(cell);
    let folded = folded.trim();
    if folded.is_empty() {
        return None;
    }
    if let Some(change) = detect_change(folded, words) {
        return Some(change);
    }

    let token = number_tokens(folded).into_iter().next()?;
    let negative = folded[..token.span.start]
        .trim_end()
        .ends_with(['-', '\u{2212}']);
    let amount = round2(token.value);

    let kind = if amount == 0.0 {
        ChangeType::Same
    } else if negative {
        ChangeType::Down
    } else {
        ChangeType::Up
    };

    Some(PriceChange {
        kind,
        amount_dop: Some(amount),
    })
}

fn table_items(table: &Table, layout: TableLayout, config: &ExtractConfig) -> Vec<PriceItem> {
    let mut items = Vec::new();

    for row in table.rows.iter().skip(layout.header_row + 1) {
        let (Some(label), Some(price_cell)) = (row.get(layout.label), row.get(layout.price))
        else {
            continue;
        };
        let Some(fuel) = config.catalog.classify(label) else {
            continue;
        };
        let Some(price) = first_number(price_cell) else {
            continue;
        };
        if !config.price.contains(price) {
            log::debug!("Discarding out-of-band price {price} for {}", fuel.key);
            continue;
        }

        let change = layout
            .change
            .and_then(|c| row.get(c))
            .and_then(|cell| parse_change_cell(cell, &config.change));

        items.push(fuel.item(price, change));
    }

    items
}

/// Matches fuels against tables; the first table yielding any item wins.
#[must_use]
pub fn match_tables(tables: &[Table], config: &ExtractConfig) -> Vec<PriceItem> {
    for (index, table) in tables.iter().enumerate() {
        let Some(layout) = table_layout(table, &config.table) else {
            continue;
        };
        let items = table_items(table, layout, config);
        if !items.is_empty() {
            log::debug!("Table {index} yielded {} items", items.len());
            return in_catalog_order(items, &config.catalog);
        }
    }

    Vec::new()
}
