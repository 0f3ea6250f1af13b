//! Functions to parse CSV rows from Vpass and e-Navi credit card statements.

use csv::{ReaderBuilder, StringRecord};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{csv_import::normalize::nfkc, statement::StatementRecord};

/// Usage dates are exported as `2024/01/15`; anything else is noise.
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]/[month]/[day]");

/// Data rows have at least date, store, price, payment count, installment
/// count and payment amount.
const MIN_FIELD_COUNT: usize = 6;

/// A data row with a note and an unsplit store name has exactly 7 fields.
const CANONICAL_FIELD_COUNT: usize = 7;

/// The fields to the right of the store name: price, payment count,
/// installment count, payment amount, note. Anchored to the row's end so
/// store names containing the delimiter cannot shift them.
const TRAILING_FIELD_COUNT: usize = 5;

/// How a raw statement row should be handled.
#[derive(Debug, PartialEq)]
enum RowKind {
    /// Announces the masked card number that governs the rows below it.
    /// Yields no record.
    CardNumber(String),
    /// A transaction row, with its eagerly parsed usage date.
    Transaction(Date),
    /// A header, total or otherwise malformed row. Dropped without comment,
    /// the exports always contain these.
    Skip,
}

/// Classifies a raw row.
///
/// Card number markers are detected before the length and date checks: marker
/// rows are often too short to be data rows and never carry a date.
fn classify_row(row: &StringRecord) -> RowKind {
    if let Some(cell) = row.get(1)
        && !cell.is_empty()
        && cell.contains('-')
        && cell.contains('*')
    {
        return RowKind::CardNumber(cell.trim().to_owned());
    }

    if row.len() < MIN_FIELD_COUNT {
        return RowKind::Skip;
    }

    let date_cell = row.get(0).unwrap_or_default().trim();

    // Header rows and trailing total rows leave the date column blank.
    if date_cell.is_empty() {
        return RowKind::Skip;
    }

    match Date::parse(date_cell, &DATE_FORMAT) {
        Ok(used_at) => RowKind::Transaction(used_at),
        Err(_) => RowKind::Skip,
    }
}

/// The logical fields of a transaction row, after resolving variable-width
/// store names. Amount cells stay raw here; parsing and fallbacks happen in
/// [build_record].
#[derive(Debug, PartialEq)]
struct RowFields<'a> {
    store: String,
    price: &'a str,
    // The installment columns are extracted to keep the field layout
    // complete but nothing downstream reads them.
    #[allow(dead_code)]
    payment_count: &'a str,
    #[allow(dead_code)]
    installment_count: &'a str,
    payment_amount: &'a str,
    note: Option<&'a str>,
}

/// Maps a transaction row of any width onto the fixed logical fields.
///
/// Store names may contain the field delimiter, widening the row past the
/// canonical 7 fields. In that case everything between the date and the
/// trailing five fields is the store name, rejoined with a comma and space;
/// the trailing fields are taken from the row's end. This assumes the
/// delimiter never appears inside the numeric or note fields.
fn extract_fields(row: &StringRecord) -> RowFields<'_> {
    let width = row.len();

    if width > CANONICAL_FIELD_COUNT {
        let store = (1..width - TRAILING_FIELD_COUNT)
            .filter_map(|index| row.get(index))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", ");

        RowFields {
            store,
            price: row.get(width - 5).unwrap_or_default(),
            payment_count: row.get(width - 4).unwrap_or_default(),
            installment_count: row.get(width - 3).unwrap_or_default(),
            payment_amount: row.get(width - 2).unwrap_or_default(),
            note: row.get(width - 1),
        }
    } else {
        RowFields {
            store: row.get(1).unwrap_or_default().trim().to_owned(),
            price: row.get(2).unwrap_or_default(),
            payment_count: row.get(3).unwrap_or_default(),
            installment_count: row.get(4).unwrap_or_default(),
            payment_amount: row.get(5).unwrap_or_default(),
            note: row.get(6),
        }
    }
}

/// Parses a yen amount cell, tolerating thousands separators and surrounding
/// whitespace.
///
/// Returns `None` for empty, unparseable or negative cells so the caller can
/// apply its fallback; amounts on a statement are never legitimately
/// negative.
fn parse_amount(cell: &str) -> Option<i64> {
    let cleaned = cell.replace(',', "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<i64>().ok().filter(|&amount| amount >= 0)
}

/// Builds a normalized record from one extracted transaction row.
///
/// Pure: identical inputs always produce an identical record. `price` falls
/// back to 0; `payment` falls back to the already-resolved `price`, so the
/// order of those two steps matters.
fn build_record(
    fields: RowFields<'_>,
    used_at: Date,
    card_number: &str,
    service: &str,
    file: &str,
) -> StatementRecord {
    let price = parse_amount(fields.price).unwrap_or(0);
    let payment = parse_amount(fields.payment_amount).unwrap_or(price);

    let note = fields
        .note
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(nfkc);

    StatementRecord {
        used_at,
        store: nfkc(&fields.store),
        price,
        payment,
        note,
        service: service.to_owned(),
        card_number: card_number.to_owned(),
        file: file.to_owned(),
    }
}

/// Parses the decoded text of one statement export into records ready for
/// persistence.
///
/// `service` and `file` are recorded on every emitted record. Card number
/// marker rows update the card number applied to the rows below them,
/// starting from the empty string; header, total and malformed rows are
/// dropped silently since the exports routinely contain them.
pub fn parse_statement_csv(text: &str, service: &str, file: &str) -> Vec<StatementRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    let mut card_number = String::new();

    for row in reader.records() {
        let Ok(row) = row else { continue };

        match classify_row(&row) {
            RowKind::CardNumber(number) => card_number = number,
            RowKind::Transaction(used_at) => {
                let fields = extract_fields(&row);
                records.push(build_record(fields, used_at, &card_number, service, file));
            }
            RowKind::Skip => {}
        }
    }

    records
}



#[cfg(test)]
mod parse_amount_tests {
    use super::parse_amount;

    #[test]
    fn parses_plain_and_separated_amounts() {
        assert_eq!(parse_amount("500"), Some(500));
        assert_eq!(parse_amount("1,200"), Some(1200));
        assert_eq!(parse_amount("1,234,567"), Some(1234567));
        assert_eq!(parse_amount(" 42 "), Some(42));
        assert_eq!(parse_amount("0"), Some(0));
    }

    #[test]
    fn rejects_empty_and_unparseable_cells() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12.50"), None);
    }

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(parse_amount("-500"), None);
        assert_eq!(parse_amount("-1,200"), None);
    }
}
