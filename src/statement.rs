//! The statement record model.

use serde::{Deserialize, Serialize};
use time::Date;

/// One normalized transaction line from a credit card statement, ready for
/// persistence.
///
/// Records are built once per data row by the CSV parser and never mutated
/// afterwards. `store` and `note` hold NFKC-normalized text so the same
/// merchant is stored consistently across files and issuers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    /// The date the card was used. Rows without a parseable date are never
    /// materialized as records.
    pub used_at: Date,
    /// The merchant name, possibly reassembled from several CSV cells. May be
    /// empty but never null.
    pub store: String,
    /// The purchase amount in yen. Defaults to 0 when the cell is missing or
    /// unparseable.
    pub price: i64,
    /// The amount actually charged this cycle, which differs from `price`
    /// under installment plans. Falls back to `price` when its own cell is
    /// missing or unparseable.
    pub payment: i64,
    /// Optional free text note. Empty or whitespace-only notes are absent
    /// rather than empty strings.
    pub note: Option<String>,
    /// The statement provider this record was imported from, e.g. `vpass` or
    /// `enavi`. Opaque to the importer.
    pub service: String,
    /// The masked card number captured from the most recent marker row above
    /// this record in file order, or the empty string if no marker row has
    /// been seen yet.
    pub card_number: String,
    /// The base name of the source file. Together with `service` this forms
    /// the import dedup key.
    pub file: String,
}
