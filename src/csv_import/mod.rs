//! Parsing of credit card statement CSV exports.
//!
//! Statement exports are noisy: header rows, masked card-number marker rows
//! and total rows sit alongside the transaction rows, store names may contain
//! the field delimiter, and the files are Shift_JIS encoded. This module
//! turns the decoded text of one export into [StatementRecord]s ready for
//! persistence.
//!
//! [StatementRecord]: crate::StatementRecord

mod csv;
mod encoding;
mod normalize;

pub use csv::parse_statement_csv;
pub use encoding::decode_shift_jis;
