//! Cardledger imports credit card statement CSV exports into a SQLite ledger.
//!
//! The exports are Shift_JIS encoded and mix header rows, masked card-number
//! marker rows and total rows in with the actual transaction rows. This
//! library classifies each row, reassembles store names that contain the
//! field delimiter, normalizes full-width text, and loads the resulting
//! records into the `credit_histories` table, skipping files that were
//! already imported for the same service.

#![warn(missing_docs)]

pub mod csv_import;
pub mod db;
pub mod import;
mod statement;
pub mod stores;

pub use db::initialize as initialize_db;
pub use statement::StatementRecord;

/// The errors that may occur while importing statements.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The statement file could not be read from disk.
    ///
    /// Callers should pass in the original error as a string.
    #[error("could not read statement file: {0}")]
    Io(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", error);
        Error::SqlError(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}
