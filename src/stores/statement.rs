//! Defines the statement store trait.

use time::OffsetDateTime;

use crate::{Error, StatementRecord};

/// Handles the persistence of imported statement records.
pub trait StatementStore {
    /// The number of records previously imported from the file named `file`
    /// for `service`.
    ///
    /// The pair `(service, file)` is the import dedup key: a non-zero count
    /// means the file was already imported.
    fn count_for_source(&self, service: &str, file: &str) -> Result<usize, Error>;

    /// Retrieve the records imported from the file named `file` for
    /// `service`, in insertion order.
    fn get_for_source(&self, service: &str, file: &str) -> Result<Vec<StatementRecord>, Error>;

    /// Insert `records` within a single transaction and return the number of
    /// rows inserted.
    ///
    /// Implementers must insert either every record or none: an error from
    /// the underlying storage must leave the store unchanged. `loaded_at` is
    /// recorded as the creation and update time of every row.
    fn insert_all(
        &mut self,
        records: &[StatementRecord],
        loaded_at: OffsetDateTime,
    ) -> Result<usize, Error>;
}
