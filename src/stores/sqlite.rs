//! Implements a SQLite backed statement store.
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, StatementRecord,
    db::{CreateTable, MapRow},
    stores::StatementStore,
};

/// Stores statement records in the `credit_histories` table of a SQLite
/// database.
#[derive(Debug, Clone)]
pub struct SQLiteStatementStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteStatementStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl StatementStore for SQLiteStatementStore {
    /// Count the records previously imported from `file` for `service`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the database lock could not be acquired,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn count_for_source(&self, service: &str, file: &str) -> Result<usize, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let count = connection
            .prepare(
                "SELECT COUNT(id) FROM credit_histories
                 WHERE service = :service AND file = :file",
            )?
            .query_row(&[(":service", service), (":file", file)], |row| {
                row.get::<_, i64>(0)
            })?;

        Ok(count as usize)
    }

    /// Retrieve the records imported from `file` for `service`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the database lock could not be acquired,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get_for_source(&self, service: &str, file: &str) -> Result<Vec<StatementRecord>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare(
                "SELECT used_at, store, price, payment, note, service, card_number, file
                 FROM credit_histories
                 WHERE service = :service AND file = :file
                 ORDER BY id",
            )?
            .query_map(&[(":service", service), (":file", file)], Self::map_row)?
            .map(|maybe_record| maybe_record.map_err(Error::SqlError))
            .collect()
    }

    /// Insert all of `records` in one transaction.
    ///
    /// If any insert fails the transaction is rolled back and the table is
    /// left untouched.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DatabaseLockError] if the database lock could not be acquired,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn insert_all(
        &mut self,
        records: &[StatementRecord],
        loaded_at: OffsetDateTime,
    ) -> Result<usize, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let tx = connection.unchecked_transaction()?;

        {
            let mut statement = tx.prepare(
                "INSERT INTO credit_histories
                 (used_at, store, price, payment, note, service, card_number, file,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for record in records {
                statement.execute((
                    record.used_at,
                    &record.store,
                    record.price,
                    record.payment,
                    &record.note,
                    &record.service,
                    &record.card_number,
                    &record.file,
                    loaded_at,
                    loaded_at,
                ))?;

                tracing::debug!(
                    "inserted {} - {} - ¥{}",
                    record.used_at,
                    record.store,
                    record.price
                );
            }
        }

        tx.commit()?;

        Ok(records.len())
    }
}

impl CreateTable for SQLiteStatementStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS credit_histories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    used_at TEXT NOT NULL,
                    store TEXT NOT NULL,
                    price INTEGER NOT NULL,
                    payment INTEGER NOT NULL,
                    note TEXT,
                    service TEXT NOT NULL,
                    card_number TEXT NOT NULL,
                    file TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                    )",
            (),
        )?;

        // The import dedup check filters on (service, file) for every file.
        connection.execute(
            "CREATE INDEX IF NOT EXISTS credit_histories_source
             ON credit_histories (service, file)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteStatementStore {
    type ReturnType = StatementRecord;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(StatementRecord {
            used_at: row.get(offset)?,
            store: row.get(offset + 1)?,
            price: row.get(offset + 2)?,
            payment: row.get(offset + 3)?,
            note: row.get(offset + 4)?,
            service: row.get(offset + 5)?,
            card_number: row.get(offset + 6)?,
            file: row.get(offset + 7)?,
        })
    }
}
