//! The idempotent statement import pipeline.
//!
//! Each file is imported at most once per service: a prior import under the
//! same `(service, file name)` pair makes the whole file a no-op. Within a
//! file, every record is inserted in one transaction so an interrupted or
//! failed import leaves the ledger looking as if the file was never touched.

use std::{ffi::OsStr, path::Path};

use time::OffsetDateTime;

use crate::{
    Error,
    csv_import::{decode_shift_jis, parse_statement_csv},
    stores::StatementStore,
};

/// The per-file result of a successful [import_file] call.
#[derive(Debug, PartialEq)]
pub enum ImportOutcome {
    /// The file was parsed and all of its records were inserted. Holds the
    /// inserted row count, which is zero for a file with no valid data rows.
    Imported(usize),
    /// A prior import exists for the same service and file name; the file was
    /// not read and nothing was inserted.
    SkippedDuplicate,
}

/// Totals across one [import_directory] run.
#[derive(Debug, Default, PartialEq)]
pub struct ImportSummary {
    /// Files whose records were inserted, including files with zero valid
    /// rows.
    pub files_imported: usize,
    /// Files skipped because they were already imported.
    pub files_skipped: usize,
    /// Files that failed and were rolled back.
    pub files_failed: usize,
    /// Records inserted across all imported files.
    pub records_inserted: usize,
}

/// Imports one statement CSV file into `store`, tagging every record with
/// `service`.
///
/// The file is skipped without even being opened when records from the same
/// service and file name already exist. Otherwise the Shift_JIS content
/// is decoded, parsed into records (carrying the card number announced by
/// marker rows across the whole file), and inserted in a single transaction.
///
/// # Errors
/// Returns an [Error::Io] if the file cannot be read, or the store's error if
/// the dedup check or the insert transaction fails. A failed insert rolls the
/// whole file back.
pub fn import_file(
    path: &Path,
    service: &str,
    store: &mut impl StatementStore,
) -> Result<ImportOutcome, Error> {
    let file = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    if store.count_for_source(service, file)? > 0 {
        tracing::info!("skipping {file}: already imported for service '{service}'");
        return Ok(ImportOutcome::SkippedDuplicate);
    }

    let bytes = std::fs::read(path)?;
    let text = decode_shift_jis(&bytes);
    let records = parse_statement_csv(&text, service, file);

    let loaded_at = OffsetDateTime::now_utc();
    let inserted = store.insert_all(&records, loaded_at)?;

    Ok(ImportOutcome::Imported(inserted))
}

/// Imports every `*.csv` file in `directory`, in lexicographic file name
/// order.
///
/// One file's failure is logged and counted but does not stop the remaining
/// files from importing.
///
/// # Errors
/// Returns an [Error::Io] if the directory itself cannot be listed; in that
/// case no files were processed.
pub fn import_directory(
    directory: &Path,
    service: &str,
    store: &mut impl StatementStore,
) -> Result<ImportSummary, Error> {
    let mut paths: Vec<_> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension() == Some(OsStr::new("csv")))
        .collect();
    paths.sort_by_key(|path| path.file_name().map(OsStr::to_owned));

    let mut summary = ImportSummary::default();

    for path in &paths {
        match import_file(path, service, store) {
            Ok(ImportOutcome::Imported(count)) => {
                tracing::info!("imported {count} records from {}", path.display());
                summary.files_imported += 1;
                summary.records_inserted += count;
            }
            Ok(ImportOutcome::SkippedDuplicate) => {
                summary.files_skipped += 1;
            }
            Err(error) => {
                tracing::error!("failed to import {}: {error}", path.display());
                summary.files_failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod import_tests {
    use std::{
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use rusqlite::Connection;
    use time::OffsetDateTime;

    use super::{ImportOutcome, ImportSummary, import_directory, import_file};
    use crate::{
        Error, StatementRecord,
        db::initialize,
        stores::{SQLiteStatementStore, StatementStore},
    };

    fn init_store() -> (Arc<Mutex<Connection>>, SQLiteStatementStore) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let connection = Arc::new(Mutex::new(connection));
        let store = SQLiteStatementStore::new(connection.clone());

        (connection, store)
    }

    fn write_statement_csv(directory: &Path, name: &str, text: &str) -> PathBuf {
        let path = directory.join(name);
        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode(text);
        std::fs::write(&path, &encoded).unwrap();
        path
    }

    const STATEMENT_CSV: &str = "\
        ご利用日,ご利用店名,ご利用金額,支払回数,分割回数,お支払い金額,備考\n\
        ,1234-****-****-5678\n\
        2024/02/01,Store A,500,1,1,,\n\
        2024/02/02,珈琲店 ｶﾌｪ,\"1,200\",1,1,\"1,200\",ギフト１２３\n\
        ,Total,\"1,700\",,,,\n";

    #[test]
    fn import_file_inserts_all_valid_rows() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        let path = write_statement_csv(dir.path(), "202402.csv", STATEMENT_CSV);

        let outcome = import_file(&path, "vpass", &mut store).unwrap();

        assert_eq!(outcome, ImportOutcome::Imported(2));

        let records = store.get_for_source("vpass", "202402.csv").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].store, "Store A");
        assert_eq!(records[0].payment, 500, "empty payment falls back to price");
        assert_eq!(records[0].card_number, "1234-****-****-5678");
        // Shift_JIS decoded, then NFKC normalized.
        assert_eq!(records[1].store, "珈琲店 カフェ");
        assert_eq!(records[1].note, Some("ギフト123".to_owned()));
        assert_eq!(records[1].price, 1200);
    }

    #[test]
    fn reimporting_the_same_file_skips_and_leaves_the_table_unchanged() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        let path = write_statement_csv(dir.path(), "202402.csv", STATEMENT_CSV);

        import_file(&path, "vpass", &mut store).unwrap();
        let before = store.get_for_source("vpass", "202402.csv").unwrap();

        let outcome = import_file(&path, "vpass", &mut store).unwrap();

        assert_eq!(outcome, ImportOutcome::SkippedDuplicate);
        let after = store.get_for_source("vpass", "202402.csv").unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn the_same_file_name_imports_again_under_another_service() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        let path = write_statement_csv(dir.path(), "202402.csv", STATEMENT_CSV);

        import_file(&path, "vpass", &mut store).unwrap();
        let outcome = import_file(&path, "enavi", &mut store).unwrap();

        assert_eq!(outcome, ImportOutcome::Imported(2));
    }

    #[test]
    fn header_and_total_only_files_import_zero_rows_without_error() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        let text = "\
            ご利用日,ご利用店名,ご利用金額,支払回数,分割回数,お支払い金額,備考\n\
            ,Total,10000,,,,\n";
        let path = write_statement_csv(dir.path(), "empty.csv", text);

        let outcome = import_file(&path, "vpass", &mut store).unwrap();

        assert_eq!(outcome, ImportOutcome::Imported(0));
        assert_eq!(store.count_for_source("vpass", "empty.csv").unwrap(), 0);
    }

    #[test]
    fn import_file_reports_missing_files() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();

        let result = import_file(&dir.path().join("nope.csv"), "vpass", &mut store);

        assert!(matches!(result, Err(Error::Io(_))), "got {result:?}");
    }

    #[test]
    fn import_directory_aggregates_per_file_outcomes() {
        let (_connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        write_statement_csv(dir.path(), "202401.csv", STATEMENT_CSV);
        write_statement_csv(
            dir.path(),
            "202402.csv",
            "2024/02/05,Store B,300,1,1,300,\n",
        );
        write_statement_csv(dir.path(), "notes.txt", "not a statement");

        // Pre-import one file so the run sees a duplicate.
        import_file(&dir.path().join("202401.csv"), "vpass", &mut store).unwrap();

        let summary = import_directory(dir.path(), "vpass", &mut store).unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                files_imported: 1,
                files_skipped: 1,
                files_failed: 0,
                records_inserted: 1,
            }
        );
    }

    #[test]
    fn import_directory_processes_files_in_name_order() {
        let (connection, mut store) = init_store();
        let dir = tempfile::tempdir().unwrap();
        // Written out of order on purpose.
        write_statement_csv(
            dir.path(),
            "202402.csv",
            "2024/02/01,Later,200,1,1,200,\n",
        );
        write_statement_csv(
            dir.path(),
            "202401.csv",
            "2024/01/01,Earlier,100,1,1,100,\n",
        );

        import_directory(dir.path(), "vpass", &mut store).unwrap();

        let files: Vec<String> = connection
            .lock()
            .unwrap()
            .prepare("SELECT file FROM credit_histories ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(files, ["202401.csv", "202402.csv"]);
    }

    #[test]
    fn import_directory_fails_when_the_directory_is_unreadable() {
        let (_connection, mut store) = init_store();

        let result = import_directory(Path::new("/no/such/directory"), "vpass", &mut store);

        assert!(matches!(result, Err(Error::Io(_))), "got {result:?}");
    }

    /// A store whose inserts always fail, for exercising the
    /// one-file-must-not-abort-the-run behavior.
    struct BrokenStore;

    impl StatementStore for BrokenStore {
        fn count_for_source(&self, _service: &str, _file: &str) -> Result<usize, Error> {
            Ok(0)
        }

        fn get_for_source(
            &self,
            _service: &str,
            _file: &str,
        ) -> Result<Vec<StatementRecord>, Error> {
            Ok(Vec::new())
        }

        fn insert_all(
            &mut self,
            _records: &[StatementRecord],
            _loaded_at: OffsetDateTime,
        ) -> Result<usize, Error> {
            Err(Error::SqlError(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn a_failing_file_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_statement_csv(
            dir.path(),
            "202401.csv",
            "2024/01/01,Store A,100,1,1,100,\n",
        );
        write_statement_csv(
            dir.path(),
            "202402.csv",
            "2024/02/01,Store B,200,1,1,200,\n",
        );

        let summary = import_directory(dir.path(), "vpass", &mut BrokenStore).unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                files_imported: 0,
                files_skipped: 0,
                files_failed: 2,
                records_inserted: 0,
            }
        );
    }
}
