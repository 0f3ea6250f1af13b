use std::{fs::OpenOptions, path::PathBuf, process::ExitCode, sync::{Arc, Mutex}};

use clap::Parser;
use rusqlite::Connection;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use cardledger::{import::import_directory, initialize_db, stores::SQLiteStatementStore};

/// Imports credit card statement CSV exports into the ledger database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long)]
    db_path: String,

    /// Directory containing the statement CSV files to import.
    #[arg(long)]
    csv_dir: PathBuf,

    /// Statement provider recorded against each imported row, e.g. vpass or
    /// enavi.
    #[arg(long, default_value = "vpass")]
    service: String,
}

fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not open database {}: {error}", args.db_path);
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = initialize_db(&connection) {
        tracing::error!("could not initialize the ledger schema: {error}");
        return ExitCode::FAILURE;
    }

    let mut store = SQLiteStatementStore::new(Arc::new(Mutex::new(connection)));

    match import_directory(&args.csv_dir, &args.service, &mut store) {
        Ok(summary) => {
            tracing::info!(
                "imported {} records from {} files ({} skipped, {} failed)",
                summary.records_inserted,
                summary.files_imported,
                summary.files_skipped,
                summary.files_failed,
            );

            if summary.files_failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            tracing::error!("could not list {}: {error}", args.csv_dir.display());
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}
