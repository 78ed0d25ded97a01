use std::path::Path;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

pub const DB_FILE_NAME: &str = "resume_analyzer.sqlite";

/// Opens the SQLite pool backing the analysis store, creating the data
/// directory and database file on first use.
pub async fn create_pool(data_dir: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let db_path = data_dir.join(DB_FILE_NAME);
    info!("Opening SQLite database at {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    info!("SQLite connection pool established");
    Ok(pool)
}
