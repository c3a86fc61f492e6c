//! SQLite exporter
//!
//! Appends every run to `<prefix>.db` in the output directory. Records are
//! stored one value per row so runs with different field sets share the
//! same schema.

use crate::output::traits::{CrawlReport, Exporter, OutputResult};
use crate::state::StopReason;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

/// SQL schema for the export database
pub const SCHEMA_SQL: &str = r#"
-- One row per extraction run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    pages_visited INTEGER NOT NULL,
    stop_reason TEXT NOT NULL,
    stop_detail TEXT,
    config_hash TEXT NOT NULL
);

-- Extracted values, addressed by (run, page, row, column)
CREATE TABLE IF NOT EXISTS record_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    page_number INTEGER NOT NULL,
    row_index INTEGER NOT NULL,
    label TEXT NOT NULL,
    column_index INTEGER NOT NULL,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_record_values_run ON record_values(run_id);
"#;

/// Opens (creating if needed) an export database with the schema applied
pub fn open_database(path: &Path) -> OutputResult<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;

    Ok(conn)
}

/// Exports records into an SQLite database
#[derive(Debug, Clone)]
pub struct SqliteExporter {
    directory: PathBuf,
    file_prefix: String,
    start_url: String,
    config_hash: String,
}

impl SqliteExporter {
    /// Creates a new SQLite exporter
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory holding the database file
    /// * `file_prefix` - Database file name without the `.db` extension
    /// * `start_url` - Recorded with the run
    /// * `config_hash` - Hash of the configuration that produced the run
    pub fn new(
        directory: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
        start_url: impl Into<String>,
        config_hash: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: file_prefix.into(),
            start_url: start_url.into(),
            config_hash: config_hash.into(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.directory.join(format!("{}.db", self.file_prefix))
    }
}

impl Exporter for SqliteExporter {
    /// Records the run, even an empty one, in a single transaction
    fn export(&self, report: &CrawlReport) -> OutputResult<Option<PathBuf>> {
        fs::create_dir_all(&self.directory)?;
        let path = self.database_path();
        let mut conn = open_database(&path)?;

        let stop_detail = match &report.stop_reason {
            StopReason::NavigationFailed(detail) => Some(detail.as_str()),
            _ => None,
        };

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (start_url, started_at, finished_at, pages_visited, stop_reason, stop_detail, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.start_url,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.pages_visited,
                report.stop_reason.to_db_string(),
                stop_detail,
                self.config_hash,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO record_values (run_id, page_number, row_index, label, column_index, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (row_index, record) in report.records.iter().enumerate() {
                for (column_index, label) in report.labels.iter().enumerate() {
                    stmt.execute(params![
                        run_id,
                        record.page,
                        row_index as i64,
                        label,
                        column_index as i64,
                        record.get(label).unwrap_or_default(),
                    ])?;
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            path = %path.display(),
            run_id,
            rows = report.records.len(),
            "SQLite export written"
        );
        Ok(Some(path))
    }
}
