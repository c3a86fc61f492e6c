//! Exporter trait and the run report it consumes

use crate::state::{PageRecord, StopReason};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Final result of one extraction run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Field labels in selection order; the export column order
    pub labels: Vec<String>,

    /// Retained records of every page, in collection order
    pub records: Vec<PageRecord>,

    /// Pages actually collected
    pub pages_visited: u32,

    pub stop_reason: StopReason,

    /// Fields whose locator came from the imprecise tag fallback
    pub fallback_labels: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Wall-clock duration of the run in whole seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Writes a report somewhere durable
pub trait Exporter {
    /// Exports the report
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - Where the records were written
    /// * `Ok(None)` - Nothing was written
    /// * `Err(OutputError)` - The export failed
    fn export(&self, report: &CrawlReport) -> OutputResult<Option<PathBuf>>;
}
