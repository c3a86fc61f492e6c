//! Output module for run reports and exports
//!
//! This module handles:
//! - Turning a finished crawl session into a [`CrawlReport`]
//! - Exporting records as CSV or into SQLite
//! - Printing the run summary

mod csv;
mod sqlite_output;
pub mod stats;
mod traits;

pub use self::csv::CsvExporter;
pub use sqlite_output::{open_database, SqliteExporter, SCHEMA_SQL};
pub use stats::{print_summary, records_per_page};
pub use traits::{CrawlReport, Exporter, OutputError, OutputResult};

use crate::config::{Config, OutputFormat};
use crate::state::{CrawlSession, StopReason};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Builds the final report of a crawl session
///
/// Pure read of the session; `finished_at` is taken now. A session that
/// never reached its terminal state is reported as cancelled.
///
/// # Arguments
///
/// * `session` - The session handed back by the crawler
/// * `started_at` - When the run started, before field selection
pub fn finalize(session: CrawlSession, started_at: DateTime<Utc>) -> CrawlReport {
    let labels = session.fields.labels();
    let fallback_labels = session.fields.fallback_labels();

    CrawlReport {
        labels,
        records: session.records,
        pages_visited: session.pages_visited,
        stop_reason: session.stop_reason.unwrap_or(StopReason::Cancelled),
        fallback_labels,
        started_at,
        finished_at: Utc::now(),
    }
}

/// Writes the report with the exporter the configuration asks for
///
/// Returns the file written, or `None` when there was nothing to write.
pub fn export_report(
    report: &CrawlReport,
    config: &Config,
    config_hash: &str,
) -> Result<Option<PathBuf>, HarvestError> {
    let output = &config.output;
    let path = match output.format {
        OutputFormat::Csv => {
            CsvExporter::new(&output.directory, &output.file_prefix).export(report)?
        }
        OutputFormat::Sqlite => SqliteExporter::new(
            &output.directory,
            &output.file_prefix,
            &config.session.start_url,
            config_hash,
        )
        .export(report)?,
    };

    if let Some(path) = &path {
        tracing::info!(path = %path.display(), format = ?output.format, "Records exported");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{InferenceStrategy, Locator};
    use crate::selection::{FieldSet, FieldSpec};
    use crate::config::parse_config;
    use crate::state::PageRecord;
    use tempfile::TempDir;

    fn config_for(directory: &str, format: &str) -> Config {
        parse_config(&format!(
            r#"
[session]
start-url = "https://example.com/list"

[output]
directory = "{}"
file-prefix = "items"
format = "{}"
"#,
            directory, format
        ))
        .unwrap()
    }

    #[test]
    fn test_finalize_carries_session() {
        let mut fields = FieldSet::new();
        fields
            .insert(FieldSpec {
                label: "name".to_string(),
                locator: Locator::Class("item".to_string()),
                strategy: InferenceStrategy::SharedClass,
            })
            .unwrap();
        fields
            .insert(FieldSpec {
                label: "note".to_string(),
                locator: Locator::Tag("small".to_string()),
                strategy: InferenceStrategy::Fallback,
            })
            .unwrap();

        let mut session = CrawlSession::new(fields, None, 1);
        session.record_page(vec![PageRecord {
            page: 1,
            values: vec![
                ("name".to_string(), "One".to_string()),
                ("note".to_string(), String::new()),
            ],
        }]);
        session.stop_reason = Some(StopReason::SinglePageMode);

        let started = Utc::now();
        let report = finalize(session, started);

        assert_eq!(report.labels, vec!["name", "note"]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.pages_visited, 1);
        assert_eq!(report.stop_reason, StopReason::SinglePageMode);
        assert_eq!(report.fallback_labels, vec!["note"]);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_unfinished_session_reports_cancelled() {
        let session = CrawlSession::new(FieldSet::new(), None, 1);
        let report = finalize(session, Utc::now());
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.pages_visited, 0);
    }

    #[test]
    fn test_export_report_uses_configured_format() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path().to_str().unwrap(), "sqlite");
        let report = finalize(CrawlSession::new(FieldSet::new(), None, 1), Utc::now());

        let path = export_report(&report, &config, "hash").unwrap().unwrap();
        assert!(path.ends_with("items.db"));

        let csv = config_for(dir.path().to_str().unwrap(), "csv");
        assert!(export_report(&report, &csv, "hash").unwrap().is_none());
    }

    #[test]
    fn test_export_failure_is_output_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "not a directory").unwrap();
        let config = config_for(blocker.to_str().unwrap(), "sqlite");
        let report = finalize(CrawlSession::new(FieldSet::new(), None, 1), Utc::now());

        let result = export_report(&report, &config, "hash");
        assert!(matches!(result, Err(HarvestError::Output(_))));
    }
}
