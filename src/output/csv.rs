//! CSV exporter
//!
//! One file per run, named `<prefix>_<YYYYmmdd_HHMMSS>.csv`, with a header
//! row of field labels followed by one row per record.

use crate::output::traits::{CrawlReport, Exporter, OutputResult};
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

const SEP: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes one CSV row, quoting fields that need it
fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEP)?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    write!(w, "\r\n")
}

/// Exports records to a timestamped CSV file
#[derive(Debug, Clone)]
pub struct CsvExporter {
    directory: PathBuf,
    file_prefix: String,
}

impl CsvExporter {
    pub fn new(directory: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: file_prefix.into(),
        }
    }

    fn file_path(&self, report: &CrawlReport) -> PathBuf {
        let stamp = report
            .finished_at
            .with_timezone(&Local)
            .format("%Y%m%d_%H%M%S");
        self.directory
            .join(format!("{}_{}.csv", self.file_prefix, stamp))
    }
}

impl Exporter for CsvExporter {
    /// Writes the CSV file; no file is created when there are no records
    fn export(&self, report: &CrawlReport) -> OutputResult<Option<PathBuf>> {
        if report.records.is_empty() {
            tracing::warn!("No data was scraped, nothing to export");
            return Ok(None);
        }

        fs::create_dir_all(&self.directory)?;
        let path = self.file_path(report);
        let mut writer = BufWriter::new(File::create(&path)?);

        write_row(&mut writer, &report.labels)?;
        for record in &report.records {
            let row: Vec<&str> = report
                .labels
                .iter()
                .map(|label| record.get(label).unwrap_or_default())
                .collect();
            write_row(&mut writer, &row)?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), rows = report.records.len(), "CSV written");
        Ok(Some(path))
    }
}
