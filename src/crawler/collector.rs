//! Page data collector
//!
//! Evaluates every field locator against the current page and assembles
//! positionally aligned records.

use crate::driver::PageDriver;
use crate::selection::FieldSet;
use crate::state::PageRecord;
use crate::HarvestError;

/// Extracts the records of the current page
///
/// For each field the locator's matches are read in document order, their
/// text trimmed, and empty texts dropped before alignment. A locator or
/// text read that fails degrades to missing values; only fatal driver
/// errors are returned.
///
/// # Arguments
///
/// * `driver` - Driver holding the page to extract from
/// * `fields` - The fields selected for this session
/// * `page` - 1-based page number stamped on every record
pub async fn collect<D: PageDriver>(
    driver: &D,
    fields: &FieldSet,
    page: u32,
) -> Result<Vec<PageRecord>, HarvestError> {
    let mut columns = Vec::with_capacity(fields.len());

    for field in fields.iter() {
        let elements = match driver.find_all(&field.locator).await {
            Ok(elements) => elements,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(page, label = %field.label, "Locator failed: {}", e);
                Vec::new()
            }
        };

        let mut values = Vec::with_capacity(elements.len());
        for element in &elements {
            match driver.text(element).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        values.push(text.to_string());
                    }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::debug!(page, label = %field.label, "Text read failed: {}", e),
            }
        }

        if values.is_empty() {
            tracing::debug!(
                page,
                label = %field.label,
                locator = %field.locator,
                "No values on page"
            );
        }
        columns.push(values);
    }

    let records = align(page, &fields.labels(), &columns);
    tracing::info!(page, records = records.len(), "Page collected");
    Ok(records)
}

/// Zips per-field value sequences into records by position
///
/// Emits `max(len)` candidate rows; a field shorter than the longest one is
/// padded with `""`. Rows whose values are all empty are dropped. Values are
/// paired by index only, so a field missing a value in the middle shifts
/// its later values onto earlier rows.
pub fn align(page: u32, labels: &[String], columns: &[Vec<String>]) -> Vec<PageRecord> {
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);

    (0..rows)
        .map(|i| PageRecord {
            page,
            values: labels
                .iter()
                .zip(columns)
                .map(|(label, column)| (label.clone(), column.get(i).cloned().unwrap_or_default()))
                .collect(),
        })
        .filter(|record| !record.is_empty())
        .collect()
}
