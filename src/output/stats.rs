//! Run summary printed at the end of a harvest

use crate::output::traits::CrawlReport;
use std::collections::BTreeMap;
use std::path::Path;

/// Record count per page number, in page order
pub fn records_per_page(report: &CrawlReport) -> BTreeMap<u32, usize> {
    let mut counts = BTreeMap::new();
    for record in &report.records {
        *counts.entry(record.page).or_insert(0) += 1;
    }
    counts
}

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `report` - The finished run
/// * `exported` - Where the records were written, if anywhere
pub fn print_summary(report: &CrawlReport, exported: Option<&Path>) {
    println!("\n=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Total items collected: {}", report.records.len());
    println!("  Pages scraped: {}", report.pages_visited);
    println!("  Fields: {}", report.labels.join(", "));
    println!("  Stopped: {}", report.stop_reason);
    println!("  Duration: {}s", report.duration_seconds());
    println!();

    let per_page = records_per_page(report);
    if !per_page.is_empty() {
        println!("Items per Page:");
        for (page, count) in &per_page {
            println!("  Page {}: {}", page, count);
        }
        println!();
    }

    if !report.fallback_labels.is_empty() {
        println!("Imprecise Locators:");
        for label in &report.fallback_labels {
            println!("  - {} (matched by tag only; consider re-selecting)", label);
        }
        println!();
    }

    match exported {
        Some(path) => println!("Data saved to: {}", path.display()),
        None => println!("No output file written"),
    }
}
