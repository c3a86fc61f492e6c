//! Crawler module for page harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Record extraction from the current page
//! - The pagination state machine
//! - Overall run orchestration, from field selection to the final report

mod collector;
mod coordinator;

pub use collector::{align, collect};
pub use coordinator::Coordinator;

use crate::config::Config;
use crate::driver::PageDriver;
use crate::output::{finalize, CrawlReport};
use crate::selection::{select_fields, select_next_page, Prompter};
use crate::state::CrawlSession;
use crate::HarvestError;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runs a complete extraction session
///
/// This is the main entry point for a harvest. It will:
/// 1. Load the start page and wait until it is ready
/// 2. Let the prompter pick the fields and the next-page control
/// 3. Crawl until the page budget or a stop condition is reached
/// 4. Build the final report
///
/// # Arguments
///
/// * `driver` - Browser backend; not closed by this function
/// * `prompter` - Source of element picks and labels
/// * `config` - Validated configuration
/// * `cancel` - Stops the crawl between pages when triggered
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished, possibly early, with its records
/// * `Err(HarvestError)` - The start page could not be loaded or the browser was lost
///
/// # Example
///
/// ```no_run
/// use page_harvest::config::load_config;
/// use page_harvest::driver::StaticPage;
/// use page_harvest::selection::ScriptedPrompter;
/// use page_harvest::harvest;
/// use std::path::Path;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let driver = StaticPage::new(&config.driver.user_agent, Duration::from_secs(10))?;
/// let mut prompter = ScriptedPrompter::from_config(&config);
/// let report = harvest(&driver, &mut prompter, &config, CancellationToken::new()).await?;
/// println!("{} records from {} pages", report.records.len(), report.pages_visited);
/// # Ok(())
/// # }
/// ```
pub async fn harvest<D, P>(
    driver: &D,
    prompter: &mut P,
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlReport, HarvestError>
where
    D: PageDriver,
    P: Prompter<D>,
{
    let started_at = Utc::now();
    let ready_timeout = Duration::from_millis(config.driver.ready_timeout_ms);
    let start_url = Url::parse(&config.session.start_url)?;

    tracing::info!(url = %start_url, "Opening start page");
    driver.goto(&start_url).await?;
    driver.wait_ready(ready_timeout).await?;

    let fields = select_fields(driver, prompter).await?;
    if fields.is_empty() {
        tracing::warn!("No fields selected; the crawl will not produce records");
    }
    let next_page = select_next_page(driver, prompter).await?;

    let session = CrawlSession::new(fields, next_page, config.session.max_pages);
    let session = Coordinator::new(driver, session, ready_timeout, cancel)
        .run()
        .await?;

    Ok(finalize(session, started_at))
}
