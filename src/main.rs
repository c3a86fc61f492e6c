//! Page-Harvest main entry point
//!
//! This is the command-line interface for the Page-Harvest extractor.

use anyhow::Context;
use clap::Parser;
use page_harvest::config::{apply_overrides, load_config_with_hash, Backend, Config};
use page_harvest::driver::{PageDriver, StaticPage, WebDriverPage};
use page_harvest::output::{export_report, print_summary};
use page_harvest::selection::{Prompter, ScriptedPrompter, TerminalPrompter};
use page_harvest::harvest;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Page-Harvest: an interactive, pagination-aware web data extractor
///
/// Click one example of each field on a listing page, point at the
/// "next page" button, and Page-Harvest collects every matching item
/// across pages into a CSV file or SQLite database.
#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(version)]
#[command(about = "An interactive, pagination-aware web data extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start URL, overriding the configuration file
    #[arg(long)]
    url: Option<String>,

    /// Page budget, overriding the configuration file
    #[arg(long)]
    max_pages: Option<u32>,

    /// Validate config and show what would be harvested without opening a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, cli.url.clone(), cli.max_pages)
        .context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match config.driver.backend {
        Backend::Webdriver => {
            let driver = WebDriverPage::connect(
                &config.driver.webdriver_url,
                config.driver.headless,
                Duration::from_millis(config.driver.settle_ms),
            )
            .await
            .context("Could not start the browser session")?;

            if config.is_scripted() {
                let mut prompter = ScriptedPrompter::from_config(&config);
                handle_harvest(&driver, &mut prompter, &config, &config_hash, cancel).await
            } else {
                let mut prompter = TerminalPrompter::new();
                handle_harvest(&driver, &mut prompter, &config, &config_hash, cancel).await
            }
        }
        Backend::Static => {
            let driver = StaticPage::new(
                &config.driver.user_agent,
                Duration::from_millis(config.driver.ready_timeout_ms),
            )?;
            let mut prompter = ScriptedPrompter::from_config(&config);
            handle_harvest(&driver, &mut prompter, &config, &config_hash, cancel).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_harvest=info,warn"),
            1 => EnvFilter::new("page_harvest=debug,info"),
            2 => EnvFilter::new("page_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// First Ctrl-C stops the crawl after the current page; a second one exits
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping after the current page (Ctrl-C again to quit)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Page-Harvest Dry Run ===\n");

    println!("Session:");
    println!("  Start URL: {}", config.session.start_url);
    println!("  Max pages: {}", config.session.max_pages);

    println!("\nDriver:");
    println!("  Backend: {:?}", config.driver.backend);
    if config.driver.backend == Backend::Webdriver {
        println!("  WebDriver URL: {}", config.driver.webdriver_url);
        println!("  Headless: {}", config.driver.headless);
    }
    println!("  Ready timeout: {}ms", config.driver.ready_timeout_ms);
    println!("  Settle delay: {}ms", config.driver.settle_ms);
    println!("  User agent: {}", config.driver.user_agent);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  File prefix: {}", config.output.file_prefix);
    println!("  Format: {:?}", config.output.format);

    if config.is_scripted() {
        println!("\nScripted Fields ({}):", config.fields.len());
        for pick in &config.fields {
            println!("  - {} <- {}", pick.label, pick.anchor);
        }
        match &config.next_page {
            Some(next) => println!("  Next page <- {}", next.anchor),
            None => println!("  Single-page mode"),
        }
    } else {
        println!("\nFields will be selected interactively in the browser");
    }

    println!("\n✓ Configuration is valid");
}

/// Runs the harvest, exports the records and prints the summary
///
/// The driver is closed whether or not the harvest succeeded.
async fn handle_harvest<D, P>(
    driver: &D,
    prompter: &mut P,
    config: &Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    D: PageDriver,
    P: Prompter<D>,
{
    let result = harvest(driver, prompter, config, cancel).await;

    if let Err(e) = driver.close().await {
        tracing::warn!("Failed to close the browser session: {}", e);
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    let exported =
        export_report(&report, config, config_hash).context("Failed to export records")?;
    print_summary(&report, exported.as_deref());

    Ok(())
}
