//! Integration tests for the harvester
//!
//! These tests use wiremock to serve paginated listings and drive the
//! full harvest cycle end-to-end through the static backend.

use page_harvest::config::{parse_config, Config};
use page_harvest::driver::StaticPage;
use page_harvest::output::{CsvExporter, Exporter, SqliteExporter};
use page_harvest::selection::ScriptedPrompter;
use page_harvest::{harvest, CrawlReport, StopReason};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders one listing page with two products and an optional next link
fn listing_page(page: usize, next: Option<&str>) -> String {
    let next = next
        .map(|control| control.to_string())
        .unwrap_or_default();
    format!(
        r#"<html><head><title>Products {page}</title></head><body>
        <div id="products">
            <div class="product"><h2 class="title">Item {page}-a</h2><span class="price">{page}.10</span></div>
            <div class="product"><h2 class="title">Item {page}-b</h2><span class="price">{page}.20</span></div>
        </div>
        {next}
        </body></html>"#,
        page = page,
        next = next
    )
}

/// Mounts `count` pages at /list/1.. where every page but the last links to the next
async fn mount_listing(server: &MockServer, count: usize) {
    for page in 1..=count {
        let next = (page < count)
            .then(|| format!(r#"<a class="next" href="/list/{}">Next &raquo;</a>"#, page + 1));
        Mock::given(method("GET"))
            .and(path(format!("/list/{}", page)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(page, next.as_deref()))
                    .insert_header("content-type", "text/html"),
            )
            .mount(server)
            .await;
    }
}

/// Creates a scripted static-backend configuration for the mock server
fn create_test_config(base_url: &str, max_pages: u32, output_dir: &str) -> Config {
    parse_config(&format!(
        r#"
[session]
start-url = "{base_url}/list/1"
max-pages = {max_pages}

[driver]
backend = "static"
ready-timeout-ms = 5000

[output]
directory = "{output_dir}"
file-prefix = "products"

[[field]]
label = "title"
anchor = "h2.title"

[[field]]
label = "price"
anchor = "span.price"

[next-page]
anchor = "a.next"
"#,
        base_url = base_url,
        max_pages = max_pages,
        output_dir = output_dir
    ))
    .expect("Failed to parse test config")
}

async fn run_harvest(config: &Config) -> CrawlReport {
    let driver = StaticPage::new(&config.driver.user_agent, Duration::from_secs(5))
        .expect("Failed to build driver");
    let mut prompter = ScriptedPrompter::from_config(config);
    harvest(&driver, &mut prompter, config, CancellationToken::new())
        .await
        .expect("Harvest failed")
}

#[tokio::test]
async fn test_multi_page_harvest_follows_next_links() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 3).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 5, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;

    assert_eq!(report.labels, vec!["title", "price"]);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records.len(), 6);
    assert_eq!(report.stop_reason, StopReason::NextControlMissing);

    let last = &report.records[5];
    assert_eq!(last.page, 3);
    assert_eq!(last.get("title"), Some("Item 3-b"));
    assert_eq!(last.get("price"), Some("3.20"));
}

#[tokio::test]
async fn test_page_budget_limits_crawl() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 3).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 2, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.stop_reason, StopReason::PageBudgetReached);
}

#[tokio::test]
async fn test_failing_second_page_keeps_first_page_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(
                    1,
                    Some(r#"<a class="next" href="/list/2">Next</a>"#),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 3, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.page == 1));
    match &report.stop_reason {
        StopReason::NavigationFailed(detail) => assert!(detail.contains("500")),
        other => panic!("Expected navigation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disabled_next_control_ends_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(
                    1,
                    Some(r#"<a class="next" href="/list/2" aria-disabled="true">Next</a>"#),
                ))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 3, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.stop_reason, StopReason::NextControlInactive);
}

#[tokio::test]
async fn test_csv_export_of_harvest() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 2).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 2, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;
    let exporter = CsvExporter::new(&config.output.directory, &config.output.file_prefix);
    let path = exporter
        .export(&report)
        .expect("Export failed")
        .expect("No file written");

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "title,price");
    assert_eq!(lines[1], "Item 1-a,1.10");
    assert_eq!(lines[4], "Item 2-b,2.20");
}

#[tokio::test]
async fn test_sqlite_export_of_harvest() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 1, dir.path().to_str().unwrap());

    let report = run_harvest(&config).await;
    assert_eq!(report.stop_reason, StopReason::PageBudgetReached);

    let exporter = SqliteExporter::new(
        &config.output.directory,
        &config.output.file_prefix,
        &config.session.start_url,
        "test-hash",
    );
    let path = exporter.export(&report).unwrap().unwrap();

    let conn = rusqlite::Connection::open(path).unwrap();
    let values: i64 = conn
        .query_row("SELECT COUNT(*) FROM record_values", [], |row| row.get(0))
        .unwrap();
    assert_eq!(values, 4);
}

#[tokio::test]
async fn test_unreachable_start_page_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), 1, dir.path().to_str().unwrap());

    let driver = StaticPage::new("TestHarvester/1.0", Duration::from_secs(5)).unwrap();
    let mut prompter = ScriptedPrompter::from_config(&config);
    let result = harvest(&driver, &mut prompter, &config, CancellationToken::new()).await;

    assert!(result.is_err());
}
