use serde::Deserialize;

/// Main configuration structure for Page-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Unattended field picks; when empty the user selects interactively
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldPick>,
    #[serde(default, rename = "next-page")]
    pub next_page: Option<AnchorPick>,
}

impl Config {
    /// Returns true when selection is driven by configured anchors instead of clicks
    pub fn is_scripted(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Run parameters for one extraction session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Page the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum number of pages to collect (>= 1)
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

/// Which browser backend drives the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A real browser over the WebDriver protocol
    Webdriver,
    /// Server-rendered HTML fetched over HTTP or read from disk
    Static,
}

/// Browser driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// WebDriver endpoint (chromedriver, geckodriver)
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub headless: bool,

    /// Ceiling for the readiness wait after a navigation (milliseconds)
    #[serde(rename = "ready-timeout-ms", default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Settle delay for navigations that keep the same document (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            webdriver_url: default_webdriver_url(),
            headless: false,
            ready_timeout_ms: default_ready_timeout_ms(),
            settle_ms: default_settle_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Export format for the collected records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the export is written into
    #[serde(default = "default_directory")]
    pub directory: String,

    /// File name prefix; CSV files get a timestamp suffix
    #[serde(rename = "file-prefix", default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            format: default_format(),
        }
    }
}

/// A field selected by CSS anchor instead of a click
#[derive(Debug, Clone, Deserialize)]
pub struct FieldPick {
    pub label: String,

    /// CSS selector whose first match stands in for the clicked element
    pub anchor: String,
}

/// The next-page control selected by CSS anchor
#[derive(Debug, Clone, Deserialize)]
pub struct AnchorPick {
    pub anchor: String,
}

fn default_max_pages() -> u32 {
    1
}

fn default_backend() -> Backend {
    Backend::Webdriver
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_ready_timeout_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("page-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_directory() -> String {
    ".".to_string()
}

fn default_file_prefix() -> String {
    "scraped_data".to_string()
}

fn default_format() -> OutputFormat {
    OutputFormat::Csv
}
