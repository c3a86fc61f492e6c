//! WebDriver backend
//!
//! Wraps a `fantoccini` client connected to a running WebDriver service
//! (chromedriver on `http://localhost:9515` by default). Locators are
//! evaluated as XPath; element metadata, class counts, click capture and the
//! readiness check run as page scripts.

use crate::driver::scripts::{
    ARM_SELECTION_SCRIPT, COUNT_CLASS_SCRIPT, DISARM_SELECTION_SCRIPT, MARK_DOCUMENT_SCRIPT,
    PROFILE_SCRIPT, READY_STATE_SCRIPT, SELECTED_ATTR,
};
use crate::driver::{DriverError, DriverResult, ElementProfile, PageDriver};
use crate::locator::Locator;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator as WdLocator};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use url::Url;

/// First readiness poll interval
const INITIAL_POLL: Duration = Duration::from_millis(100);

/// Readiness poll interval cap
const MAX_POLL: Duration = Duration::from_secs(1);

fn map_cmd_error(err: CmdError) -> DriverError {
    match err {
        CmdError::Lost(e) => DriverError::Fatal(e.to_string()),
        other => DriverError::Command(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ReadyState {
    state: String,
    marked: bool,
    #[serde(default)]
    leaving: bool,
}

/// Decides whether a polled document is safe to query
///
/// A replaced document is ready once it finished loading. A marked document
/// that began unloading is never ready; the new one has to arrive. A marked
/// document that stayed put (in-place navigation) is given the settle delay.
fn is_ready(state: &ReadyState, elapsed: Duration, settle: Duration) -> bool {
    if state.state != "complete" {
        return false;
    }
    if !state.marked {
        return true;
    }
    !state.leaving && elapsed >= settle
}

/// [`PageDriver`] over a WebDriver session
pub struct WebDriverPage {
    client: Client,
    settle: Duration,
}

impl WebDriverPage {
    /// Connects to a WebDriver service and opens a Chrome session
    ///
    /// # Arguments
    ///
    /// * `webdriver_url` - Endpoint of the running WebDriver service
    /// * `headless` - Run the browser without a window
    /// * `settle` - Settle delay for clicks that do not replace the document
    pub async fn connect(
        webdriver_url: &str,
        headless: bool,
        settle: Duration,
    ) -> DriverResult<Self> {
        let mut args = vec!["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];
        if headless {
            args.push("--headless=new");
        } else {
            args.push("--start-maximized");
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                DriverError::Fatal(format!("Cannot start session at {}: {}", webdriver_url, e))
            })?;

        tracing::info!(endpoint = %webdriver_url, headless, "WebDriver session started");

        Ok(Self { client, settle })
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.client
            .execute(script, args)
            .await
            .map_err(map_cmd_error)
    }

    fn element_arg(element: &Element) -> DriverResult<Value> {
        serde_json::to_value(element).map_err(|e| DriverError::Script(e.to_string()))
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    type Element = Element;

    async fn goto(&self, url: &Url) -> DriverResult<()> {
        self.client.goto(url.as_str()).await.map_err(map_cmd_error)
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(map_cmd_error)
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<Element>> {
        let xpath = locator.to_xpath();
        self.client
            .find_all(WdLocator::XPath(&xpath))
            .await
            .map_err(map_cmd_error)
    }

    async fn first_match(&self, css: &str) -> DriverResult<Option<Element>> {
        let found = self
            .client
            .find_all(WdLocator::Css(css))
            .await
            .map_err(map_cmd_error)?;
        Ok(found.into_iter().next())
    }

    async fn text(&self, element: &Element) -> DriverResult<String> {
        element.text().await.map_err(map_cmd_error)
    }

    async fn profile(&self, element: &Element) -> DriverResult<ElementProfile> {
        let value = self
            .execute(PROFILE_SCRIPT, vec![Self::element_arg(element)?])
            .await?;
        serde_json::from_value(value).map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn count_class(&self, class: &str) -> DriverResult<usize> {
        let value = self.execute(COUNT_CLASS_SCRIPT, vec![json!(class)]).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| DriverError::Script(format!("Expected a count, got {}", value)))
    }

    async fn is_interactable(&self, element: &Element) -> DriverResult<bool> {
        let displayed = element.is_displayed().await.map_err(map_cmd_error)?;
        if !displayed {
            return Ok(false);
        }
        element.is_enabled().await.map_err(map_cmd_error)
    }

    async fn activate(&self, element: &Element) -> DriverResult<()> {
        self.execute(MARK_DOCUMENT_SCRIPT, vec![]).await?;
        element.click().await.map_err(map_cmd_error)
    }

    async fn wait_ready(&self, timeout: Duration) -> DriverResult<()> {
        let start = Instant::now();
        let mut poll_interval = INITIAL_POLL;

        loop {
            match self.execute(READY_STATE_SCRIPT, vec![]).await {
                Ok(value) => match serde_json::from_value::<ReadyState>(value) {
                    Ok(state) if is_ready(&state, start.elapsed(), self.settle) => {
                        tracing::debug!(elapsed = ?start.elapsed(), "Page ready");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!("Unreadable ready state: {}", e),
                },
                // Scripts can fail while the old document is being torn down
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::debug!("Ready poll failed: {}", e),
            }

            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout(timeout));
            }

            tokio::time::sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(MAX_POLL);
        }
    }

    async fn arm_selection(&self) -> DriverResult<()> {
        self.execute(ARM_SELECTION_SCRIPT, vec![]).await.map(|_| ())
    }

    async fn take_selection(&self) -> DriverResult<Option<Element>> {
        let selector = format!("[{}]", SELECTED_ATTR);
        let selected = self.first_match(&selector).await?;
        self.execute(DISARM_SELECTION_SCRIPT, vec![]).await?;
        Ok(selected)
    }

    async fn close(&self) -> DriverResult<()> {
        self.client.clone().close().await.map_err(map_cmd_error)
    }
}
