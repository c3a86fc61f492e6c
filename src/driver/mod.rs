//! Browser driver abstraction
//!
//! The core never talks to a browser directly. Everything it needs from the
//! page (locator evaluation, text, element metadata, activation and the
//! readiness wait) goes through [`PageDriver`]. Two backends implement it:
//!
//! - [`WebDriverPage`]: a real browser over the WebDriver protocol
//! - [`StaticPage`]: server-rendered HTML fetched over HTTP or read from disk

mod fetcher;
mod scripts;
mod static_page;
mod webdriver;

pub use fetcher::{build_http_client, fetch_document, FetchedDocument};
pub use static_page::{StaticElement, StaticPage};
pub use webdriver::WebDriverPage;

use crate::locator::Locator;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors reported by a browser driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver command failed: {0}")]
    Command(String),

    #[error("Element handle belongs to an earlier page load")]
    StaleElement,

    #[error("Page not ready after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("Unexpected script result: {0}")]
    Script(String),

    #[error("Browser session lost: {0}")]
    Fatal(String),
}

impl DriverError {
    /// Returns true when the browser itself is gone and no recovery is possible
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Structural facts about one element, as needed by locator inference
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementProfile {
    /// Lowercase tag name
    pub tag: String,

    /// Class tokens in attribute order
    pub classes: Vec<String>,

    /// Immediate parent, absent for the root element
    pub parent: Option<ParentProfile>,
}

/// Facts about the parent of a profiled element
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentProfile {
    /// The parent's id attribute, if non-empty
    pub id: Option<String>,

    /// Number of the parent's children sharing the profiled element's tag
    #[serde(rename = "sameTagChildren")]
    pub same_tag_children: usize,
}

/// Operations the extractor needs from a browser-automation backend
///
/// Element handles are only valid for the page load they came from.
/// Every call is a blocking round-trip from the caller's point of view;
/// the core never issues two calls concurrently.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opaque handle to one rendered DOM node
    type Element: Clone + Send + Sync;

    /// Loads `url` as the current page
    async fn goto(&self, url: &Url) -> DriverResult<()>;

    /// URL of the current page
    async fn current_url(&self) -> DriverResult<String>;

    /// Evaluates a locator against the live DOM, in document order
    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<Self::Element>>;

    /// First element matching a CSS selector
    async fn first_match(&self, css: &str) -> DriverResult<Option<Self::Element>>;

    /// Visible text of an element (untrimmed)
    async fn text(&self, element: &Self::Element) -> DriverResult<String>;

    /// Tag, classes and parent facts of an element
    async fn profile(&self, element: &Self::Element) -> DriverResult<ElementProfile>;

    /// Number of elements in the document carrying the class token
    async fn count_class(&self, class: &str) -> DriverResult<usize>;

    /// Whether the element is currently visible and enabled
    async fn is_interactable(&self, element: &Self::Element) -> DriverResult<bool>;

    /// Clicks or otherwise activates the element
    async fn activate(&self, element: &Self::Element) -> DriverResult<()>;

    /// Waits until the page reached after [`activate`](Self::activate) is safe to query
    async fn wait_ready(&self, timeout: Duration) -> DriverResult<()>;

    /// Installs the click-capture hooks used for interactive selection
    async fn arm_selection(&self) -> DriverResult<()>;

    /// Element the user clicked since the last [`arm_selection`](Self::arm_selection)
    async fn take_selection(&self) -> DriverResult<Option<Self::Element>>;

    /// Ends the browser session
    async fn close(&self) -> DriverResult<()>;
}
