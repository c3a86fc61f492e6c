//! Static HTML backend
//!
//! Drives server-rendered pages without a browser: documents are fetched
//! with reqwest (or read from `file://` URLs), parsed with scraper, and a
//! "click" on a next-page control follows its `href`. Pages that build
//! their listing with JavaScript need the WebDriver backend instead.

use crate::driver::fetcher::{build_http_client, fetch_document};
use crate::driver::{DriverError, DriverResult, ElementProfile, PageDriver, ParentProfile};
use crate::locator::Locator;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Handle to an element of one loaded document
///
/// The handle records the document generation it came from; using it after
/// another page was loaded yields [`DriverError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticElement {
    generation: u64,
    index: usize,
}

/// Everything the driver answers about one element, read once at load time
#[derive(Debug, Clone)]
struct IndexedElement {
    tag: String,
    classes: Vec<String>,
    /// Non-empty ids of all ancestors
    scope_ids: Vec<String>,
    text: String,
    parent: Option<ParentProfile>,
    hidden: bool,
    disabled: bool,
    href: Option<String>,
}

impl IndexedElement {
    fn from_ref(element: &ElementRef<'_>) -> Self {
        let value = element.value();
        let tag = value.name().to_string();

        let parent = element.parent().and_then(ElementRef::wrap).map(|parent| {
            let same_tag_children = parent
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == tag)
                .count();
            ParentProfile {
                id: parent
                    .value()
                    .id()
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
                same_tag_children,
            }
        });

        let ancestors: Vec<ElementRef<'_>> =
            element.ancestors().filter_map(ElementRef::wrap).collect();

        Self {
            classes: class_tokens(element).into_iter().map(str::to_string).collect(),
            scope_ids: ancestors
                .iter()
                .filter_map(|ancestor| ancestor.value().id())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            text: visible_text(element),
            parent,
            hidden: is_hidden(element) || ancestors.iter().any(is_hidden),
            disabled: is_disabled(element),
            href: navigation_target(element),
            tag,
        }
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Class(class) => self.classes.iter().any(|c| c == class),
            Locator::ScopedTag { scope_id, tag } => {
                &self.tag == tag && self.scope_ids.iter().any(|id| id == scope_id)
            }
            Locator::Tag(tag) => &self.tag == tag,
        }
    }
}

#[derive(Debug)]
struct LoadedPage {
    url: Url,
    html: String,
    generation: u64,
    /// Elements in document order, root included
    elements: Vec<IndexedElement>,
}

impl LoadedPage {
    fn resolve(&self, element: &StaticElement) -> DriverResult<&IndexedElement> {
        if element.generation != self.generation {
            return Err(DriverError::StaleElement);
        }
        self.elements
            .get(element.index)
            .ok_or(DriverError::StaleElement)
    }

    fn handle(&self, index: usize) -> StaticElement {
        StaticElement {
            generation: self.generation,
            index,
        }
    }
}

/// [`PageDriver`] over fetched HTML documents
pub struct StaticPage {
    client: Client,
    timeout: Duration,
    page: Mutex<Option<Arc<LoadedPage>>>,
}

impl StaticPage {
    /// Creates a backend with its own HTTP client
    ///
    /// `timeout` bounds every document fetch, which is this backend's
    /// readiness wait.
    pub fn new(user_agent: &str, timeout: Duration) -> DriverResult<Self> {
        let client = build_http_client(user_agent, timeout)
            .map_err(|e| DriverError::Command(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            page: Mutex::new(None),
        })
    }

    /// Creates a backend with a document already loaded
    pub fn from_html(url: Url, html: impl Into<String>) -> DriverResult<Self> {
        let driver = Self::new(
            concat!("page-harvest/", env!("CARGO_PKG_VERSION")),
            Duration::from_secs(10),
        )?;
        driver.replace_page(url, html.into())?;
        Ok(driver)
    }

    /// Parses `html` once and makes it the current page
    fn replace_page(&self, url: Url, html: String) -> DriverResult<()> {
        let doc = Html::parse_document(&html);
        let elements: Vec<IndexedElement> = elements(&doc)
            .map(|element| IndexedElement::from_ref(&element))
            .collect();
        drop(doc);

        let mut slot = self
            .page
            .lock()
            .map_err(|e| DriverError::Fatal(format!("Page state poisoned: {}", e)))?;
        let generation = slot.as_ref().map_or(0, |p| p.generation + 1);
        tracing::trace!(url = %url, elements = elements.len(), generation, "Document indexed");
        *slot = Some(Arc::new(LoadedPage {
            url,
            html,
            generation,
            elements,
        }));
        Ok(())
    }

    fn snapshot(&self) -> DriverResult<Arc<LoadedPage>> {
        let slot = self
            .page
            .lock()
            .map_err(|e| DriverError::Fatal(format!("Page state poisoned: {}", e)))?;
        slot.clone()
            .ok_or_else(|| DriverError::Command("No page loaded".to_string()))
    }
}

/// All elements of the document in document order, root included
fn elements(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.root_element().descendants().filter_map(ElementRef::wrap)
}

/// Class tokens in attribute order, without duplicates
fn class_tokens<'a>(element: &ElementRef<'a>) -> Vec<&'a str> {
    let mut tokens: Vec<&str> = Vec::new();
    if let Some(attr) = element.value().attr("class") {
        for token in attr.split_whitespace() {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Text content with whitespace runs collapsed, approximating rendered text
fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn is_disabled(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_some()
        || value
            .attr("aria-disabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// The href a click on `element` would follow: its own or its nearest anchor's
fn navigation_target(element: &ElementRef<'_>) -> Option<String> {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find_map(|candidate| {
            let value = candidate.value();
            match value.name() {
                "a" | "area" => value.attr("href").map(str::trim).map(str::to_string),
                _ => None,
            }
        })
        .filter(|href| {
            !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:")
        })
}

#[async_trait]
impl PageDriver for StaticPage {
    type Element = StaticElement;

    async fn goto(&self, url: &Url) -> DriverResult<()> {
        let doc = fetch_document(&self.client, url, self.timeout).await?;
        self.replace_page(doc.final_url, doc.body)
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.snapshot()?.url.to_string())
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<StaticElement>> {
        let page = self.snapshot()?;
        Ok(page
            .elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.matches(locator))
            .map(|(index, _)| page.handle(index))
            .collect())
    }

    async fn first_match(&self, css: &str) -> DriverResult<Option<StaticElement>> {
        let selector = Selector::parse(css)
            .map_err(|e| DriverError::Command(format!("Invalid selector '{}': {:?}", css, e)))?;
        let page = self.snapshot()?;
        let doc = Html::parse_document(&page.html);

        let index = match doc.select(&selector).next() {
            Some(found) => elements(&doc).position(|element| element.id() == found.id()),
            None => None,
        };
        Ok(index.map(|index| page.handle(index)))
    }

    async fn text(&self, element: &StaticElement) -> DriverResult<String> {
        let page = self.snapshot()?;
        Ok(page.resolve(element)?.text.clone())
    }

    async fn profile(&self, element: &StaticElement) -> DriverResult<ElementProfile> {
        let page = self.snapshot()?;
        let node = page.resolve(element)?;
        Ok(ElementProfile {
            tag: node.tag.clone(),
            classes: node.classes.clone(),
            parent: node.parent.clone(),
        })
    }

    async fn count_class(&self, class: &str) -> DriverResult<usize> {
        let page = self.snapshot()?;
        Ok(page
            .elements
            .iter()
            .filter(|element| element.classes.iter().any(|c| c == class))
            .count())
    }

    async fn is_interactable(&self, element: &StaticElement) -> DriverResult<bool> {
        let page = self.snapshot()?;
        let node = page.resolve(element)?;
        Ok(!node.hidden && !node.disabled && node.href.is_some())
    }

    async fn activate(&self, element: &StaticElement) -> DriverResult<()> {
        let (base, href) = {
            let page = self.snapshot()?;
            let href = page.resolve(element)?.href.clone().ok_or_else(|| {
                DriverError::Command("Control has no navigable href".to_string())
            })?;
            (page.url.clone(), href)
        };

        let target = base.join(&href).map_err(|e| {
            DriverError::Command(format!("Cannot resolve href '{}': {}", href, e))
        })?;
        tracing::debug!(target = %target, "Following next-page link");

        self.goto(&target).await
    }

    async fn wait_ready(&self, _timeout: Duration) -> DriverResult<()> {
        // Fetches complete before `activate` returns; readiness only needs a loaded document.
        self.snapshot().map(|_| ())
    }

    async fn arm_selection(&self) -> DriverResult<()> {
        Err(DriverError::Command(
            "Interactive selection requires the webdriver backend".to_string(),
        ))
    }

    async fn take_selection(&self) -> DriverResult<Option<StaticElement>> {
        Ok(None)
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body>
        <div id="list">
            <div class="item card">Alpha</div>
            <div class="item card">Beta</div>
            <div class="item">  Gamma  </div>
        </div>
        <ul id="nav"><li>One</li><li>Two</li></ul>
        <p class="solo">Lonely</p>
        <a class="next" href="page2.html"><span>Next</span></a>
        <a class="prev" href="page0.html" aria-disabled="true">Prev</a>
        <a class="gone" href="page3.html" style="display: none">Hidden</a>
    </body></html>"#;

    fn page() -> StaticPage {
        StaticPage::from_html(Url::parse("https://example.com/list/").unwrap(), LISTING).unwrap()
    }

    async fn texts(driver: &StaticPage, locator: &Locator) -> Vec<String> {
        let mut out = Vec::new();
        for element in driver.find_all(locator).await.unwrap() {
            out.push(driver.text(&element).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_class_locator_document_order() {
        let driver = page();
        let found = texts(&driver, &Locator::Class("item".to_string())).await;
        assert_eq!(found, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_scoped_tag_locator() {
        let driver = page();
        let locator = Locator::ScopedTag {
            scope_id: "nav".to_string(),
            tag: "li".to_string(),
        };
        assert_eq!(texts(&driver, &locator).await, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_profile_reports_classes_and_parent() {
        let driver = page();
        let element = driver.first_match("div.item").await.unwrap().unwrap();
        let profile = driver.profile(&element).await.unwrap();

        assert_eq!(profile.tag, "div");
        assert_eq!(profile.classes, vec!["item", "card"]);
        let parent = profile.parent.unwrap();
        assert_eq!(parent.id.as_deref(), Some("list"));
        assert_eq!(parent.same_tag_children, 3);
    }

    #[tokio::test]
    async fn test_count_class_is_token_based() {
        let driver = page();
        assert_eq!(driver.count_class("item").await.unwrap(), 3);
        assert_eq!(driver.count_class("card").await.unwrap(), 2);
        assert_eq!(driver.count_class("ite").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interactable_controls() {
        let driver = page();
        let next = driver.first_match("a.next span").await.unwrap().unwrap();
        let prev = driver.first_match("a.prev").await.unwrap().unwrap();
        let gone = driver.first_match("a.gone").await.unwrap().unwrap();
        let solo = driver.first_match("p.solo").await.unwrap().unwrap();

        assert!(driver.is_interactable(&next).await.unwrap());
        assert!(!driver.is_interactable(&prev).await.unwrap());
        assert!(!driver.is_interactable(&gone).await.unwrap());
        assert!(!driver.is_interactable(&solo).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_selector_is_command_error() {
        let driver = page();
        let result = driver.first_match("div[").await;
        assert!(matches!(result, Err(DriverError::Command(_))));
    }

    #[tokio::test]
    async fn test_handles_go_stale_after_reload() {
        let driver = page();
        let element = driver.first_match("p.solo").await.unwrap().unwrap();
        driver
            .replace_page(Url::parse("https://example.com/other").unwrap(), LISTING.to_string())
            .unwrap();

        assert!(matches!(
            driver.text(&element).await,
            Err(DriverError::StaleElement)
        ));
    }

    #[test]
    fn test_document_indexed_once_at_load() {
        let driver = page();
        let page = driver.snapshot().unwrap();
        let first = &page.elements[0];

        assert_eq!(first.tag, "html");
        let solo = page.elements.iter().find(|e| e.tag == "p").unwrap();
        assert_eq!(solo.text, "Lonely");
        assert_eq!(solo.scope_ids, Vec::<String>::new());
        let li = page.elements.iter().find(|e| e.tag == "li").unwrap();
        assert_eq!(li.scope_ids, vec!["nav"]);
    }

    #[tokio::test]
    async fn test_large_listing_reads_every_row() {
        let rows: String = (0..5000)
            .map(|i| format!(r#"<div class="row"><span class="cell">{}</span></div>"#, i))
            .collect();
        let html = format!(r#"<html><body><div id="rows">{}</div></body></html>"#, rows);
        let driver =
            StaticPage::from_html(Url::parse("https://example.com/big").unwrap(), html).unwrap();

        let cells = texts(&driver, &Locator::Class("cell".to_string())).await;
        assert_eq!(cells.len(), 5000);
        assert_eq!(cells[0], "0");
        assert_eq!(cells[4999], "4999");
    }

    #[tokio::test]
    async fn test_activate_follows_relative_href_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("page1.html"),
            r#"<a class="next" href="page2.html">Next</a>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("page2.html"), "<p>Second</p>").unwrap();

        let driver = StaticPage::new("TestHarvester/1.0", Duration::from_secs(5)).unwrap();
        let start = Url::from_file_path(dir.path().join("page1.html")).unwrap();
        driver.goto(&start).await.unwrap();

        let next = driver.first_match("a.next").await.unwrap().unwrap();
        driver.activate(&next).await.unwrap();
        driver.wait_ready(Duration::from_secs(1)).await.unwrap();

        assert!(driver.current_url().await.unwrap().ends_with("page2.html"));
        let paragraphs = texts(&driver, &Locator::Tag("p".to_string())).await;
        assert_eq!(paragraphs, vec!["Second"]);
    }
}
