//! Crawler coordinator - the pagination state machine
//!
//! Drives `Collecting -> CheckingNext -> Navigating -> Collecting` until the
//! page budget is spent, the next-page control disappears or goes inactive,
//! navigation fails, or the caller cancels. Records already collected are
//! never discarded.

use crate::crawler::collector::collect;
use crate::driver::PageDriver;
use crate::state::{CrawlSession, CrawlState, StopReason};
use crate::HarvestError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of the next-page check
enum NextStep<E> {
    Navigate(E),
    Stop(StopReason),
}

/// Main crawler coordinator structure
///
/// Owns the [`CrawlSession`] for the duration of the crawl and hands it back
/// from [`run`](Self::run).
pub struct Coordinator<'a, D: PageDriver> {
    driver: &'a D,
    session: CrawlSession,
    state: CrawlState,
    ready_timeout: Duration,
    cancel: CancellationToken,
    /// Control matched by the last next-page check, consumed by navigation
    next_control: Option<D::Element>,
}

impl<'a, D: PageDriver> Coordinator<'a, D> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `driver` - Driver with the start page already loaded
    /// * `session` - Fresh session holding the selected fields and page budget
    /// * `ready_timeout` - Ceiling for each post-navigation readiness wait
    /// * `cancel` - Checked before every state transition
    pub fn new(
        driver: &'a D,
        session: CrawlSession,
        ready_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            session,
            state: CrawlState::Init,
            ready_timeout,
            cancel,
            next_control: None,
        }
    }

    /// Current state of the state machine
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Runs the crawl loop to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - The finished session, `stop_reason` set
    /// * `Err(HarvestError::Driver(_))` - The browser session was lost
    pub async fn run(mut self) -> Result<CrawlSession, HarvestError> {
        tracing::info!(
            max_pages = self.session.max_pages,
            fields = self.session.fields.len(),
            paginated = self.session.next_page.is_some(),
            "Starting crawl"
        );

        while !self.state.is_terminal() {
            if self.cancel.is_cancelled() {
                tracing::info!(state = %self.state, "Crawl cancelled");
                self.finish(StopReason::Cancelled)?;
                break;
            }

            match self.state {
                CrawlState::Init => self.transition(CrawlState::Collecting)?,
                CrawlState::Collecting => {
                    self.collect_page().await?;
                    self.transition(CrawlState::CheckingNext)?;
                }
                CrawlState::CheckingNext => match self.check_next().await? {
                    NextStep::Navigate(control) => {
                        self.next_control = Some(control);
                        self.transition(CrawlState::Navigating)?;
                    }
                    NextStep::Stop(reason) => self.finish(reason)?,
                },
                CrawlState::Navigating => self.navigate().await?,
                CrawlState::Done => break,
            }
        }

        tracing::info!(
            pages = self.session.pages_visited,
            records = self.session.records.len(),
            reason = %self
                .session
                .stop_reason
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            "Crawl finished"
        );

        Ok(self.session)
    }

    fn transition(&mut self, next: CrawlState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(from = %self.state, to = %next, "State transition");
        self.state = next;
        Ok(())
    }

    fn finish(&mut self, reason: StopReason) -> Result<(), HarvestError> {
        self.transition(CrawlState::Done)?;
        self.next_control = None;
        self.session.stop_reason = Some(reason);
        Ok(())
    }

    async fn collect_page(&mut self) -> Result<(), HarvestError> {
        let page = self.session.pages_visited + 1;
        let records = collect(self.driver, &self.session.fields, page).await?;
        self.session.record_page(records);
        Ok(())
    }

    /// Decides whether to move on, and finds the control to activate
    async fn check_next(&self) -> Result<NextStep<D::Element>, HarvestError> {
        if self.session.budget_reached() {
            tracing::info!(max_pages = self.session.max_pages, "Page budget reached");
            return Ok(NextStep::Stop(StopReason::PageBudgetReached));
        }

        let locator = match &self.session.next_page {
            Some(locator) => locator,
            None => return Ok(NextStep::Stop(StopReason::SinglePageMode)),
        };

        let candidates = match self.driver.find_all(locator).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(locator = %locator, "Next-page lookup failed: {}", e);
                Vec::new()
            }
        };

        let control = match candidates.into_iter().next() {
            Some(control) => control,
            None => {
                tracing::info!(locator = %locator, "No next-page control, last page reached");
                return Ok(NextStep::Stop(StopReason::NextControlMissing));
            }
        };

        let active = match self.driver.is_interactable(&control).await {
            Ok(active) => active,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Next-page control state unreadable: {}", e);
                false
            }
        };

        if !active {
            tracing::info!(locator = %locator, "Next-page control is hidden or disabled");
            return Ok(NextStep::Stop(StopReason::NextControlInactive));
        }

        Ok(NextStep::Navigate(control))
    }

    /// Activates the pending control and waits for the new page
    ///
    /// Non-fatal failures end the crawl with the records collected so far.
    async fn navigate(&mut self) -> Result<(), HarvestError> {
        let control = match self.next_control.take() {
            Some(control) => control,
            None => {
                return self.finish(StopReason::NavigationFailed(
                    "no next-page control pending".to_string(),
                ))
            }
        };

        let page = self.session.pages_visited + 1;
        tracing::debug!(page, "Navigating to next page");

        let result = match self.driver.activate(&control).await {
            Ok(()) => self.driver.wait_ready(self.ready_timeout).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.transition(CrawlState::Collecting),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                tracing::warn!(page, "Navigation failed, keeping collected records: {}", e);
                self.finish(StopReason::NavigationFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverResult, ElementProfile, StaticElement, StaticPage};
    use crate::locator::{InferenceStrategy, Locator};
    use async_trait::async_trait;
    use crate::selection::{FieldSet, FieldSpec};
    use std::path::Path;
    use tempfile::TempDir;
    use url::Url;

    /// Writes `count` linked listing pages, each with two items
    fn write_pages(dir: &Path, count: usize) {
        for n in 1..=count {
            let next = if n < count {
                format!(r#"<a class="next" href="page{}.html">Next</a>"#, n + 1)
            } else {
                String::new()
            };
            let html = format!(
                r#"<div class="item">p{n} first</div><div class="item">p{n} second</div>{next}"#,
                n = n,
                next = next
            );
            std::fs::write(dir.join(format!("page{}.html", n)), html).unwrap();
        }
    }

    async fn driver_at(dir: &TempDir, page: &str) -> StaticPage {
        let driver = StaticPage::new("TestHarvester/1.0", Duration::from_secs(5)).unwrap();
        let url = Url::from_file_path(dir.path().join(page)).unwrap();
        driver.goto(&url).await.unwrap();
        driver
    }

    fn session(next_page: Option<Locator>, max_pages: u32) -> CrawlSession {
        let mut fields = FieldSet::new();
        fields
            .insert(FieldSpec {
                label: "name".to_string(),
                locator: Locator::Class("item".to_string()),
                strategy: InferenceStrategy::SharedClass,
            })
            .unwrap();
        CrawlSession::new(fields, next_page, max_pages)
    }

    fn next_locator() -> Option<Locator> {
        Some(Locator::Class("next".to_string()))
    }

    async fn run(driver: &StaticPage, session: CrawlSession) -> CrawlSession {
        Coordinator::new(driver, session, Duration::from_secs(1), CancellationToken::new())
            .run()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_page_mode_ignores_budget() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 3);
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(None, 5)).await;

        assert_eq!(done.pages_visited, 1);
        assert_eq!(done.records.len(), 2);
        assert_eq!(done.stop_reason, Some(StopReason::SinglePageMode));
    }

    #[tokio::test]
    async fn test_budget_smaller_than_listing() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 3);
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(next_locator(), 2)).await;

        assert_eq!(done.pages_visited, 2);
        assert_eq!(done.records.len(), 4);
        assert_eq!(done.records[3].page, 2);
        assert_eq!(done.stop_reason, Some(StopReason::PageBudgetReached));
    }

    #[tokio::test]
    async fn test_budget_larger_than_listing() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 3);
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(next_locator(), 10)).await;

        assert_eq!(done.pages_visited, 3);
        assert_eq!(done.records.len(), 6);
        assert_eq!(done.records[5].get("name"), Some("p3 second"));
        assert_eq!(done.stop_reason, Some(StopReason::NextControlMissing));
    }

    #[tokio::test]
    async fn test_navigation_failure_keeps_first_page() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 2);
        std::fs::remove_file(dir.path().join("page2.html")).unwrap();
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(next_locator(), 3)).await;

        assert_eq!(done.pages_visited, 1);
        assert_eq!(done.records.len(), 2);
        assert!(done.records.iter().all(|r| r.page == 1));
        assert!(matches!(
            done.stop_reason,
            Some(StopReason::NavigationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_next_control_stops_crawl() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("page1.html"),
            r#"<div class="item">only</div><a class="next" href="page2.html" aria-disabled="true">Next</a>"#,
        )
        .unwrap();
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(next_locator(), 3)).await;

        assert_eq!(done.pages_visited, 1);
        assert_eq!(done.stop_reason, Some(StopReason::NextControlInactive));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 2);
        let driver = driver_at(&dir, "page1.html").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator =
            Coordinator::new(&driver, session(next_locator(), 3), Duration::from_secs(1), cancel);
        assert_eq!(coordinator.state(), CrawlState::Init);

        let done = coordinator.run().await.unwrap();

        assert_eq!(done.pages_visited, 0);
        assert!(done.records.is_empty());
        assert_eq!(done.stop_reason, Some(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn test_empty_records_are_not_retained() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("page1.html"),
            r#"<div class="item"> </div><div class="item"></div>"#,
        )
        .unwrap();
        let driver = driver_at(&dir, "page1.html").await;

        let done = run(&driver, session(None, 1)).await;

        assert_eq!(done.pages_visited, 1);
        assert!(done.records.is_empty());
    }

    /// Static driver that trips the cancel token when the next-page control is checked
    struct CancelOnNextCheck {
        inner: StaticPage,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl PageDriver for CancelOnNextCheck {
        type Element = StaticElement;

        async fn goto(&self, url: &Url) -> DriverResult<()> {
            self.inner.goto(url).await
        }

        async fn current_url(&self) -> DriverResult<String> {
            self.inner.current_url().await
        }

        async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<StaticElement>> {
            self.inner.find_all(locator).await
        }

        async fn first_match(&self, css: &str) -> DriverResult<Option<StaticElement>> {
            self.inner.first_match(css).await
        }

        async fn text(&self, element: &StaticElement) -> DriverResult<String> {
            self.inner.text(element).await
        }

        async fn profile(&self, element: &StaticElement) -> DriverResult<ElementProfile> {
            self.inner.profile(element).await
        }

        async fn count_class(&self, class: &str) -> DriverResult<usize> {
            self.inner.count_class(class).await
        }

        async fn is_interactable(&self, element: &StaticElement) -> DriverResult<bool> {
            self.cancel.cancel();
            self.inner.is_interactable(element).await
        }

        async fn activate(&self, element: &StaticElement) -> DriverResult<()> {
            self.inner.activate(element).await
        }

        async fn wait_ready(&self, timeout: Duration) -> DriverResult<()> {
            self.inner.wait_ready(timeout).await
        }

        async fn arm_selection(&self) -> DriverResult<()> {
            self.inner.arm_selection().await
        }

        async fn take_selection(&self) -> DriverResult<Option<StaticElement>> {
            self.inner.take_selection().await
        }

        async fn close(&self) -> DriverResult<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_between_pages_keeps_records() {
        let dir = TempDir::new().unwrap();
        write_pages(dir.path(), 3);
        let cancel = CancellationToken::new();
        let driver = CancelOnNextCheck {
            inner: driver_at(&dir, "page1.html").await,
            cancel: cancel.clone(),
        };

        let done = Coordinator::new(
            &driver,
            session(next_locator(), 3),
            Duration::from_secs(1),
            cancel,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(done.pages_visited, 1);
        assert_eq!(done.records.len(), 2);
        assert_eq!(done.records[0].get("name"), Some("p1 first"));
        assert!(done.records.iter().all(|r| r.page == 1));
        assert_eq!(done.stop_reason, Some(StopReason::Cancelled));
        assert!(driver.current_url().await.unwrap().ends_with("page1.html"));
    }
}
