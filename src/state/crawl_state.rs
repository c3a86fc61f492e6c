/// Crawl state definitions for the pagination loop
///
/// This module defines the states the crawler moves through while
/// harvesting a listing, and why a crawl ended.
use std::fmt;

/// Represents the current state of the pagination crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Session built, nothing collected yet
    Init,

    /// Extracting records from the current page
    Collecting,

    /// Deciding whether another page should be visited
    CheckingNext,

    /// Activating the next-page control and waiting for the new page
    Navigating,

    /// Terminal; the collected records are final
    Done,
}

impl CrawlState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the crawl may move from `self` to `next`
    ///
    /// ```text
    /// Init -> Collecting -> CheckingNext -> Navigating -> Collecting
    ///                            |              |
    ///                            +---> Done <---+
    /// ```
    ///
    /// Every non-terminal state may also end the crawl directly on
    /// cancellation.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::Init, Self::Collecting) => true,
            (Self::Collecting, Self::CheckingNext) => true,
            (Self::CheckingNext, Self::Navigating) => true,
            (Self::Navigating, Self::Collecting) => true,
            _ => false,
        }
    }

    /// Converts the state to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Collecting => "collecting",
            Self::CheckingNext => "checking_next",
            Self::Navigating => "navigating",
            Self::Done => "done",
        }
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Collecting,
            Self::CheckingNext,
            Self::Navigating,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a crawl reached [`CrawlState::Done`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `max_pages` pages were collected
    PageBudgetReached,

    /// No next-page locator was selected
    SinglePageMode,

    /// The next-page locator matched nothing on the current page
    NextControlMissing,

    /// The next-page control exists but is hidden or disabled
    NextControlInactive,

    /// Activating the control or waiting for the new page failed
    NavigationFailed(String),

    /// The caller cancelled the crawl between transitions
    Cancelled,
}

impl StopReason {
    /// Converts the stop reason to a database string representation
    ///
    /// The failure detail of `NavigationFailed` is not part of the key.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::PageBudgetReached => "page_budget_reached",
            Self::SinglePageMode => "single_page_mode",
            Self::NextControlMissing => "next_control_missing",
            Self::NextControlInactive => "next_control_inactive",
            Self::NavigationFailed(_) => "navigation_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageBudgetReached => write!(f, "page budget reached"),
            Self::SinglePageMode => write!(f, "single-page mode"),
            Self::NextControlMissing => write!(f, "next-page control not found"),
            Self::NextControlInactive => write!(f, "next-page control not clickable"),
            Self::NavigationFailed(reason) => write!(f, "navigation failed: {}", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
