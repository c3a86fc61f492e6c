//! Per-run crawl session and the records it accumulates

use crate::locator::Locator;
use crate::selection::FieldSet;
use crate::state::StopReason;

/// One aligned row of extracted values
///
/// Values are stored in field order; every label of the field set is
/// present, possibly with an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// 1-based page number the record was collected from
    pub page: u32,

    /// `(label, value)` pairs in field order
    pub values: Vec<(String, String)>,
}

impl PageRecord {
    /// Value for `label`, if the label is part of the record
    pub fn get(&self, label: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true when every value is the empty string
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_empty())
    }
}

/// State of one extraction run, owned by the crawler while it runs
#[derive(Debug, Clone)]
pub struct CrawlSession {
    /// Fields selected by the user; closed for the rest of the run
    pub fields: FieldSet,

    /// Locator of the next-page control; `None` is single-page mode
    pub next_page: Option<Locator>,

    /// Page budget, at least 1
    pub max_pages: u32,

    /// Pages collected so far
    pub pages_visited: u32,

    /// Records in collection order
    pub records: Vec<PageRecord>,

    /// Set when the crawl reaches its terminal state
    pub stop_reason: Option<StopReason>,
}

impl CrawlSession {
    /// Creates an empty session
    ///
    /// A zero page budget is raised to 1; the start page is always collected.
    pub fn new(fields: FieldSet, next_page: Option<Locator>, max_pages: u32) -> Self {
        Self {
            fields,
            next_page,
            max_pages: max_pages.max(1),
            pages_visited: 0,
            records: Vec::new(),
            stop_reason: None,
        }
    }

    /// Returns true once the page budget is spent
    pub fn budget_reached(&self) -> bool {
        self.pages_visited >= self.max_pages
    }

    /// Appends one page worth of records and counts the page
    pub fn record_page(&mut self, records: Vec<PageRecord>) {
        self.pages_visited += 1;
        self.records.extend(records);
    }
}
