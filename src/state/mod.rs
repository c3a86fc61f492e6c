//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the pagination state machine (collecting, checking next, navigating, done)
//! - `StopReason`: why a crawl ended
//! - `CrawlSession`: the fields, page budget and records of one run

mod crawl_state;
mod session;

// Re-export main types
pub use crawl_state::{CrawlState, StopReason};
pub use session::{CrawlSession, PageRecord};
