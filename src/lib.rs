//! Page-Harvest: an interactive, pagination-aware web data extractor
//!
//! The user points at one element per field on a listing page; the crate
//! generalizes each pick into a locator matching every homogeneous sibling,
//! harvests aligned records from the page, and follows a "next page" control
//! until a page budget or a termination condition is reached.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod locator;
pub mod output;
pub mod selection;
pub mod state;

use thiserror::Error;

/// Main error type for Page-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Selection error: {0}")]
    Selection(#[from] selection::SelectionError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Page-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, Coordinator};
pub use locator::{infer, Inference, InferenceStrategy, Locator};
pub use output::{finalize, CrawlReport};
pub use selection::{FieldSet, FieldSpec};
pub use state::{CrawlSession, CrawlState, PageRecord, StopReason};
