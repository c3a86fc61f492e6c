//! Configuration module for Page-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use page_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl will visit at most {} pages", config.session.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AnchorPick, Backend, Config, DriverConfig, FieldPick, OutputConfig, OutputFormat,
    SessionConfig,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::{validate, MAX_READY_TIMEOUT_MS, MIN_READY_TIMEOUT_MS};
