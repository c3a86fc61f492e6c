use crate::config::types::{
    Backend, Config, DriverConfig, FieldPick, OutputConfig, SessionConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Upper bound for the readiness wait (5 minutes)
pub const MAX_READY_TIMEOUT_MS: u64 = 300_000;

/// Lower bound for the readiness wait
pub const MIN_READY_TIMEOUT_MS: u64 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_driver_config(&config.driver)?;
    validate_output_config(&config.output)?;
    validate_field_picks(&config.fields)?;

    if config.driver.backend == Backend::Static && !config.is_scripted() {
        return Err(ConfigError::Validation(
            "the static backend cannot capture clicks; add [[field]] anchors".to_string(),
        ));
    }

    if let Some(next) = &config.next_page {
        validate_anchor("next-page", &next.anchor)?;
    }

    Ok(())
}

/// Validates the session parameters
pub(crate) fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https" | "file") {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url must use http, https or file scheme, got '{}'",
            url.scheme()
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates driver configuration
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if !(MIN_READY_TIMEOUT_MS..=MAX_READY_TIMEOUT_MS).contains(&config.ready_timeout_ms) {
        return Err(ConfigError::Validation(format!(
            "ready-timeout-ms must be between {} and {}, got {}",
            MIN_READY_TIMEOUT_MS, MAX_READY_TIMEOUT_MS, config.ready_timeout_ms
        )));
    }

    if config.settle_ms > config.ready_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "settle-ms ({}) cannot exceed ready-timeout-ms ({})",
            config.settle_ms, config.ready_timeout_ms
        )));
    }

    Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver-url: {}", e)))?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file-prefix cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "file-prefix must not contain path separators, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

/// Anchors must be non-empty CSS selectors
fn validate_anchor(owner: &str, anchor: &str) -> Result<(), ConfigError> {
    if anchor.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} has an empty anchor",
            owner
        )));
    }

    Selector::parse(anchor).map_err(|e| {
        ConfigError::Validation(format!(
            "{} anchor '{}' is not a valid CSS selector: {:?}",
            owner, anchor, e
        ))
    })?;

    Ok(())
}

/// Validates scripted field picks: labels non-empty and unique, anchors valid
fn validate_field_picks(picks: &[FieldPick]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for pick in picks {
        let label = pick.label.trim();
        if label.is_empty() {
            return Err(ConfigError::Validation(
                "field label cannot be empty".to_string(),
            ));
        }

        if !seen.insert(label) {
            return Err(ConfigError::Validation(format!(
                "duplicate field label '{}'",
                label
            )));
        }

        validate_anchor(&format!("field '{}'", label), &pick.anchor)?;
    }

    Ok(())
}
