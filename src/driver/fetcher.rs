//! Document fetcher for the static backend
//!
//! Builds the HTTP client and loads documents from `http`, `https` and
//! `file` URLs. Failures are classified into [`DriverError::Http`] so the
//! crawler can treat them as navigation failures.

use crate::driver::{DriverError, DriverResult};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum number of redirects followed for one document
const MAX_REDIRECTS: usize = 10;

/// A successfully loaded HTML document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects, used to resolve relative links
    pub final_url: Url,
    /// Raw HTML body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value of the User-Agent header
/// * `timeout` - Total request timeout; doubles as the readiness ceiling
///
/// # Example
///
/// ```no_run
/// use page_harvest::driver::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("page-harvest/0.1", Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a document, bounded by `timeout`
///
/// | Condition | Result |
/// |-----------|--------|
/// | `file://` URL | read from disk |
/// | HTTP 2xx | document body |
/// | Any other status | `DriverError::Http` |
/// | Timeout | `DriverError::Timeout` |
/// | Connection / body error | `DriverError::Http` |
pub async fn fetch_document(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> DriverResult<FetchedDocument> {
    if url.scheme() == "file" {
        return read_file_document(url).await;
    }

    match tokio::time::timeout(timeout, fetch_http_document(client, url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout(timeout)),
    }
}

async fn fetch_http_document(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> DriverResult<FetchedDocument> {
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            DriverError::Timeout(timeout)
        } else if e.is_connect() {
            DriverError::Http {
                url: url.to_string(),
                message: "Connection refused".to_string(),
            }
        } else {
            DriverError::Http {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    };

    let response = client.get(url.as_str()).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DriverError::Http {
            url: url.to_string(),
            message: format!("HTTP {}", status.as_u16()),
        });
    }

    let final_url = response.url().clone();
    let body = response.text().await.map_err(classify)?;

    tracing::debug!(url = %final_url, bytes = body.len(), "Fetched document");

    Ok(FetchedDocument { final_url, body })
}

async fn read_file_document(url: &Url) -> DriverResult<FetchedDocument> {
    let path = url.to_file_path().map_err(|_| DriverError::Http {
        url: url.to_string(),
        message: "Not a local file path".to_string(),
    })?;

    let body = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| DriverError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    Ok(FetchedDocument {
        final_url: url.clone(),
        body,
    })
}
