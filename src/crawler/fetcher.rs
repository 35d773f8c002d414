//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests to fetch page content
//! - Error classification into [`AppError`] kinds

use crate::config::CrawlerConfig;
use crate::error::AppError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use jsfinder::config::CrawlerConfig;
/// use jsfinder::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout().min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page body with a single GET request
///
/// # Error Classification
///
/// | Condition | Kind |
/// |-----------|------|
/// | HTTP status >= 400 | Http, `status_code` in context |
/// | Connect / request failure | Network |
/// | Client request timeout | Network, `reason = request_timeout` |
/// | Body read failure | Network |
/// | Invalid request | Validation |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<String, AppError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AppError::from_reqwest(url.as_str(), e))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(AppError::http(
            format!("HTTP error for {}", url),
            status.as_u16(),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| AppError::from_reqwest(url.as_str(), e).wrap("failed to read response body"))
}
