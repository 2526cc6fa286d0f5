//! HTTP fetching for feeds and source pages.
//!
//! This module provides the shared HTTP client configuration and the
//! [`PageFetcher`] seam used by the cover resolver to download the source
//! article before scraping its metadata.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{QuillError, Result};

/// HTTP client configuration for fetching feeds and web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 10, user_agent: "Mozilla/5.0 (compatible; Quill/0.3; +https://hashnode.com)".to_string() }
    }
}

/// Builds a reqwest client with the given timeout and user agent.
pub fn build_client(timeout: u64, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .user_agent(user_agent)
        .build()
        .map_err(QuillError::HttpError)
}

/// Parses and checks an http(s) URL.
///
/// # Errors
///
/// Returns [`QuillError::InvalidUrl`] when the string is not a URL or uses a
/// scheme other than `http` or `https`.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| QuillError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(QuillError::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}

/// Maps a reqwest error to a timeout when applicable.
pub(crate) fn map_request_error(err: reqwest::Error, timeout: u64) -> QuillError {
    if err.is_timeout() { QuillError::Timeout { timeout } } else { QuillError::HttpError(err) }
}

/// Source of raw HTML pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Downloads the page at `url` and returns its body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = build_client(config.timeout, &config.user_agent)?;
        Ok(Self { client, config })
    }

    /// Fetches the raw bytes behind a URL.
    ///
    /// Used for feeds, whose encoding is declared in the XML prolog rather
    /// than in the HTTP headers.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = parse_http_url(url)?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?
            .error_for_status()?;

        let bytes = response.bytes().await.map_err(|e| map_request_error(e, self.config.timeout))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = parse_http_url(url)?;

        let response = self
            .client
            .get(parsed)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?
            .error_for_status()?;

        let content = response.text().await.map_err(|e| map_request_error(e, self.config.timeout))?;

        Ok(content)
    }
}
