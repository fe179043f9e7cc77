//! HTTP client for the availability open data feed.

use std::future::Future;
use std::time::Duration;

use maskmap_core::FeedConfig;
use reqwest::{Client, Url};

use crate::error::FeedError;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Source of raw availability datasets.
///
/// [`FeedClient`] is the production implementation; tests drive the sync
/// pipeline with canned bodies through the same seam.
pub trait DatasetFetch: Send + Sync {
    /// Retrieves the full dataset body as text.
    fn fetch(&self) -> impl Future<Output = Result<String, FeedError>> + Send;
}

/// Fetches the feed from a single fixed URL.
///
/// One request per [`DatasetFetch::fetch`] call, no retries: a failed fetch is
/// reported to the caller, which owns the retry policy.
pub struct FeedClient {
    client: Client,
    url: Url,
}

impl FeedClient {
    /// Creates a client for `config.url` with the configured timeout and
    /// `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if the URL does not parse, or
    /// [`FeedError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let url = Url::parse(&config.url).map_err(|e| FeedError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FeedError::InvalidUrl {
                url: config.url.clone(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, url })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl DatasetFetch for FeedClient {
    /// # Errors
    ///
    /// - [`FeedError::Http`] on network failure or timeout.
    /// - [`FeedError::UnexpectedStatus`] on any non-2xx status.
    /// - [`FeedError::EmptyResponse`] if the body is empty or whitespace.
    async fn fetch(&self) -> Result<String, FeedError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/csv,text/plain;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.text().await?;
        let body = strip_byte_order_mark(body);
        if body.trim().is_empty() {
            return Err(FeedError::EmptyResponse {
                url: self.url.to_string(),
            });
        }

        tracing::debug!(url = %self.url, bytes = body.len(), "fetched availability feed");
        Ok(body)
    }
}

fn strip_byte_order_mark(body: String) -> String {
    match body.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => rest.to_owned(),
        None => body,
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
