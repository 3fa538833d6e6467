//! Page retrieval.
//!
//! The crawl only needs "give me the HTML at this URL", so that is all
//! [`PageFetcher`] asks for. [`HttpFetcher`] is the live implementation;
//! tests substitute an in-memory map of URL to HTML.

use crate::api::backoff_delay;
use crate::config::Config;
use crate::error::CrawlError;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

pub trait PageFetcher {
    /// Retrieve the body of `url` as text.
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError>;
}

/// Fetches pages over HTTP with `reqwest`, retrying transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    base_delay: Duration,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, retries: usize) -> Self {
        HttpFetcher {
            client,
            retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Shared HTTP client built from the crawl configuration.
    pub fn client_for(config: &Config) -> Result<reqwest::Client, CrawlError> {
        reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {e}")))
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CrawlError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::status(url.as_str(), status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| CrawlError::fetch(url.as_str(), e))
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError> {
        let t0 = Instant::now();
        let mut attempt = 0usize;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(bytes = body.len(), elapsed_ms = t0.elapsed().as_millis(), "Fetched page");
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, self.base_delay);
                    warn!(attempt, max = self.retries, ?delay, error = %e, "Fetch failed; backing off");
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
