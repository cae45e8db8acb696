use anyhow::Result;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client as HttpClient};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::utils::error::AppError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; ListingIntegrationBuilder/1.0)";

/// Configuration for the page fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User agent to use for requests
    pub user_agent: String,
    /// Timeout for a whole request, redirects included (in seconds)
    pub request_timeout_secs: u64,
    /// Maximum number of redirects followed before giving up
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            max_redirects: 5,
        }
    }
}

/// Markup and status of a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves page markup. Any HTTP status is returned as a page; only
/// transport problems are errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// `PageFetcher` backed by a shared reqwest client.
pub struct HttpFetcher {
    http_client: HttpClient,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http_client, config })
    }

    fn describe_error(&self, url: &str, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Request to {} timed out after {}s", url, self.config.request_timeout_secs)
        } else if err.is_redirect() {
            format!("Too many redirects for {} (max: {})", url, self.config.max_redirects)
        } else {
            format!("Request to {} failed: {}", url, err)
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed_url = Url::parse(url)
            .map_err(|e| AppError::InvalidInput(format!("Invalid URL: {}, error: {}", url, e)))?;
        if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
            return Err(AppError::InvalidInput(format!("Unsupported URL scheme: {}", url)).into());
        }

        debug!("Fetching URL: {}", url);

        let response = self
            .http_client
            .get(parsed_url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(self.describe_error(url, &e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status: {}", url, status);
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::Fetch(self.describe_error(url, &e)))?;

        debug!("Downloaded {} bytes of HTML from {}", html.len(), url);

        Ok(FetchedPage {
            html,
            status: status.as_u16(),
        })
    }
}
