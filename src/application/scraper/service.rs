use anyhow::Result;
use futures::future::join_all;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info, instrument, warn};

use crate::application::scraper::extractor::{discover_listing_urls, preview_markup, test_selector};
use crate::application::scraper::fetcher::PageFetcher;
use crate::domain::extraction::{
    BatchTestResult, DiscoveredListings, PagePreview, RawPage, SelectorTestResult,
};
use crate::domain::integration::ListPageConfig;
use crate::domain::mapping::{validate_mappings, FieldMapping};
use crate::utils::error::AppError;

/// Upper bound on URLs previewed by one batch test
pub const MAX_BATCH_URLS: usize = 10;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Fetches pages and runs field mappings over them. Holds no per-call state,
/// so clones are cheap and can be moved into spawned tasks.
#[derive(Clone)]
pub struct ScraperService {
    fetcher: Arc<dyn PageFetcher>,
    max_batch_urls: usize,
}

impl ScraperService {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            max_batch_urls: MAX_BATCH_URLS,
        }
    }

    /// Lowers the batch cap; it never goes above `MAX_BATCH_URLS`.
    pub fn with_max_batch_urls(mut self, max_batch_urls: usize) -> Self {
        self.max_batch_urls = max_batch_urls.clamp(1, MAX_BATCH_URLS);
        self
    }

    pub fn max_batch_urls(&self) -> usize {
        self.max_batch_urls
    }

    /// Fetch `url` and run every mapping over it. Fetch failures become a
    /// failed preview; field failures stay inside the extractions.
    #[instrument(skip(self, field_mappings), fields(mappings = field_mappings.len()))]
    pub async fn preview_extraction(&self, url: &str, field_mappings: &[FieldMapping]) -> PagePreview {
        match self.fetch_markup(url).await {
            Ok(html) => preview_markup(url, &html, field_mappings),
            Err(e) => {
                warn!("Preview of {} failed: {}", url, e);
                PagePreview::failed(url, failure_message(&e))
            }
        }
    }

    /// Fetch `url` and probe `selector` against it.
    #[instrument(skip(self))]
    pub async fn test_selector_at(&self, url: &str, selector: &str) -> Result<SelectorTestResult> {
        let html = self.fetch_markup(url).await?;
        Ok(test_selector(&html, selector))
    }

    /// Raw markup and status, whatever the status is.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, url: &str) -> Result<RawPage> {
        let page = self.fetcher.fetch(url).await?;
        info!("Fetched {} ({} bytes, status {})", url, page.html.len(), page.status);

        Ok(RawPage {
            url: url.to_string(),
            length: page.html.len(),
            html: page.html,
            status: page.status,
        })
    }

    /// Fetch list page number `page` and collect the listing URLs on it.
    #[instrument(skip(self, list_page))]
    pub async fn discover_listings(
        &self,
        url: &str,
        list_page: &ListPageConfig,
        page: u32,
    ) -> Result<DiscoveredListings> {
        let html = self.fetch_markup(url).await?;
        let discovered = discover_listing_urls(&html, list_page, url, page)?;
        info!("Discovered {} listing URLs on {}", discovered.listing_urls.len(), url);
        Ok(discovered)
    }

    /// Preview up to `max_batch_urls` pages concurrently. One page failing,
    /// even by panicking, never affects the others; results keep input order.
    /// Empty `urls` or invalid mappings are rejected before anything is fetched.
    #[instrument(skip_all, fields(requested = urls.len(), mappings = field_mappings.len()))]
    pub async fn batch_test(
        &self,
        mut urls: Vec<String>,
        field_mappings: Vec<FieldMapping>,
    ) -> Result<BatchTestResult, AppError> {
        if urls.is_empty() {
            return Err(AppError::InvalidInput("urls must contain at least one URL".to_string()));
        }
        validate_mappings(&field_mappings)?;

        if urls.len() > self.max_batch_urls {
            info!("Truncating batch from {} to {} URLs", urls.len(), self.max_batch_urls);
            urls.truncate(self.max_batch_urls);
        }

        let field_mappings = Arc::new(field_mappings);
        let handles = urls.iter().map(|url| {
            let service = self.clone();
            let url = url.clone();
            let field_mappings = Arc::clone(&field_mappings);
            tokio::spawn(async move { service.preview_extraction(&url, &field_mappings).await })
        });

        let results: Vec<PagePreview> = join_all(handles)
            .await
            .into_iter()
            .zip(&urls)
            .map(|(joined, url)| match joined {
                Ok(preview) => preview,
                Err(e) => {
                    error!("Preview task for {} did not complete: {}", url, e);
                    PagePreview::failed(url, join_failure_reason(e))
                }
            })
            .collect();

        info!(
            tested = results.len(),
            succeeded = results.iter().filter(|p| p.success).count(),
            "Batch test finished"
        );

        Ok(BatchTestResult {
            tested: results.len(),
            results,
        })
    }

    async fn fetch_markup(&self, url: &str) -> Result<String> {
        let page = self.fetcher.fetch(url).await?;
        if !page.is_success() {
            return Err(AppError::Fetch(format!("HTTP error: {}", page.status)).into());
        }
        Ok(page.html)
    }
}

/// Message for a page-level failure, without the error-kind prefix.
fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Fetch(msg))
        | Some(AppError::InvalidInput(msg))
        | Some(AppError::NotFound(msg))
        | Some(AppError::Internal(msg)) => msg.clone(),
        None => err.to_string(),
    }
}

fn join_failure_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return UNKNOWN_ERROR.to_string();
    }
    panic_message(err.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        UNKNOWN_ERROR.to_string()
    }
}
