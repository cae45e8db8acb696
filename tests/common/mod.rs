#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_builder::application::scraper::fetcher::{FetchedPage, PageFetcher};
use integration_builder::application::scraper::service::ScraperService;

/// Serves canned listing pages keyed by URL path markers:
/// `/panic` panics, `/fail` errors, `/missing` answers 404,
/// `?delay=N` sleeps N ms before answering.
#[derive(Default)]
pub struct StubFetcher {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = url
            .split("delay=")
            .nth(1)
            .and_then(|ms| ms.parse::<u64>().ok())
            .unwrap_or(10);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("/panic") {
            panic!("fetcher exploded");
        }
        if url.contains("/fail") {
            return Err(anyhow!("connection refused"));
        }
        if url.contains("/missing") {
            return Ok(FetchedPage { html: "<h1>Not found</h1>".into(), status: 404 });
        }

        Ok(FetchedPage { html: listing_html(url), status: 200 })
    }
}

pub fn listing_html(url: &str) -> String {
    format!(
        r#"<html>
            <head><title>Listing {url}</title></head>
            <body>
                <h1 class="title">Apartament 3 camere</h1>
                <div class="price">Preț: 89.900 €</div>
                <a class="agent" href="/agenti/ion">Ion</a>
                <ul class="photos"><li><img src="/p/1.jpg"></li><li><img src="/p/2.jpg"></li></ul>
            </body>
        </html>"#
    )
}

pub fn stub_service() -> (ScraperService, Arc<StubFetcher>) {
    let fetcher = Arc::new(StubFetcher::default());
    (ScraperService::new(fetcher.clone()), fetcher)
}
