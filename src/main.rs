use std::sync::Arc;
use tracing::{error, info};

use integration_builder::api::routes::{self, AppState};
use integration_builder::application::scraper::fetcher::{FetcherConfig, HttpFetcher};
use integration_builder::application::scraper::service::ScraperService;
use integration_builder::config::settings::AppConfig;
use integration_builder::utils::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_tracing();

    info!("Starting listing integration builder");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let fetcher_config = FetcherConfig {
        user_agent: config.scraper.user_agent.clone(),
        request_timeout_secs: config.scraper.request_timeout_secs,
        max_redirects: config.scraper.max_redirects,
    };

    let fetcher = match HttpFetcher::new(fetcher_config) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("Failed to initialize page fetcher: {}", e);
            return Err(e);
        }
    };
    info!("Page fetcher initialized");

    let scraper_service =
        ScraperService::new(fetcher).with_max_batch_urls(config.scraper.max_batch_urls);

    routes::serve(
        &config.server.address,
        config.server.port,
        AppState { scraper_service },
    )
    .await?;

    info!("All services stopped");
    Ok(())
}
