use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{handlers, health};
use crate::application::scraper::service::ScraperService;

#[derive(Clone)]
pub struct AppState {
    pub scraper_service: ScraperService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check routes
        .route("/health", get(health::health_check))

        // Integration builder routes
        .route("/api/integrations/test-selector", post(handlers::integrations::test_selector))
        .route("/api/integrations/preview", post(handlers::integrations::preview))
        .route("/api/integrations/fetch", post(handlers::integrations::fetch_page))
        .route("/api/integrations/batch-test", post(handlers::integrations::batch_test))
        .route("/api/integrations/discover", post(handlers::integrations::discover))
        .route("/api/integrations/validate", post(handlers::integrations::validate))

        .with_state(state)

        // Add middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(address: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", address, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Error waiting for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, stopping API server");
        })
        .await?;

    Ok(())
}
