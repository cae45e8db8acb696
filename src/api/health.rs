use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::routes::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    version: String,
    max_batch_urls: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Get version from Cargo.toml
    let version = env!("CARGO_PKG_VERSION");

    Json(HealthResponse {
        status: "ok".to_string(),
        version: version.to_string(),
        max_batch_urls: state.scraper_service.max_batch_urls(),
    })
}
