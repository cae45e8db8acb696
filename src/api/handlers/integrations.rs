use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::api::routes::AppState;
use crate::application::scraper::extractor;
use crate::domain::extraction::{
    BatchTestResult, DiscoveredListings, PagePreview, RawPage, SelectorTestResult,
};
use crate::domain::integration::{Integration, ListPageConfig};
use crate::domain::mapping::FieldMapping;
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSelectorRequest {
    selector: String,
    html: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    url: Option<String>,
    html: Option<String>,
    field_mappings: Vec<FieldMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTestRequest {
    urls: Vec<String>,
    field_mappings: Vec<FieldMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest {
    url: String,
    html: Option<String>,
    list_page: ListPageConfig,
    /// 1-based number of the list page at `url`
    #[serde(default = "first_page")]
    page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    valid: bool,
    field_count: usize,
}

/// Malformed bodies are reported in the same envelope as every other error.
fn parse_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn test_selector(
    State(state): State<AppState>,
    payload: Result<Json<TestSelectorRequest>, JsonRejection>,
) -> ApiResult<SelectorTestResult> {
    let request = parse_payload(payload)?;
    debug!("Testing selector: {}", request.selector);

    let result = match (request.html, request.url) {
        (Some(html), _) => extractor::test_selector(&html, &request.selector),
        (None, Some(url)) => state
            .scraper_service
            .test_selector_at(&url, &request.selector)
            .await?,
        (None, None) => {
            return Err(AppError::InvalidInput("either html or url is required".to_string()))
        }
    };

    Ok(ApiResponse::ok(result))
}

#[instrument(skip(state, payload))]
pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<PagePreview> {
    let request = parse_payload(payload)?;

    let preview = match (request.url, request.html) {
        (url, Some(html)) => {
            extractor::preview_markup(url.as_deref().unwrap_or_default(), &html, &request.field_mappings)
        }
        (Some(url), None) => {
            state
                .scraper_service
                .preview_extraction(&url, &request.field_mappings)
                .await
        }
        (None, None) => {
            return Err(AppError::InvalidInput("either url or html is required".to_string()))
        }
    };

    info!(
        url = %preview.url,
        success = preview.success,
        fields = preview.extractions.len(),
        "Preview finished"
    );

    Ok(ApiResponse::ok(preview))
}

#[instrument(skip(state, payload))]
pub async fn fetch_page(
    State(state): State<AppState>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<RawPage> {
    let request = parse_payload(payload)?;
    let page = state.scraper_service.fetch_page(&request.url).await?;
    Ok(ApiResponse::ok(page))
}

#[instrument(skip(state, payload))]
pub async fn batch_test(
    State(state): State<AppState>,
    payload: Result<Json<BatchTestRequest>, JsonRejection>,
) -> ApiResult<BatchTestResult> {
    let request = parse_payload(payload)?;
    let result = state
        .scraper_service
        .batch_test(request.urls, request.field_mappings)
        .await?;
    Ok(ApiResponse::ok(result))
}

#[instrument(skip(state, payload))]
pub async fn discover(
    State(state): State<AppState>,
    payload: Result<Json<DiscoverRequest>, JsonRejection>,
) -> ApiResult<DiscoveredListings> {
    let request = parse_payload(payload)?;

    let discovered = match request.html {
        Some(html) => extractor::discover_listing_urls(
            &html,
            &request.list_page,
            &request.url,
            request.page,
        )?,
        None => {
            state
                .scraper_service
                .discover_listings(&request.url, &request.list_page, request.page)
                .await?
        }
    };

    Ok(ApiResponse::ok(discovered))
}

#[instrument(skip(payload))]
pub async fn validate(
    payload: Result<Json<Integration>, JsonRejection>,
) -> ApiResult<ValidationResponse> {
    let integration = parse_payload(payload)?;
    integration.validate()?;

    info!("Integration {} ({}) is valid", integration.name, integration.id);

    Ok(ApiResponse::ok(ValidationResponse {
        valid: true,
        field_count: integration.field_mappings.len(),
    }))
}
