use chrono::{DateTime, Utc};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use crate::domain::mapping::{validate_mappings, FieldMapping};
use crate::utils::error::AppError;

/// A configured listing source: where to find listings and how to map them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: Uuid,
    pub name: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_page: Option<ListPageConfig>,
    /// Stored with the integration for the crawler that runs it; the preview
    /// tools in this service fetch without them.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPageConfig {
    pub url: String,
    /// Selects one element per listing card
    pub item_selector: String,
    /// Link inside the card; when absent the card itself carries the `href`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PaginationConfig {
    #[default]
    None,
    QueryParam {
        param: String,
        #[serde(default = "default_start")]
        start: u32,
        #[serde(default)]
        max_pages: Option<u32>,
    },
    NextLink {
        selector: String,
        #[serde(default)]
        max_pages: Option<u32>,
    },
}

fn default_active() -> bool {
    true
}

fn default_start() -> u32 {
    1
}

impl Integration {
    pub fn new(name: String, base_url: String, field_mappings: Vec<FieldMapping>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            source: SourceConfig {
                base_url,
                list_page: None,
                headers: HashMap::new(),
            },
            field_mappings,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("name must not be empty".to_string()));
        }

        let base_url = parse_http_url(&self.source.base_url, "source.baseUrl")?;

        if let Some(list_page) = &self.source.list_page {
            list_page.validate(&base_url)?;
        }

        validate_mappings(&self.field_mappings)
    }
}

impl ListPageConfig {
    fn validate(&self, base_url: &Url) -> Result<(), AppError> {
        base_url.join(&self.url).map_err(|e| {
            AppError::InvalidInput(format!("source.listPage.url '{}' is invalid: {}", self.url, e))
        })?;

        parse_selector(&self.item_selector, "source.listPage.itemSelector")?;
        if let Some(link_selector) = &self.link_selector {
            parse_selector(link_selector, "source.listPage.linkSelector")?;
        }

        match &self.pagination {
            PaginationConfig::None => {}
            PaginationConfig::QueryParam { param, .. } => {
                if param.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "source.listPage.pagination.param must not be empty".to_string(),
                    ));
                }
            }
            PaginationConfig::NextLink { selector, .. } => {
                parse_selector(selector, "source.listPage.pagination.selector")?;
            }
        }

        if let PaginationConfig::QueryParam { max_pages: Some(0), .. }
        | PaginationConfig::NextLink { max_pages: Some(0), .. } = &self.pagination
        {
            return Err(AppError::InvalidInput(
                "source.listPage.pagination.maxPages must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Absolute URL of list page `page` (1-based), if the pagination scheme can
    /// compute it up front. `nextLink` pages are only known from the document.
    pub fn page_url(&self, base_url: &str, page: u32) -> Result<Option<String>, AppError> {
        if page == 0 {
            return Ok(None);
        }

        let base = parse_http_url(base_url, "baseUrl")?;
        let mut url = base.join(&self.url).map_err(|e| {
            AppError::InvalidInput(format!("list page url '{}' is invalid: {}", self.url, e))
        })?;

        match &self.pagination {
            PaginationConfig::None | PaginationConfig::NextLink { .. } => {
                Ok((page == 1).then(|| url.to_string()))
            }
            PaginationConfig::QueryParam { param, start, max_pages } => {
                if max_pages.is_some_and(|max| page > max) {
                    return Ok(None);
                }

                let retained: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != param)
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                let page_value = (start + page - 1).to_string();

                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(retained)
                    .append_pair(param, &page_value);

                Ok(Some(url.to_string()))
            }
        }
    }
}

fn parse_http_url(raw: &str, name: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::InvalidInput(format!("{} '{}' is invalid: {}", name, raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::InvalidInput(format!(
            "{} must use http or https, got '{}'",
            name, scheme
        ))),
    }
}

fn parse_selector(raw: &str, name: &str) -> Result<Selector, AppError> {
    Selector::parse(raw)
        .map_err(|e| AppError::InvalidInput(format!("{} '{}' is invalid: {}", name, raw, e)))
}
