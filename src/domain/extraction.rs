use serde::{Deserialize, Serialize};

pub const NO_ELEMENTS_FOUND: &str = "No elements found";
pub const UNTITLED: &str = "Untitled";

/// Value produced for one field: a scalar, or one entry per matched element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ExtractedValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            ExtractedValue::Single(value) => Some(value),
            ExtractedValue::Multiple(_) => None,
        }
    }

    pub fn as_multiple(&self) -> Option<&[String]> {
        match self {
            ExtractedValue::Single(_) => None,
            ExtractedValue::Multiple(values) => Some(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExtraction {
    pub field: String,
    pub selector: String,
    /// `None` exactly when nothing matched or the extraction failed
    pub value: Option<ExtractedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldExtraction {
    pub fn extracted(field: &str, selector: &str, value: ExtractedValue) -> Self {
        Self {
            field: field.to_string(),
            selector: selector.to_string(),
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(field: &str, selector: &str, error: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            selector: selector.to_string(),
            value: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePreview {
    pub url: String,
    pub title: String,
    pub success: bool,
    pub extractions: Vec<FieldExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PagePreview {
    pub fn succeeded(url: &str, title: String, extractions: Vec<FieldExtraction>) -> Self {
        Self {
            url: url.to_string(),
            title,
            success: true,
            extractions,
            error: None,
        }
    }

    /// Page-level failure; carries no extractions.
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            success: false,
            extractions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorTestResult {
    pub found: bool,
    pub count: usize,
    pub samples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SelectorTestResult {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTestResult {
    pub tested: usize,
    pub results: Vec<PagePreview>,
}

/// Raw page handed back for client-side selector experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub url: String,
    pub html: String,
    pub status: u16,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredListings {
    pub url: String,
    pub listing_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_value_serializes_as_null() {
        let extraction = FieldExtraction::failed("price", ".price", NO_ELEMENTS_FOUND);
        assert_eq!(
            serde_json::to_value(&extraction).unwrap(),
            json!({ "field": "price", "selector": ".price", "value": null, "error": "No elements found" })
        );
    }

    #[test]
    fn multiple_value_serializes_as_array() {
        let extraction = FieldExtraction::extracted(
            "images",
            "img",
            ExtractedValue::Multiple(vec!["a.jpg".into(), "b.jpg".into()]),
        );
        let value = serde_json::to_value(&extraction).unwrap();
        assert_eq!(value["value"], json!(["a.jpg", "b.jpg"]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failed_preview_has_no_extractions() {
        let preview = PagePreview::failed("https://example.com", "timeout");
        assert!(!preview.success);
        assert!(preview.extractions.is_empty());
        assert_eq!(preview.title, "");
        assert_eq!(preview.error.as_deref(), Some("timeout"));
    }
}
