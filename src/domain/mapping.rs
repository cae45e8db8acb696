use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::utils::error::AppError;

/// One step of a field's transform chain.
///
/// Serialized as `{"type": "<kind>", "options": {...}}`. Kinds without
/// options may omit the `options` object entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransform", into = "RawTransform")]
pub enum TransformConfig {
    Trim,
    ExtractNumber,
    ExtractCurrency,
    ResolveUrl,
    Regex { pattern: String, group: usize },
    Replace { find: String, replace: String },
    Default { value: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum TransformKind {
    Trim,
    ExtractNumber,
    ExtractCurrency,
    ResolveUrl,
    Regex,
    Replace,
    Default,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct TransformOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    find: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTransform {
    #[serde(rename = "type")]
    kind: TransformKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<TransformOptions>,
}

impl TryFrom<RawTransform> for TransformConfig {
    type Error = String;

    fn try_from(raw: RawTransform) -> Result<Self, Self::Error> {
        let options = raw.options.unwrap_or_default();
        let transform = match raw.kind {
            TransformKind::Trim => TransformConfig::Trim,
            TransformKind::ExtractNumber => TransformConfig::ExtractNumber,
            TransformKind::ExtractCurrency => TransformConfig::ExtractCurrency,
            TransformKind::ResolveUrl => TransformConfig::ResolveUrl,
            TransformKind::Regex => TransformConfig::Regex {
                pattern: options
                    .pattern
                    .ok_or("regex transform requires options.pattern")?,
                group: options.group.unwrap_or(0),
            },
            TransformKind::Replace => TransformConfig::Replace {
                find: options.find.ok_or("replace transform requires options.find")?,
                replace: options.replace.unwrap_or_default(),
            },
            TransformKind::Default => TransformConfig::Default {
                value: options.value.ok_or("default transform requires options.value")?,
            },
        };
        Ok(transform)
    }
}

impl From<TransformConfig> for RawTransform {
    fn from(transform: TransformConfig) -> Self {
        let (kind, options) = match transform {
            TransformConfig::Trim => (TransformKind::Trim, None),
            TransformConfig::ExtractNumber => (TransformKind::ExtractNumber, None),
            TransformConfig::ExtractCurrency => (TransformKind::ExtractCurrency, None),
            TransformConfig::ResolveUrl => (TransformKind::ResolveUrl, None),
            TransformConfig::Regex { pattern, group } => (
                TransformKind::Regex,
                Some(TransformOptions {
                    pattern: Some(pattern),
                    group: Some(group),
                    ..Default::default()
                }),
            ),
            TransformConfig::Replace { find, replace } => (
                TransformKind::Replace,
                Some(TransformOptions {
                    find: Some(find),
                    replace: Some(replace),
                    ..Default::default()
                }),
            ),
            TransformConfig::Default { value } => (
                TransformKind::Default,
                Some(TransformOptions {
                    value: Some(value),
                    ..Default::default()
                }),
            ),
        };
        RawTransform { kind, options }
    }
}

/// Declares how one destination field of a listing is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Dotted destination path, e.g. `location.city`
    pub field: String,
    /// CSS selector evaluated against the page
    pub selector: String,
    /// `text` (default), `html`, or the name of an element attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

/// Where the raw value of a matched element comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource<'a> {
    Text,
    InnerHtml,
    Attribute(&'a str),
}

impl FieldMapping {
    pub fn new(field: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            selector: selector.into(),
            attribute: None,
            multiple: false,
            transforms: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<TransformConfig>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn value_source(&self) -> ValueSource<'_> {
        match self.attribute.as_deref() {
            None | Some("") | Some("text") => ValueSource::Text,
            Some("html") => ValueSource::InnerHtml,
            Some(name) => ValueSource::Attribute(name),
        }
    }
}

/// Checks a mapping set before any page is fetched.
pub fn validate_mappings(mappings: &[FieldMapping]) -> Result<(), AppError> {
    let mut seen = HashSet::new();

    for (index, mapping) in mappings.iter().enumerate() {
        if mapping.field.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "fieldMappings[{}]: field must not be empty",
                index
            )));
        }
        if mapping.selector.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "fieldMappings[{}] ({}): selector must not be empty",
                index, mapping.field
            )));
        }
        if !seen.insert(mapping.field.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "fieldMappings[{}]: duplicate field '{}'",
                index, mapping.field
            )));
        }
        Selector::parse(&mapping.selector).map_err(|e| {
            AppError::InvalidInput(format!(
                "fieldMappings[{}] ({}): invalid selector '{}': {}",
                index, mapping.field, mapping.selector, e
            ))
        })?;
    }

    Ok(())
}
