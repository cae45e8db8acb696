//! Transform chain interpreter.
//!
//! Every transform is best-effort: when it cannot apply (bad pattern, no
//! match, unparsable number, unresolvable URL) the running value passes
//! through unchanged. Nothing in here returns an error.

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::domain::mapping::TransformConfig;

/// Currency codes and the markers that identify them, in priority order.
/// Markers are matched as exact, case-sensitive substrings.
const CURRENCY_MARKERS: [(&str, &[&str]); 3] = [
    ("EUR", &["EUR", "€"]),
    ("RON", &["RON", "lei"]),
    ("USD", &["USD", "$"]),
];

/// Apply `transforms` left to right, starting from `value`.
pub fn apply_transforms(value: &str, transforms: &[TransformConfig], base_url: &str) -> String {
    transforms
        .iter()
        .fold(value.to_string(), |current, transform| {
            apply_transform(current, transform, base_url)
        })
}

pub fn apply_transform(value: String, transform: &TransformConfig, base_url: &str) -> String {
    match transform {
        TransformConfig::Trim => value.trim().to_string(),
        TransformConfig::ExtractNumber => extract_number(&value).unwrap_or(value),
        TransformConfig::ExtractCurrency => detect_currency(&value)
            .map(str::to_string)
            .unwrap_or(value),
        TransformConfig::ResolveUrl => resolve_url(&value, base_url).unwrap_or(value),
        TransformConfig::Regex { pattern, group } => {
            capture_group(&value, pattern, *group).unwrap_or(value)
        }
        TransformConfig::Replace { find, replace } => match Regex::new(find) {
            Ok(re) => re.replace_all(&value, replace.as_str()).into_owned(),
            Err(e) => {
                debug!("Skipping replace transform, invalid pattern '{}': {}", find, e);
                value
            }
        },
        TransformConfig::Default { value: fallback } => {
            if value.is_empty() {
                fallback.clone()
            } else {
                value
            }
        }
    }
}

/// Parses a European-formatted number: `.` groups thousands, `,` is the
/// decimal mark. `1,234.56` therefore comes out as `1.23456`.
fn extract_number(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalized = cleaned.replace('.', "").replace(',', ".");

    parse_leading_float(&normalized).map(|number| number.to_string())
}

/// Longest `digits[.digits]` prefix, so `1.2.3` reads as `1.2`.
fn parse_leading_float(input: &str) -> Option<f64> {
    let mut seen_dot = false;
    let end = input
        .char_indices()
        .find(|&(_, c)| {
            if c != '.' {
                return false;
            }
            if seen_dot {
                return true;
            }
            seen_dot = true;
            false
        })
        .map(|(index, _)| index)
        .unwrap_or(input.len());

    let prefix = &input[..end];
    if !prefix.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<f64>().ok()
}

fn detect_currency(value: &str) -> Option<&'static str> {
    CURRENCY_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| value.contains(marker)))
        .map(|(code, _)| *code)
}

fn resolve_url(value: &str, base_url: &str) -> Option<String> {
    if value.is_empty() || value.starts_with("http") {
        return None;
    }

    let resolved = Url::parse(base_url).and_then(|base| base.join(value));
    match resolved {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Could not resolve '{}' against '{}': {}", value, base_url, e);
            None
        }
    }
}

fn capture_group(value: &str, pattern: &str, group: usize) -> Option<String> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!("Skipping regex transform, invalid pattern '{}': {}", pattern, e);
            return None;
        }
    };

    re.captures(value)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str().to_string())
}
