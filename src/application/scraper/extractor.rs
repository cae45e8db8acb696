use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::application::scraper::transforms::apply_transforms;
use crate::domain::extraction::{
    DiscoveredListings, ExtractedValue, FieldExtraction, PagePreview, SelectorTestResult,
    NO_ELEMENTS_FOUND, UNTITLED,
};
use crate::domain::integration::{ListPageConfig, PaginationConfig};
use crate::domain::mapping::{FieldMapping, ValueSource};
use crate::utils::error::AppError;

/// Maximum number of sample texts returned by a selector test
pub const MAX_SAMPLES: usize = 5;
/// Maximum length, in characters, of one sample text
pub const MAX_SAMPLE_CHARS: usize = 200;

/// Runs one mapping against a parsed document. Failures are reported in the
/// returned extraction, never to the caller.
pub fn extract_field(document: &Html, mapping: &FieldMapping, base_url: &str) -> FieldExtraction {
    let selector = match Selector::parse(&mapping.selector) {
        Ok(selector) => selector,
        Err(e) => {
            debug!("Invalid selector for field {}: {}", mapping.field, e);
            return FieldExtraction::failed(
                &mapping.field,
                &mapping.selector,
                format!("Invalid selector: {}", e),
            );
        }
    };

    let source = mapping.value_source();
    let mut elements = document.select(&selector).peekable();
    if elements.peek().is_none() {
        return FieldExtraction::failed(&mapping.field, &mapping.selector, NO_ELEMENTS_FOUND);
    }

    let value = if mapping.multiple {
        ExtractedValue::Multiple(
            elements
                .map(|element| transformed_value(element, source, mapping, base_url))
                .filter(|value| !value.is_empty())
                .collect(),
        )
    } else {
        let first = elements
            .next()
            .map(|element| transformed_value(element, source, mapping, base_url))
            .unwrap_or_default();
        ExtractedValue::Single(first)
    };

    FieldExtraction::extracted(&mapping.field, &mapping.selector, value)
}

fn transformed_value(
    element: ElementRef<'_>,
    source: ValueSource<'_>,
    mapping: &FieldMapping,
    base_url: &str,
) -> String {
    let raw = raw_value(element, source);
    if mapping.transforms.is_empty() {
        raw
    } else {
        apply_transforms(&raw, &mapping.transforms, base_url)
    }
}

fn raw_value(element: ElementRef<'_>, source: ValueSource<'_>) -> String {
    match source {
        ValueSource::Text => element_text(element),
        ValueSource::InnerHtml => element.inner_html(),
        ValueSource::Attribute(name) => element.value().attr(name).unwrap_or_default().to_string(),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Evaluates a raw selector against markup for interactive testing.
pub fn test_selector(markup: &str, selector: &str) -> SelectorTestResult {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(e) => return SelectorTestResult::invalid(format!("Invalid selector: {}", e)),
    };

    let document = Html::parse_document(markup);
    let matches: Vec<ElementRef<'_>> = document.select(&parsed).collect();

    let samples = matches
        .iter()
        .take(MAX_SAMPLES)
        .map(|element| element_text(*element))
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(MAX_SAMPLE_CHARS).collect::<String>())
        .collect();

    SelectorTestResult {
        found: !matches.is_empty(),
        count: matches.len(),
        samples,
        error: None,
    }
}

/// Text of the document's `<title>`, or `Untitled` when missing or blank.
pub fn extract_title(document: &Html) -> String {
    let selector = Selector::parse("title").ok();
    let title = selector
        .as_ref()
        .and_then(|selector| document.select(selector).next())
        .map(element_text)
        .unwrap_or_default();

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

/// Runs every mapping over already-fetched markup, in mapping order.
pub fn preview_markup(url: &str, markup: &str, field_mappings: &[FieldMapping]) -> PagePreview {
    let document = Html::parse_document(markup);
    let title = extract_title(&document);

    let extractions: Vec<FieldExtraction> = field_mappings
        .iter()
        .map(|mapping| extract_field(&document, mapping, url))
        .collect();

    debug!(
        url,
        extracted = extractions.iter().filter(|e| e.value.is_some()).count(),
        failed = extractions.iter().filter(|e| e.value.is_none()).count(),
        "Extraction finished"
    );

    PagePreview::succeeded(url, title, extractions)
}

/// Collects detail-page URLs from list page number `page` (1-based), plus the
/// next list page when the pagination follows a link and `maxPages` allows it.
pub fn discover_listing_urls(
    markup: &str,
    list_page: &ListPageConfig,
    base_url: &str,
    page: u32,
) -> Result<DiscoveredListings, AppError> {
    let base = Url::parse(base_url)
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL: {}, error: {}", base_url, e)))?;
    let item_selector = parse_selector(&list_page.item_selector)?;
    let link_selector = list_page
        .link_selector
        .as_deref()
        .map(parse_selector)
        .transpose()?;

    let document = Html::parse_document(markup);
    let mut seen = HashSet::new();
    let mut listing_urls = Vec::new();

    for item in document.select(&item_selector) {
        let href = match &link_selector {
            Some(selector) => item
                .select(selector)
                .next()
                .and_then(|link| link.value().attr("href")),
            None => item.value().attr("href"),
        };

        let Some(absolute) = href.and_then(|href| resolve_link(&base, href)) else {
            continue;
        };
        if seen.insert(absolute.clone()) {
            listing_urls.push(absolute);
        }
    }

    let next_page_url = match &list_page.pagination {
        PaginationConfig::NextLink { selector, max_pages } => {
            let selector = parse_selector(selector)?;
            if max_pages.is_some_and(|max| page >= max) {
                None
            } else {
                document
                    .select(&selector)
                    .next()
                    .and_then(|link| link.value().attr("href"))
                    .and_then(|href| resolve_link(&base, href))
            }
        }
        _ => None,
    };

    Ok(DiscoveredListings {
        url: base_url.to_string(),
        listing_urls,
        next_page_url,
    })
}

fn parse_selector(raw: &str) -> Result<Selector, AppError> {
    Selector::parse(raw).map_err(|e| AppError::InvalidInput(format!("Invalid selector: {}", e)))
}

fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::TransformConfig;

    const LISTING: &str = r#"
        <html>
        <head><title> Apartament 2 camere Floreasca </title></head>
        <body>
            <h1 class="title">Apartament 2 camere</h1>
            <div class="price">Preț: 125.000 €</div>
            <span class="city">Bucuresti</span>
            <ul class="features">
                <li>Centrala proprie</li>
                <li>   </li>
                <li>Parcare</li>
                <li>Balcon</li>
            </ul>
            <div class="gallery">
                <img src="/img/1.jpg">
                <img src="/img/2.jpg">
                <img data-src="/img/lazy.jpg">
            </div>
            <div class="description"><p>Luminos</p></div>
        </body>
        </html>
    "#;

    fn document() -> Html {
        Html::parse_document(LISTING)
    }

    #[test]
    fn single_value_uses_first_match_only() {
        let mapping = FieldMapping::new("features.first", ".features li");
        let extraction = extract_field(&document(), &mapping, "https://example.ro/anunt/1");

        assert_eq!(extraction.value, Some(ExtractedValue::Single("Centrala proprie".into())));
        assert!(extraction.error.is_none());
    }

    #[test]
    fn multiple_values_skip_empty_in_document_order() {
        let mapping = FieldMapping::new("features", ".features li").with_multiple(true);
        let extraction = extract_field(&document(), &mapping, "https://example.ro/anunt/1");

        assert_eq!(
            extraction.value,
            Some(ExtractedValue::Multiple(vec![
                "Centrala proprie".into(),
                "Parcare".into(),
                "Balcon".into(),
            ]))
        );
        let values = extraction.value.as_ref().and_then(ExtractedValue::as_multiple);
        assert_eq!(values.map(<[String]>::len), Some(3));
        assert_eq!(extraction.value.as_ref().and_then(ExtractedValue::as_single), None);
    }

    #[test]
    fn attribute_with_transforms() {
        let mapping = FieldMapping::new("images", ".gallery img")
            .with_attribute("src")
            .with_multiple(true)
            .with_transforms(vec![TransformConfig::ResolveUrl]);
        let extraction = extract_field(&document(), &mapping, "https://example.ro/anunt/1");

        // the lazy image has no src and is dropped
        assert_eq!(
            extraction.value,
            Some(ExtractedValue::Multiple(vec![
                "https://example.ro/img/1.jpg".into(),
                "https://example.ro/img/2.jpg".into(),
            ]))
        );
    }

    #[test]
    fn missing_attribute_on_single_gives_empty_value() {
        let mapping = FieldMapping::new("cover", ".gallery img").with_attribute("alt");
        let extraction = extract_field(&document(), &mapping, "https://example.ro");
        assert_eq!(extraction.value, Some(ExtractedValue::Single(String::new())));
    }

    #[test]
    fn price_chain() {
        let amount = FieldMapping::new("price.amount", ".price")
            .with_transforms(vec![TransformConfig::ExtractNumber]);
        let currency = FieldMapping::new("price.currency", ".price")
            .with_transforms(vec![TransformConfig::ExtractCurrency]);
        let doc = document();

        let amount = extract_field(&doc, &amount, "https://example.ro");
        let currency = extract_field(&doc, &currency, "https://example.ro");
        assert_eq!(amount.value.as_ref().and_then(ExtractedValue::as_single), Some("125000"));
        assert_eq!(currency.value.as_ref().and_then(ExtractedValue::as_single), Some("EUR"));
    }

    #[test]
    fn inner_html_attribute() {
        let mapping = FieldMapping::new("description", ".description").with_attribute("html");
        let extraction = extract_field(&document(), &mapping, "https://example.ro");
        assert_eq!(extraction.value, Some(ExtractedValue::Single("<p>Luminos</p>".into())));
    }

    #[test]
    fn zero_matches_reports_no_elements_found() {
        let mapping = FieldMapping::new("location.zone", ".zone").with_multiple(true);
        let extraction = extract_field(&document(), &mapping, "https://example.ro");

        assert_eq!(extraction.value, None);
        assert_eq!(extraction.error.as_deref(), Some(NO_ELEMENTS_FOUND));
        assert_eq!(extraction.selector, ".zone");
    }

    #[test]
    fn malformed_selector_is_a_field_error() {
        let mapping = FieldMapping::new("title", "h1[");
        let extraction = extract_field(&document(), &mapping, "https://example.ro");

        assert_eq!(extraction.value, None);
        assert!(extraction.error.unwrap().starts_with("Invalid selector"));
    }

    #[test]
    fn selector_test_caps_samples() {
        let items: String = (1..=7).map(|i| format!("<p class=\"row\">  row {}  </p>", i)).collect();
        let markup = format!("<html><body>{}</body></html>", items);

        let result = test_selector(&markup, "p.row");
        assert!(result.found);
        assert_eq!(result.count, 7);
        assert_eq!(result.samples, vec!["row 1", "row 2", "row 3", "row 4", "row 5"]);
        assert!(result.error.is_none());
    }

    #[test]
    fn selector_test_truncates_long_samples_and_skips_empty() {
        let long = "a".repeat(300);
        let markup = format!("<div class=\"x\"> </div><div class=\"x\">{}</div>", long);

        let result = test_selector(&markup, ".x");
        assert_eq!(result.count, 2);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.samples[0].chars().count(), MAX_SAMPLE_CHARS);
    }

    #[test]
    fn selector_test_without_matches() {
        let result = test_selector(LISTING, ".does-not-exist");
        assert_eq!(result, SelectorTestResult::default());
    }

    #[test]
    fn selector_test_reports_invalid_selector() {
        let result = test_selector(LISTING, "div[[");
        assert!(!result.found);
        assert_eq!(result.count, 0);
        assert!(result.samples.is_empty());
        assert!(result.error.unwrap().starts_with("Invalid selector: "));
    }

    #[test]
    fn title_falls_back_to_untitled() {
        assert_eq!(extract_title(&document()), "Apartament 2 camere Floreasca");
        assert_eq!(extract_title(&Html::parse_document("<p>no head</p>")), UNTITLED);
        assert_eq!(
            extract_title(&Html::parse_document("<title>   </title><p>x</p>")),
            UNTITLED
        );
    }

    #[test]
    fn preview_keeps_mapping_order_and_succeeds_with_field_errors() {
        let mappings = vec![
            FieldMapping::new("title", "h1.title"),
            FieldMapping::new("location.zone", ".zone"),
            FieldMapping::new("location.city", ".city"),
        ];
        let preview = preview_markup("https://example.ro/anunt/1", LISTING, &mappings);

        assert!(preview.success);
        assert_eq!(preview.title, "Apartament 2 camere Floreasca");
        let fields: Vec<&str> = preview.extractions.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "location.zone", "location.city"]);
        assert_eq!(preview.extractions[1].error.as_deref(), Some(NO_ELEMENTS_FOUND));
    }

    #[test]
    fn discovers_listing_links_and_next_page() {
        let markup = r##"
            <div class="card"><a class="link" href="/anunt/1#top">A</a></div>
            <div class="card"><a class="link" href="https://example.ro/anunt/2">B</a></div>
            <div class="card"><a class="link" href="/anunt/1">A again</a></div>
            <div class="card"><a class="link" href="javascript:void(0)">ad</a></div>
            <div class="card"><span>no link</span></div>
            <a class="next" href="?page=2">Next</a>
        "##;
        let list_page = ListPageConfig {
            url: "/vanzare".into(),
            item_selector: ".card".into(),
            link_selector: Some("a.link".into()),
            pagination: PaginationConfig::NextLink { selector: "a.next".into(), max_pages: None },
        };

        let discovered =
            discover_listing_urls(markup, &list_page, "https://example.ro/vanzare", 1).unwrap();
        assert_eq!(
            discovered.listing_urls,
            vec!["https://example.ro/anunt/1", "https://example.ro/anunt/2"]
        );
        assert_eq!(
            discovered.next_page_url.as_deref(),
            Some("https://example.ro/vanzare?page=2")
        );
    }

    #[test]
    fn next_link_stops_at_max_pages() {
        let markup = r#"<div class="card"><a href="/anunt/5">5</a></div><a class="next" href="?page=3">Next</a>"#;
        let list_page = ListPageConfig {
            url: "/vanzare".into(),
            item_selector: ".card".into(),
            link_selector: Some("a".into()),
            pagination: PaginationConfig::NextLink { selector: "a.next".into(), max_pages: Some(2) },
        };
        let base = "https://example.ro/vanzare?page=2";

        let first = discover_listing_urls(markup, &list_page, base, 1).unwrap();
        assert_eq!(first.next_page_url.as_deref(), Some("https://example.ro/vanzare?page=3"));

        let last = discover_listing_urls(markup, &list_page, base, 2).unwrap();
        assert_eq!(last.listing_urls, vec!["https://example.ro/anunt/5"]);
        assert!(last.next_page_url.is_none());
    }

    #[test]
    fn discovers_href_on_item_itself() {
        let markup = r#"<a class="card" href="/a/1">1</a><a class="card" href="/a/2">2</a>"#;
        let list_page = ListPageConfig {
            url: "/".into(),
            item_selector: "a.card".into(),
            link_selector: None,
            pagination: PaginationConfig::None,
        };

        let discovered = discover_listing_urls(markup, &list_page, "https://example.ro", 1).unwrap();
        assert_eq!(discovered.listing_urls.len(), 2);
        assert!(discovered.next_page_url.is_none());
    }

    #[test]
    fn discovery_rejects_bad_selector() {
        let list_page = ListPageConfig {
            url: "/".into(),
            item_selector: "[".into(),
            link_selector: None,
            pagination: PaginationConfig::None,
        };
        assert!(matches!(
            discover_listing_urls("<p></p>", &list_page, "https://example.ro", 1),
            Err(AppError::InvalidInput(_))
        ));
    }
}
