//! Page transform: records and the next-page URL from raw HTML
//!
//! This module handles:
//! - Compiling the configured selectors once, at startup
//! - Extracting one [`Record`] per item container
//! - Discovering the next page according to the pagination strategy

use crate::config::{parse_selector, FieldKind, PaginationStrategy, ScraperConfig};
use crate::state::Record;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Output of transforming one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub records: Vec<Record>,
    pub next_url: Option<String>,
}

/// Pure mapping from page content to records and the next page
///
/// Implementations never fail: content that cannot be understood yields
/// an empty record set and no next page.
pub trait PageTransform: Send + Sync {
    fn transform(&self, content: &str, page_url: &str) -> PageResult;
}

/// A field with its selector compiled
#[derive(Debug)]
struct CompiledField {
    name: String,
    selector: Selector,
    kind: FieldKind,
    attribute: Option<String>,
}

#[derive(Debug)]
enum Pagination {
    NextButton(Selector),
    /// Increments the named query parameter
    ///
    /// Page numbers carry no end marker, so this is the one strategy where a
    /// page without records stops the chain. Empty pages under the other
    /// strategies keep following their links.
    PageNumber(String),
    None,
}

/// CSS-selector driven transform built from the scraper configuration
#[derive(Debug)]
pub struct CssTransform {
    container: Selector,
    fields: Vec<CompiledField>,
    pagination: Pagination,
}

impl CssTransform {
    /// Compiles every selector of the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The scraper configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CssTransform)` - All selectors compiled
    /// * `Err(ConfigError)` - A selector failed to parse or pagination is incomplete
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ConfigError> {
        let container = parse_selector(&config.selectors.item_container)?;

        let fields = config
            .selectors
            .fields
            .iter()
            .map(|field| {
                let resolved = field.resolve();
                Ok(CompiledField {
                    name: resolved.name,
                    selector: parse_selector(&resolved.selector)?,
                    kind: resolved.kind,
                    attribute: resolved.attribute,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let pagination = match config.pagination.strategy {
            PaginationStrategy::NextButton => {
                let selector = config.pagination.selector.as_deref().ok_or_else(|| {
                    ConfigError::Validation("next-button pagination requires a selector".to_string())
                })?;
                Pagination::NextButton(parse_selector(selector)?)
            }
            PaginationStrategy::PageNumber => {
                let param = config.pagination.page_param.clone().ok_or_else(|| {
                    ConfigError::Validation("page-number pagination requires a page_param".to_string())
                })?;
                Pagination::PageNumber(param)
            }
            PaginationStrategy::None => Pagination::None,
        };

        Ok(Self {
            container,
            fields,
            pagination,
        })
    }

    fn extract_record(&self, item: ElementRef<'_>) -> Record {
        let mut record = Record::new();
        for field in &self.fields {
            let value = item
                .select(&field.selector)
                .next()
                .and_then(|element| extract_value(element, field));
            record.insert(&field.name, value);
        }
        record
    }

    fn next_url(&self, document: &Html, page_url: &str, found_records: bool) -> Option<String> {
        match &self.pagination {
            Pagination::NextButton(selector) => document
                .select(selector)
                .find_map(|element| element.value().attr("href"))
                .and_then(|href| resolve_link(href, page_url)),
            Pagination::PageNumber(param) => {
                // An empty page means we ran past the last one
                if !found_records {
                    return None;
                }
                increment_page(page_url, param)
            }
            Pagination::None => None,
        }
    }
}

impl PageTransform for CssTransform {
    fn transform(&self, content: &str, page_url: &str) -> PageResult {
        let document = Html::parse_document(content);

        let records: Vec<Record> = document
            .select(&self.container)
            .map(|item| self.extract_record(item))
            .collect();

        let next_url = self.next_url(&document, page_url, !records.is_empty());

        tracing::trace!(
            "Transformed {}: {} records, next = {:?}",
            page_url,
            records.len(),
            next_url
        );

        PageResult { records, next_url }
    }
}

fn extract_value(element: ElementRef<'_>, field: &CompiledField) -> Option<String> {
    match field.kind {
        FieldKind::Text => Some(normalize_whitespace(element.text())),
        FieldKind::Html => Some(element.html()),
        FieldKind::Attribute => field
            .attribute
            .as_deref()
            .and_then(|name| element.value().attr(name))
            .map(|value| value.trim().to_string()),
    }
}

/// Joins text nodes and collapses runs of whitespace into single spaces
fn normalize_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves `href` against the page URL, keeping only http(s) targets
fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    let resolved = base.join(href).ok()?;

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Returns `page_url` with `param` incremented by one
///
/// A missing or non-numeric parameter counts as page 1. Other query
/// pairs keep their order.
fn increment_page(page_url: &str, param: &str) -> Option<String> {
    let mut url = Url::parse(page_url).ok()?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let current = pairs
        .iter()
        .find(|(k, _)| k == param)
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .unwrap_or(1);
    let next = (current + 1).to_string();

    match pairs.iter_mut().find(|(k, _)| k == param) {
        Some(pair) => pair.1 = next,
        None => pairs.push((param.to_string(), next)),
    }

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    Some(url.to_string())
}
