use crate::config::types::{
    FieldKind, OutputConfig, OutputFormat, PaginationConfig, PaginationStrategy, Renderer,
    ScraperConfig, SelectorsConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Smallest accepted concurrency limit
pub const MIN_CONCURRENCY: u32 = 1;

/// Largest accepted concurrency limit
pub const MAX_CONCURRENCY: u32 = 20;

/// Validates the entire scraper configuration
pub fn validate(config: &ScraperConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;
    validate_limits(config)?;
    validate_renderer(config.renderer)?;
    validate_selectors(&config.selectors)?;
    validate_pagination(&config.pagination)?;
    validate_output(&config.output)?;
    validate_proxies(&config.session.proxies)?;
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            base_url
        )));
    }

    Ok(())
}

fn validate_limits(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.concurrency < MIN_CONCURRENCY || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between {} and {}, got {}",
            MIN_CONCURRENCY, MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.session.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "session timeout must be at least one second".to_string(),
        ));
    }

    Ok(())
}

fn validate_renderer(renderer: Renderer) -> Result<(), ConfigError> {
    if renderer == Renderer::Dynamic && !cfg!(feature = "browser") {
        return Err(ConfigError::Unsupported(
            "renderer \"dynamic\" requires building with the `browser` feature".to_string(),
        ));
    }
    Ok(())
}

/// Parses a CSS selector, mapping failures to a configuration error
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn validate_selectors(selectors: &SelectorsConfig) -> Result<(), ConfigError> {
    if selectors.item_container.trim().is_empty() {
        return Err(ConfigError::Validation(
            "item_container selector cannot be empty".to_string(),
        ));
    }
    parse_selector(&selectors.item_container)?;

    if selectors.fields.is_empty() {
        return Err(ConfigError::Validation(
            "at least one field selector is required".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for field in &selectors.fields {
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "field name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }

        let resolved = field.resolve();
        parse_selector(&resolved.selector)?;

        if resolved.kind == FieldKind::Attribute
            && resolved.attribute.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Validation(format!(
                "field '{}' extracts an attribute but names none",
                field.name
            )));
        }
    }

    Ok(())
}

fn validate_pagination(pagination: &PaginationConfig) -> Result<(), ConfigError> {
    if pagination.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            pagination.max_pages
        )));
    }

    match pagination.strategy {
        PaginationStrategy::NextButton => {
            let selector = pagination.selector.as_deref().unwrap_or("");
            if selector.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "next-button pagination requires a selector".to_string(),
                ));
            }
            parse_selector(selector)?;
        }
        PaginationStrategy::PageNumber => {
            if pagination.page_param.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "page-number pagination requires a page_param".to_string(),
                ));
            }
        }
        PaginationStrategy::None => {}
    }

    Ok(())
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if output.format == OutputFormat::Sqlite {
        validate_table_name(&output.table_name)?;
    }

    Ok(())
}

/// Table names are interpolated into SQL, so only identifiers pass
fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(ConfigError::Validation(format!(
            "table_name must be a plain identifier, got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_proxies(proxies: &[String]) -> Result<(), ConfigError> {
    for proxy in proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }
    Ok(())
}
