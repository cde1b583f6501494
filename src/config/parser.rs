use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_sift::config::load_config;
///
/// let config = load_config(Path::new("sift.toml")).unwrap();
/// println!("Max pages: {}", config.scraper.pagination.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config.scraper)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Sample configuration written by `sumi-sift init`
pub fn sample_config(base_url: &str) -> String {
    format!(
        r#"# Sumi-Sift configuration
# Generated for: {base_url}

[scraper]
base-url = "{base_url}"
concurrency = 5
request-delay-ms = 1000
max-retries = 3
renderer = "static"  # "dynamic" needs the `browser` feature

[scraper.retry]
backoff = "constant"  # or "exponential"
delay-ms = 1000

[scraper.session]
rotate-user-agent = true
proxies = []

[scraper.selectors]
item-container = "article.product_pod"

[[scraper.selectors.fields]]
name = "title"
selector = "h3 > a"
attribute = "title"
type = "attribute"

[[scraper.selectors.fields]]
name = "price"
selector = ".price_color"

[scraper.pagination]
strategy = "next-button"  # "next-button", "page-number" or "none"
selector = "li.next > a"
max-pages = 5

[scraper.output]
format = "csv"  # "csv", "json" or "sqlite"
path = "./output/scraped_data"

[scraper.resume]
enabled = true
checkpoint-dir = "./.sift_state"
"#
    )
}
