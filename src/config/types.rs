use serde::{Deserialize, Serialize};

/// Top-level configuration file layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub scraper: ScraperConfig,
}

/// Everything needed to run one crawl job
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// First page of the crawl
    pub base_url: String,

    /// Capacity of the fetch semaphore (1..=20)
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Delay before every fetch attempt, retries included (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Total attempts per page, first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Which fetch backend renders the pages
    #[serde(default)]
    pub renderer: Renderer,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub session: SessionConfig,

    pub selectors: SelectorsConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub resume: ResumeConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Plain HTTP GET
    #[default]
    Static,
    /// Headless browser, for pages that build their content with JavaScript
    Dynamic,
}

/// Delay policy between failed attempts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    #[serde(default)]
    pub backoff: BackoffKind,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound for exponential backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffKind::default(),
            delay_ms: default_retry_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Constant,
    Exponential,
}

/// HTTP session behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Pick a random browser User-Agent for every request
    #[serde(default = "default_true")]
    pub rotate_user_agent: bool,

    /// Proxy URLs used round-robin
    #[serde(default)]
    pub proxies: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rotate_user_agent: true,
            proxies: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where records live on a page and how each field is read
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectorsConfig {
    /// Selector matching one element per record
    pub item_container: String,

    /// Fields, in output column order
    #[serde(default)]
    pub fields: Vec<FieldSelector>,
}

/// A single field of a record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldSelector {
    pub name: String,

    /// CSS selector, relative to the item container. Accepts the
    /// `sel::text` and `sel::attr(name)` shorthands.
    pub selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Html,
    Attribute,
}

impl FieldSelector {
    /// Resolves the shorthand forms into an explicit selector, kind and attribute
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_sift::config::{FieldKind, FieldSelector};
    ///
    /// let field = FieldSelector {
    ///     name: "title".to_string(),
    ///     selector: "h3 > a::attr(title)".to_string(),
    ///     attribute: None,
    ///     kind: FieldKind::Text,
    /// };
    /// let resolved = field.resolve();
    /// assert_eq!(resolved.selector, "h3 > a");
    /// assert_eq!(resolved.kind, FieldKind::Attribute);
    /// assert_eq!(resolved.attribute.as_deref(), Some("title"));
    /// ```
    pub fn resolve(&self) -> FieldSelector {
        if let Some((selector, rest)) = self.selector.split_once("::attr(") {
            let attribute = rest.trim_end_matches(')').trim().to_string();
            return FieldSelector {
                name: self.name.clone(),
                selector: selector.trim().to_string(),
                attribute: Some(attribute),
                kind: FieldKind::Attribute,
            };
        }

        if let Some(selector) = self.selector.strip_suffix("::text") {
            return FieldSelector {
                name: self.name.clone(),
                selector: selector.trim().to_string(),
                attribute: None,
                kind: FieldKind::Text,
            };
        }

        self.clone()
    }
}

/// How the next page is discovered
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    #[serde(default)]
    pub strategy: PaginationStrategy,

    /// Selector of the "next" link for the next-button strategy
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Query parameter carrying the page number for the page-number strategy
    #[serde(default)]
    pub page_param: Option<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            strategy: PaginationStrategy::default(),
            selector: None,
            max_pages: default_max_pages(),
            page_param: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationStrategy {
    #[default]
    NextButton,
    PageNumber,
    None,
}

/// Export destination
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Destination path without extension
    #[serde(default = "default_output_path")]
    pub path: String,

    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: default_output_path(),
            table_name: default_table_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Sqlite,
}

impl OutputFormat {
    /// File extension written by this format, dot included
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => ".csv",
            Self::Json => ".json",
            Self::Sqlite => ".db",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unsupported output format '{}'", other)),
        }
    }
}

/// Checkpointing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResumeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}

fn default_concurrency() -> u32 {
    5
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    10
}

fn default_output_path() -> String {
    "./output/data".to_string()
}

fn default_table_name() -> String {
    "scraped_data".to_string()
}

fn default_checkpoint_dir() -> String {
    "./.sift_state".to_string()
}

fn default_true() -> bool {
    true
}
