//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Fetch backends (plain HTTP, and a headless browser behind the
//!   `browser` feature)
//! - Retry with backoff and per-attempt rate limiting
//! - Record extraction and pagination
//! - Overall crawl coordination

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod fetcher;
mod observer;
mod parser;
mod retry;
mod session;

#[cfg(feature = "browser")]
pub use browser::BrowserBackend;
pub use coordinator::{CrawlOutcome, Crawler, StopReason};
pub use fetcher::{check_url, FetchBackend, FetchError, HttpBackend};
pub use observer::{CrawlObserver, LogObserver};
pub use parser::{CssTransform, PageResult, PageTransform};
pub use retry::{Backoff, RetryPolicy};
pub use session::{SessionManager, USER_AGENTS};

use crate::config::{Renderer, ScraperConfig};
use crate::SiftError;

/// Builds the fetch backend named by `renderer`
///
/// # Arguments
///
/// * `config` - The scraper configuration
///
/// # Returns
///
/// * `Ok(Box<dyn FetchBackend>)` - Ready to fetch
/// * `Err(SiftError)` - The backend is not compiled in or failed to start
pub async fn build_backend(config: &ScraperConfig) -> Result<Box<dyn FetchBackend>, SiftError> {
    match config.renderer {
        Renderer::Static => Ok(Box::new(HttpBackend::new(&config.session)?)),
        #[cfg(feature = "browser")]
        Renderer::Dynamic => Ok(Box::new(BrowserBackend::launch(config).await?)),
        #[cfg(not(feature = "browser"))]
        Renderer::Dynamic => Err(crate::ConfigError::Unsupported(
            "renderer \"dynamic\" requires building with the `browser` feature".to_string(),
        )
        .into()),
    }
}

/// Builds the configured crawler and runs it
///
/// # Arguments
///
/// * `config` - The scraper configuration
/// * `resume` - Job to continue, if any
pub async fn run_crawl(
    config: ScraperConfig,
    resume: Option<&str>,
) -> Result<CrawlOutcome, SiftError> {
    Crawler::from_config(config).await?.run(resume).await
}
