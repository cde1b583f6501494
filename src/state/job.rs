use crate::config::ScraperConfig;
use sha2::{Digest, Sha256};

/// Length of a job identifier in hex characters (64 bits of the digest)
pub const JOB_ID_LEN: usize = 16;

/// Immutable parameters of one logical crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub job_id: String,
    pub base_url: String,
    pub max_pages: u32,
    pub concurrency_limit: u32,
}

impl CrawlJob {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            job_id: job_id_for(&config.base_url, &config.selectors.item_container),
            base_url: config.base_url.clone(),
            max_pages: config.pagination.max_pages,
            concurrency_limit: config.concurrency,
        }
    }
}

/// Derives the job identifier from the configuration that defines the job
///
/// The same base URL and item selector always map to the same checkpoint.
///
/// # Examples
///
/// ```
/// use sumi_sift::state::job_id_for;
///
/// let a = job_id_for("https://example.com/", "article.item");
/// let b = job_id_for("https://example.com/", "article.item");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 16);
/// ```
pub fn job_id_for(base_url: &str, item_container: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update(b":");
    hasher.update(item_container.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..JOB_ID_LEN].to_string()
}
