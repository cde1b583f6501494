//! Durable progress record of a crawl job
//!
//! The field names of [`CrawlState`] are the on-disk format of checkpoints
//! and must stay stable so that operators can inspect and repair them by hand.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Progress of one job, persisted after every page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    pub job_id: String,
    pub base_url: String,
    /// RFC 3339 timestamp of job creation
    pub started_at: String,
    /// RFC 3339 timestamp of the last mutation
    pub last_updated: String,
    pub pages_scraped: u32,
    pub items_collected: u64,
    /// Where to resume from; `None` once the job is complete
    pub current_url: Option<String>,
    pub completed: bool,
    /// Pages already processed, in completion order
    pub urls_scraped: Vec<String>,
}

impl CrawlState {
    /// Creates the initial state of a job, positioned at its base URL
    pub fn new(job_id: &str, base_url: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            job_id: job_id.to_string(),
            base_url: base_url.to_string(),
            started_at: now.clone(),
            last_updated: now,
            pages_scraped: 0,
            items_collected: 0,
            current_url: Some(base_url.to_string()),
            completed: false,
            urls_scraped: Vec::new(),
        }
    }

    /// Returns true if `url` has already been processed for this job
    pub fn has_visited(&self, url: &str) -> bool {
        let key = page_key(url);
        self.urls_scraped.iter().any(|seen| page_key(seen) == key)
    }

    /// Records a successfully processed page and moves the cursor to `next_url`
    ///
    /// Returns false, leaving the state untouched, when the page was already
    /// recorded.
    pub fn record_page(&mut self, url: &str, items: usize, next_url: Option<String>) -> bool {
        if self.has_visited(url) {
            return false;
        }

        self.pages_scraped += 1;
        self.items_collected += items as u64;
        self.urls_scraped.push(url.to_string());
        self.current_url = next_url;
        self.touch();
        true
    }

    /// Marks the job terminal and clears the cursor
    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.current_url = None;
        self.touch();
    }

    /// Refreshes `last_updated`
    pub fn touch(&mut self) {
        self.last_updated = Utc::now().to_rfc3339();
    }

    /// Returns the URL to continue from, if the job can still make progress
    pub fn resumable_url(&self) -> Option<&str> {
        if self.completed {
            return None;
        }
        self.current_url.as_deref()
    }

    /// Checks the counters against the page history
    pub fn is_consistent(&self) -> bool {
        self.pages_scraped as usize == self.urls_scraped.len()
            && (!self.completed || self.current_url.is_none())
    }
}

/// Comparison key for visited-page checks: the URL without its fragment
///
/// Fragments never reach the server, so `page#a` and `page#b` are the same
/// page. Query order and trailing slashes are left as they are.
pub fn page_key(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}
