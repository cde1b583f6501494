//! Progress reporting handle passed into the crawler

use crate::crawler::StopReason;
use crate::state::CrawlState;

/// Receives progress events from a running crawl
///
/// Every method has an empty default, so implementors pick the events
/// they care about.
pub trait CrawlObserver: Send + Sync {
    fn job_started(&self, _state: &CrawlState, _resumed: bool) {}

    fn page_scraped(&self, _url: &str, _items: usize, _state: &CrawlState) {}

    /// A URL already in the page history came up again
    fn page_skipped(&self, _url: &str) {}

    /// A page could not be fetched; the crawl stops after it
    fn page_failed(&self, _url: &str, _error: &str) {}

    fn job_finished(&self, _state: &CrawlState, _reason: StopReason) {}
}

/// Observer that reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CrawlObserver for LogObserver {
    fn job_started(&self, state: &CrawlState, resumed: bool) {
        if resumed {
            tracing::info!(
                "Resuming job {} at {} ({} pages done)",
                state.job_id,
                state.current_url.as_deref().unwrap_or("-"),
                state.pages_scraped
            );
        } else {
            tracing::info!("Starting job {} at {}", state.job_id, state.base_url);
        }
    }

    fn page_scraped(&self, url: &str, items: usize, state: &CrawlState) {
        tracing::info!(
            "Page {} scraped: {} ({} items, {} total)",
            state.pages_scraped,
            url,
            items,
            state.items_collected
        );
    }

    fn page_skipped(&self, url: &str) {
        tracing::warn!("Pagination cycle detected, {} was already scraped", url);
    }

    fn page_failed(&self, url: &str, error: &str) {
        tracing::error!("Giving up on {}: {}", url, error);
    }

    fn job_finished(&self, state: &CrawlState, reason: StopReason) {
        tracing::info!(
            "Job {} finished ({}): {} pages, {} items",
            state.job_id,
            reason,
            state.pages_scraped,
            state.items_collected
        );
    }
}
