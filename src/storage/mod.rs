//! Storage module for persisting crawl checkpoints
//!
//! This module handles:
//! - Atomic persistence of [`CrawlState`] per job
//! - Listing and deleting checkpoints for operators
//! - The per-job record journal that lets a resumed job export the
//!   records of pages processed by earlier runs

mod json_file;
mod memory;
mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::state::{page_key, CrawlState, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of a record journal: the records extracted from a single page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub url: String,
    pub records: Vec<Record>,
}

/// Rebuilds the record set of a job from its journal
///
/// Only pages present in `state.urls_scraped` count, each at most once,
/// emitted in `urls_scraped` order. Entries written for a page whose state
/// save never completed are ignored, which is what keeps a crash between
/// the two writes from duplicating records. When such a page is fetched
/// again on resume, its later entry replaces the stale one.
pub(crate) fn replay_journal<I>(entries: I, state: &CrawlState) -> Vec<Record>
where
    I: IntoIterator<Item = JournalEntry>,
{
    let mut by_page: HashMap<String, Vec<Record>> = HashMap::new();
    for entry in entries {
        by_page.insert(page_key(&entry.url).to_string(), entry.records);
    }

    let mut records = Vec::new();
    for url in &state.urls_scraped {
        if let Some(page_records) = by_page.remove(page_key(url)) {
            records.extend(page_records);
        }
    }
    records
}

/// Rejects ids that would escape the checkpoint directory
pub(crate) fn check_job_id(job_id: &str) -> StorageResult<()> {
    let valid = !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidJobId(job_id.to_string()))
    }
}
