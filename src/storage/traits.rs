//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::{CrawlState, Record};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to persist checkpoint: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Store lock poisoned: {0}")]
    Lock(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable mapping from job id to [`CrawlState`], plus the per-job record journal
///
/// Implementations must make `save` atomic with respect to readers: a
/// concurrent `load` sees either the previous or the new state, never a
/// mix of both.
pub trait CheckpointStore: Send + Sync {
    // ===== Job Management =====

    /// Creates and persists a clean state for `job_id`
    ///
    /// Any previous state and record journal for the id are discarded.
    fn create(&self, job_id: &str, base_url: &str) -> StorageResult<CrawlState>;

    /// Overwrites the persisted state, refreshing `last_updated`
    fn save(&self, state: &mut CrawlState) -> StorageResult<()>;

    /// Loads a state; missing and unreadable checkpoints both yield `None`
    fn load(&self, job_id: &str) -> StorageResult<Option<CrawlState>>;

    /// Lists every readable checkpoint, most recently updated first
    fn list(&self) -> StorageResult<Vec<CrawlState>>;

    /// Removes a job's state and journal; returns false if nothing existed
    fn delete(&self, job_id: &str) -> StorageResult<bool>;

    // ===== Record Journal =====

    /// Appends the records extracted from `url` to the job's journal
    fn append_records(&self, job_id: &str, url: &str, records: &[Record]) -> StorageResult<()>;

    /// Returns the journaled records of every page in `state.urls_scraped`,
    /// in page order
    fn load_records(&self, state: &CrawlState) -> StorageResult<Vec<Record>>;
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for Arc<S> {
    fn create(&self, job_id: &str, base_url: &str) -> StorageResult<CrawlState> {
        (**self).create(job_id, base_url)
    }

    fn save(&self, state: &mut CrawlState) -> StorageResult<()> {
        (**self).save(state)
    }

    fn load(&self, job_id: &str) -> StorageResult<Option<CrawlState>> {
        (**self).load(job_id)
    }

    fn list(&self) -> StorageResult<Vec<CrawlState>> {
        (**self).list()
    }

    fn delete(&self, job_id: &str) -> StorageResult<bool> {
        (**self).delete(job_id)
    }

    fn append_records(&self, job_id: &str, url: &str, records: &[Record]) -> StorageResult<()> {
        (**self).append_records(job_id, url, records)
    }

    fn load_records(&self, state: &CrawlState) -> StorageResult<Vec<Record>> {
        (**self).load_records(state)
    }
}
