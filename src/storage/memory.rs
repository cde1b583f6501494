//! In-process checkpoint store
//!
//! Used when checkpointing is disabled and in tests. Nothing survives the
//! process, but the orchestrator runs the same code path either way.

use crate::state::{CrawlState, Record};
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{replay_journal, JournalEntry};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    states: HashMap<String, CrawlState>,
    journals: HashMap<String, Vec<JournalEntry>>,
}

/// Checkpoint store kept in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl CheckpointStore for MemoryStore {
    fn create(&self, job_id: &str, base_url: &str) -> StorageResult<CrawlState> {
        let state = CrawlState::new(job_id, base_url);
        let mut inner = self.lock()?;
        inner.journals.remove(job_id);
        inner.states.insert(job_id.to_string(), state.clone());
        Ok(state)
    }

    fn save(&self, state: &mut CrawlState) -> StorageResult<()> {
        state.touch();
        let mut inner = self.lock()?;
        inner.states.insert(state.job_id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, job_id: &str) -> StorageResult<Option<CrawlState>> {
        Ok(self.lock()?.states.get(job_id).cloned())
    }

    fn list(&self) -> StorageResult<Vec<CrawlState>> {
        let mut states: Vec<_> = self.lock()?.states.values().cloned().collect();
        states.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(states)
    }

    fn delete(&self, job_id: &str) -> StorageResult<bool> {
        let mut inner = self.lock()?;
        inner.journals.remove(job_id);
        Ok(inner.states.remove(job_id).is_some())
    }

    fn append_records(&self, job_id: &str, url: &str, records: &[Record]) -> StorageResult<()> {
        self.lock()?
            .journals
            .entry(job_id.to_string())
            .or_default()
            .push(JournalEntry {
                url: url.to_string(),
                records: records.to_vec(),
            });
        Ok(())
    }

    fn load_records(&self, state: &CrawlState) -> StorageResult<Vec<Record>> {
        let entries = self
            .lock()?
            .journals
            .get(&state.job_id)
            .cloned()
            .unwrap_or_default();
        Ok(replay_journal(entries, state))
    }
}
