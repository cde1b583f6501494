//! JSON file checkpoint store
//!
//! One pretty-printed `{job_id}.json` per job and one `{job_id}.records.jsonl`
//! record journal next to it. States are replaced by writing a temp file in
//! the same directory and renaming it over the old one.

use crate::state::{CrawlState, Record};
use crate::storage::traits::{CheckpointStore, StorageResult};
use crate::storage::{check_job_id, replay_journal, JournalEntry};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const STATE_EXTENSION: &str = "json";
const JOURNAL_SUFFIX: &str = ".records.jsonl";

/// Checkpoint store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `job_id`
    pub fn state_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", job_id, STATE_EXTENSION))
    }

    /// Path of the record journal for `job_id`
    pub fn journal_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", job_id, JOURNAL_SUFFIX))
    }

    fn read_state(path: &Path) -> Option<CrawlState> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read checkpoint {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CrawlState>(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Ignoring corrupt checkpoint {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_state(&self, state: &CrawlState) -> StorageResult<()> {
        let target = self.state_path(&state.job_id);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target)?;
        Ok(())
    }

    fn read_journal(&self, job_id: &str) -> StorageResult<Vec<JournalEntry>> {
        let path = self.journal_path(job_id);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // A crash mid-append leaves a torn last line
            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    "Skipping unreadable journal line {} in {}: {}",
                    lineno + 1,
                    path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }

    fn remove_if_exists(path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl CheckpointStore for JsonFileStore {
    fn create(&self, job_id: &str, base_url: &str) -> StorageResult<CrawlState> {
        check_job_id(job_id)?;
        Self::remove_if_exists(&self.journal_path(job_id))?;

        let state = CrawlState::new(job_id, base_url);
        self.write_state(&state)?;
        tracing::info!("Created job {}", job_id);
        Ok(state)
    }

    fn save(&self, state: &mut CrawlState) -> StorageResult<()> {
        check_job_id(&state.job_id)?;
        state.touch();
        self.write_state(state)
    }

    fn load(&self, job_id: &str) -> StorageResult<Option<CrawlState>> {
        check_job_id(job_id)?;
        let path = self.state_path(job_id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Self::read_state(&path))
    }

    fn list(&self) -> StorageResult<Vec<CrawlState>> {
        let mut states = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXTENSION) {
                continue;
            }
            if let Some(state) = Self::read_state(&path) {
                states.push(state);
            }
        }

        states.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(states)
    }

    fn delete(&self, job_id: &str) -> StorageResult<bool> {
        check_job_id(job_id)?;
        let removed = Self::remove_if_exists(&self.state_path(job_id))?;
        Self::remove_if_exists(&self.journal_path(job_id))?;
        if removed {
            tracing::info!("Deleted job {}", job_id);
        }
        Ok(removed)
    }

    fn append_records(&self, job_id: &str, url: &str, records: &[Record]) -> StorageResult<()> {
        check_job_id(job_id)?;
        let entry = JournalEntry {
            url: url.to_string(),
            records: records.to_vec(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.journal_path(job_id))?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    fn load_records(&self, state: &CrawlState) -> StorageResult<Vec<Record>> {
        check_job_id(&state.job_id)?;
        let entries = self.read_journal(&state.job_id)?;
        Ok(replay_journal(entries, state))
    }
}
