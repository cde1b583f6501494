//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that drives one job from its start
//! URL to completion:
//! - Deciding between a fresh start, an implicit resume and an explicit resume
//! - Fetching each page under the concurrency budget and the retry policy
//! - Checkpointing after every page
//! - Finalizing the job and exporting its records exactly once

use crate::config::{validate, ScraperConfig};
use crate::crawler::observer::{CrawlObserver, LogObserver};
use crate::crawler::parser::{CssTransform, PageTransform};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::{build_backend, FetchBackend, FetchError};
use crate::output::{ExportReport, ExportSink, Exporter};
use crate::state::{CrawlJob, CrawlState, Record};
use crate::storage::{CheckpointStore, JsonFileStore, MemoryStore, StorageError};
use crate::SiftError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Why the page loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no next page
    Exhausted,
    /// `max_pages` pages have been scraped
    PageBudget,
    /// A page could not be fetched within its retry budget
    FetchFailed,
    /// Pagination led back to a page already scraped
    Cycle,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exhausted => "no more pages",
            Self::PageBudget => "page budget reached",
            Self::FetchFailed => "fetch failed",
            Self::Cycle => "pagination cycle",
        };
        f.write_str(s)
    }
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub job_id: String,
    pub pages_scraped: u32,
    pub items_collected: u64,
    /// Every record of the job, earlier runs included, in page order
    pub records: Vec<Record>,
    pub stop_reason: StopReason,
    /// `None` when there was nothing to export
    pub export: Option<ExportReport>,
    /// True if the run continued an existing checkpoint
    pub resumed: bool,
}

/// Main crawler structure
pub struct Crawler {
    config: ScraperConfig,
    job: CrawlJob,
    store: Arc<dyn CheckpointStore>,
    backend: Box<dyn FetchBackend>,
    transform: Box<dyn PageTransform>,
    sink: Box<dyn ExportSink>,
    observer: Arc<dyn CrawlObserver>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl Crawler {
    /// Creates a crawler from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - The scraper configuration, validated here
    /// * `store` - Where checkpoints and the record journal live
    /// * `backend` - Fetches page content
    /// * `transform` - Turns page content into records and the next URL
    /// * `sink` - Receives the final record set
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(SiftError)` - The configuration is invalid
    pub fn new(
        config: ScraperConfig,
        store: Arc<dyn CheckpointStore>,
        backend: Box<dyn FetchBackend>,
        transform: Box<dyn PageTransform>,
        sink: Box<dyn ExportSink>,
    ) -> Result<Self, SiftError> {
        validate(&config)?;

        let job = CrawlJob::from_config(&config);
        let retry = RetryPolicy::from_config(&config);
        let semaphore = Arc::new(Semaphore::new(job.concurrency_limit as usize));

        Ok(Self {
            config,
            job,
            store,
            backend,
            transform,
            sink,
            observer: Arc::new(LogObserver),
            semaphore,
            retry,
        })
    }

    /// Creates a crawler with the collaborators the configuration asks for
    ///
    /// Checkpoints go to `resume.checkpoint_dir`, or stay in memory when
    /// checkpointing is disabled.
    pub async fn from_config(config: ScraperConfig) -> Result<Self, SiftError> {
        validate(&config)?;

        let store: Arc<dyn CheckpointStore> = if config.resume.enabled {
            Arc::new(JsonFileStore::new(config.resume.checkpoint_dir.as_str())?)
        } else {
            Arc::new(MemoryStore::new())
        };
        let transform = Box::new(CssTransform::from_config(&config)?);
        let sink = Box::new(Exporter::from_config(&config.output));
        let backend = build_backend(&config).await?;

        tracing::debug!("Using {} backend", backend.name());

        Self::new(config, store, backend, transform, sink)
    }

    /// Replaces the default [`LogObserver`]
    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Runs the job to completion
    ///
    /// With `resume` set, continues that job and fails if it is unknown or
    /// already completed. Without it, an incomplete checkpoint for this
    /// configuration is continued and anything else starts fresh.
    ///
    /// The fetch backend is closed before returning, on success and on error.
    pub async fn run(self, resume: Option<&str>) -> Result<CrawlOutcome, SiftError> {
        let result = self.run_inner(resume).await;
        self.backend.close().await;
        result
    }

    async fn run_inner(&self, resume: Option<&str>) -> Result<CrawlOutcome, SiftError> {
        let (mut state, mut records, resumed) = self.start(resume)?;
        self.observer.job_started(&state, resumed);

        let stop_reason = loop {
            let url = match state.current_url.clone() {
                Some(url) => url,
                None => break StopReason::Exhausted,
            };

            if state.pages_scraped >= self.job.max_pages {
                break StopReason::PageBudget;
            }

            if state.has_visited(&url) {
                self.observer.page_skipped(&url);
                break StopReason::Cycle;
            }

            let content = match self.fetch(&url).await {
                Ok(content) => content,
                Err(e) => {
                    self.observer.page_failed(&url, &e.to_string());
                    break StopReason::FetchFailed;
                }
            };

            let page = self.transform.transform(&content, &url);
            let items = page.records.len();

            // Journal first: replay ignores pages the state does not list
            self.store
                .append_records(&state.job_id, &url, &page.records)?;
            state.record_page(&url, items, page.next_url);
            self.store.save(&mut state)?;

            self.observer.page_scraped(&url, items, &state);
            records.extend(page.records);
        };

        state.mark_completed();
        self.store.save(&mut state)?;
        self.observer.job_finished(&state, stop_reason);

        let export = if records.is_empty() {
            tracing::info!("No records collected, skipping export");
            None
        } else {
            Some(self.sink.export(&records)?)
        };

        Ok(CrawlOutcome {
            job_id: state.job_id,
            pages_scraped: state.pages_scraped,
            items_collected: state.items_collected,
            records,
            stop_reason,
            export,
            resumed,
        })
    }

    /// Picks the starting state and the records of earlier runs
    fn start(&self, resume: Option<&str>) -> Result<(CrawlState, Vec<Record>, bool), SiftError> {
        if let Some(job_id) = resume {
            // An id the store cannot hold names no job
            let state = match self.store.load(job_id) {
                Ok(state) => state,
                Err(StorageError::InvalidJobId(_)) => None,
                Err(e) => return Err(e.into()),
            }
            .ok_or_else(|| SiftError::JobNotFound(job_id.to_string()))?;

            if state.completed {
                return Err(SiftError::AlreadyCompleted(job_id.to_string()));
            }

            let records = self.restore_records(&state)?;
            return Ok((state, records, true));
        }

        match self.store.load(&self.job.job_id)? {
            Some(state) if !state.completed => {
                tracing::info!("Found incomplete checkpoint for job {}", state.job_id);
                let records = self.restore_records(&state)?;
                Ok((state, records, true))
            }
            _ => {
                let state = self.store.create(&self.job.job_id, &self.job.base_url)?;
                Ok((state, Vec::new(), false))
            }
        }
    }

    fn restore_records(&self, state: &CrawlState) -> Result<Vec<Record>, SiftError> {
        let records = self.store.load_records(state)?;
        if records.len() as u64 != state.items_collected {
            tracing::warn!(
                "Job {} reports {} items but only {} could be restored",
                state.job_id,
                state.items_collected,
                records.len()
            );
        }
        Ok(records)
    }

    /// Fetches one page, holding a concurrency slot across every attempt
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Client("fetch slots are closed".to_string()))?;

        let backend = &self.backend;
        self.retry.run(url, || backend.fetch(url)).await
    }
}
