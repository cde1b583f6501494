//! Export sink traits and types
//!
//! This module defines the trait interface for export sinks and the
//! associated error and report types.

use crate::state::Record;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while exporting records
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Failed to persist export file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// What an export wrote and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub destination: PathBuf,
    pub records: usize,
}

/// Destination of the final record set of a job
///
/// The crawler calls `export` at most once per run, and only with a
/// non-empty record set.
pub trait ExportSink: Send + Sync {
    /// Writes `records` to the destination
    ///
    /// # Arguments
    ///
    /// * `records` - Every record of the job, in page order
    ///
    /// # Returns
    ///
    /// * `Ok(ExportReport)` - Where the records went
    /// * `Err(ExportError)` - The destination could not be written
    fn export(&self, records: &[Record]) -> ExportResult<ExportReport>;
}
