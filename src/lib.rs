//! Sumi-Sift: a resumable, selector-driven page harvester
//!
//! This crate walks a paginated site from a base URL, extracts structured
//! records from every page with CSS selectors, checkpoints its progress after
//! each page and exports the collected records once the walk ends.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

pub use crawler::FetchError;
pub use output::ExportError;
pub use storage::StorageError;

/// Main error type for Sumi-Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {0} is already completed")]
    AlreadyCompleted(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
}

/// Result type alias for Sumi-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, ScraperConfig};
pub use crawler::{CrawlOutcome, Crawler, StopReason};
pub use state::{CrawlJob, CrawlState, Record};
