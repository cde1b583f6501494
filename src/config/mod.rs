//! Configuration module for Sumi-Sift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sift.toml")).unwrap();
//! println!("Crawling {}", config.scraper.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffKind, Config, FieldKind, FieldSelector, OutputConfig, OutputFormat, PaginationConfig,
    PaginationStrategy, Renderer, ResumeConfig, RetryConfig, ScraperConfig, SelectorsConfig,
    SessionConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config, sample_config};
pub use validation::{parse_selector, validate, MAX_CONCURRENCY, MIN_CONCURRENCY};
