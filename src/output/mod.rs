//! Output module for exporting the records of a finished job
//!
//! This module handles:
//! - Choosing the export format from configuration
//! - Encoding records as CSV, JSON or SQLite rows
//! - Writing file exports atomically

mod csv;
mod json;
mod sqlite_output;
mod traits;

pub use traits::{ExportError, ExportReport, ExportResult, ExportSink};

use crate::config::{OutputConfig, OutputFormat};
use crate::state::Record;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Export sink selected by `output.format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exporter {
    Csv { path: PathBuf },
    Json { path: PathBuf },
    Sqlite { path: PathBuf, table: String },
}

impl Exporter {
    /// Builds the exporter for an output configuration
    ///
    /// The format's extension is appended to `output.path` unless the path
    /// already ends with it.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_sift::config::{OutputConfig, OutputFormat};
    /// use sumi_sift::output::Exporter;
    ///
    /// let output = OutputConfig {
    ///     format: OutputFormat::Json,
    ///     path: "./output/books".to_string(),
    ///     table_name: "scraped_data".to_string(),
    /// };
    /// let exporter = Exporter::from_config(&output);
    /// assert_eq!(exporter.destination().to_str(), Some("./output/books.json"));
    /// ```
    pub fn from_config(output: &OutputConfig) -> Self {
        let path = with_extension(&output.path, output.format);
        match output.format {
            OutputFormat::Csv => Self::Csv { path },
            OutputFormat::Json => Self::Json { path },
            OutputFormat::Sqlite => Self::Sqlite {
                path,
                table: output.table_name.clone(),
            },
        }
    }

    /// Path the export is written to
    pub fn destination(&self) -> &Path {
        match self {
            Self::Csv { path } | Self::Json { path } | Self::Sqlite { path, .. } => path,
        }
    }
}

impl ExportSink for Exporter {
    fn export(&self, records: &[Record]) -> ExportResult<ExportReport> {
        ensure_parent_dir(self.destination())?;

        let report = match self {
            Self::Csv { path } => {
                write_atomic(path, csv::encode(records).as_bytes())?;
                ExportReport {
                    destination: path.clone(),
                    records: records.len(),
                }
            }
            Self::Json { path } => {
                write_atomic(path, json::encode(records)?.as_bytes())?;
                ExportReport {
                    destination: path.clone(),
                    records: records.len(),
                }
            }
            Self::Sqlite { path, table } => sqlite_output::export(path, table, records)?,
        };

        tracing::info!(
            "Exported {} records to {}",
            report.records,
            report.destination.display()
        );
        Ok(report)
    }
}

fn with_extension(path: &str, format: OutputFormat) -> PathBuf {
    let extension = format.extension();
    if path.ends_with(extension) {
        PathBuf::from(path)
    } else {
        PathBuf::from(format!("{}{}", path, extension))
    }
}

fn ensure_parent_dir(path: &Path) -> ExportResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Writes `bytes` to a temp file next to `path`, then renames it into place
fn write_atomic(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
