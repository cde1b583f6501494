//! Sumi-Sift main entry point
//!
//! This is the command-line interface for the Sumi-Sift page harvester.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sumi_sift::config::{load_config_with_hash, sample_config, Config, OutputFormat};
use sumi_sift::crawler::run_crawl;
use sumi_sift::storage::{CheckpointStore, JsonFileStore};
use tracing_subscriber::EnvFilter;

/// Sumi-Sift: a resumable, selector-driven page harvester
///
/// Sumi-Sift walks a paginated listing, extracts one record per item with
/// CSS selectors, checkpoints after every page and exports the records
/// as CSV, JSON or SQLite once the walk ends.
#[derive(Parser, Debug)]
#[command(name = "sumi-sift")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, selector-driven page harvester", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run (or continue) the job described by a configuration file
    Run {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Continue this job id instead of the one derived from the config
        #[arg(long, value_name = "JOB")]
        resume: Option<String>,

        /// Override pagination.max-pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Override concurrency
        #[arg(long)]
        concurrency: Option<u32>,

        /// Override output.format (csv, json, sqlite)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Override output.path
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },

    /// Validate a configuration file without fetching anything
    Validate {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Write a sample configuration file
    Init {
        #[arg(value_name = "PATH", default_value = "sift.toml")]
        path: PathBuf,

        /// Base URL to put in the sample
        #[arg(long, default_value = "https://books.toscrape.com/")]
        url: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List checkpointed jobs
    Jobs {
        #[arg(long, value_name = "DIR", default_value = "./.sift_state")]
        checkpoint_dir: PathBuf,
    },

    /// Delete a job's checkpoint
    Delete {
        #[arg(value_name = "JOB")]
        job_id: String,

        #[arg(long, value_name = "DIR", default_value = "./.sift_state")]
        checkpoint_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Run {
            config,
            resume,
            max_pages,
            concurrency,
            format,
            output,
        } => {
            let overrides = Overrides {
                max_pages,
                concurrency,
                format,
                output,
            };
            handle_run(&config, resume.as_deref(), overrides).await
        }
        Command::Validate { config } => handle_validate(&config),
        Command::Init { path, url, force } => handle_init(&path, &url, force),
        Command::Jobs { checkpoint_dir } => handle_jobs(&checkpoint_dir),
        Command::Delete {
            job_id,
            checkpoint_dir,
        } => handle_delete(&job_id, &checkpoint_dir),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sift=info,warn"),
            1 => EnvFilter::new("sumi_sift=debug,info"),
            2 => EnvFilter::new("sumi_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Default)]
struct Overrides {
    max_pages: Option<u32>,
    concurrency: Option<u32>,
    format: Option<OutputFormat>,
    output: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        let scraper = &mut config.scraper;
        if let Some(max_pages) = self.max_pages {
            scraper.pagination.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            scraper.concurrency = concurrency;
        }
        if let Some(format) = self.format {
            scraper.output.format = format;
        }
        if let Some(output) = self.output {
            scraper.output.path = output;
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles the run subcommand
async fn handle_run(
    config_path: &Path,
    resume: Option<&str>,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let mut config = load(config_path)?;
    overrides.apply(&mut config);

    let outcome = run_crawl(config.scraper, resume)
        .await
        .context("Crawl failed")?;

    println!("Job:     {}", outcome.job_id);
    println!("Pages:   {}", outcome.pages_scraped);
    println!("Items:   {}", outcome.items_collected);
    println!("Stopped: {}", outcome.stop_reason);
    match outcome.export {
        Some(report) => println!(
            "Output:  {} ({} records)",
            report.destination.display(),
            report.records
        ),
        None => println!("Output:  nothing to export"),
    }

    Ok(())
}

/// Handles the validate subcommand
fn handle_validate(config_path: &Path) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let scraper = &config.scraper;
    let job_id = sumi_sift::state::job_id_for(&scraper.base_url, &scraper.selectors.item_container);

    println!("✓ Configuration is valid");
    println!("  Job id:      {}", job_id);
    println!("  Base URL:    {}", scraper.base_url);
    println!("  Fields:      {}", scraper.selectors.fields.len());
    println!("  Max pages:   {}", scraper.pagination.max_pages);
    println!("  Concurrency: {}", scraper.concurrency);
    println!(
        "  Output:      {}",
        sumi_sift::output::Exporter::from_config(&scraper.output)
            .destination()
            .display()
    );

    Ok(())
}

/// Handles the init subcommand
fn handle_init(path: &Path, url: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    std::fs::write(path, sample_config(url))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Wrote sample configuration to {}", path.display());

    Ok(())
}

/// Handles the jobs subcommand
fn handle_jobs(checkpoint_dir: &Path) -> anyhow::Result<()> {
    if !checkpoint_dir.exists() {
        println!("No jobs found in {}", checkpoint_dir.display());
        return Ok(());
    }

    let store = JsonFileStore::new(checkpoint_dir)?;
    let states = store.list()?;
    if states.is_empty() {
        println!("No jobs found in {}", checkpoint_dir.display());
        return Ok(());
    }

    println!(
        "{:<18} {:<10} {:>6} {:>8}  {:<26} URL",
        "JOB", "STATUS", "PAGES", "ITEMS", "UPDATED"
    );
    for state in states {
        let status = if state.completed { "completed" } else { "paused" };
        let url = state
            .current_url
            .as_deref()
            .unwrap_or(state.base_url.as_str());
        println!(
            "{:<18} {:<10} {:>6} {:>8}  {:<26} {}",
            state.job_id, status, state.pages_scraped, state.items_collected, state.last_updated, url
        );
    }

    Ok(())
}

/// Handles the delete subcommand
fn handle_delete(job_id: &str, checkpoint_dir: &Path) -> anyhow::Result<()> {
    let store = JsonFileStore::new(checkpoint_dir)?;
    if store.delete(job_id)? {
        println!("✓ Deleted job {}", job_id);
        Ok(())
    } else {
        bail!("Job not found: {}", job_id)
    }
}
