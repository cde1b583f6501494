//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlJob`: the immutable identity and limits of a job
//! - `CrawlState`: the durable progress record checkpointed after every page
//! - `Record`: one extracted item

mod crawl_state;
mod job;
mod record;

// Re-export main types
pub use crawl_state::{page_key, CrawlState};
pub use job::{job_id_for, CrawlJob, JOB_ID_LEN};
pub use record::Record;
