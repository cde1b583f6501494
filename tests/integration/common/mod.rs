//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sumi_sift::config::{parse_config, ScraperConfig};
use sumi_sift::crawler::{CssTransform, HttpBackend};
use sumi_sift::output::{ExportReport, ExportSink};
use sumi_sift::storage::{CheckpointStore, StorageError, StorageResult};
use sumi_sift::{CrawlState, Crawler, ExportError, Record};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scraper configuration for the fixture site, with every delay at zero
pub fn test_config(base_url: &str, max_pages: u32) -> ScraperConfig {
    let toml = format!(
        r#"
[scraper]
base-url = "{base_url}"
concurrency = 1
request-delay-ms = 0
max-retries = 3

[scraper.retry]
delay-ms = 0

[scraper.session]
rotate-user-agent = false
timeout-secs = 5

[scraper.selectors]
item-container = "article.item"

[[scraper.selectors.fields]]
name = "title"
selector = "h2::text"

[[scraper.selectors.fields]]
name = "link"
selector = "a.detail::attr(href)"

[scraper.pagination]
strategy = "next-button"
selector = "li.next > a"
max-pages = {max_pages}
"#
    );
    parse_config(&toml).expect("fixture config is valid").scraper
}

/// A listing page with one article per title and an optional next link
pub fn listing(titles: &[&str], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><section>");
    for title in titles {
        html.push_str(&format!(
            r#"<article class="item"><h2>{}</h2><a class="detail" href="/item/{}">more</a></article>"#,
            title,
            title.to_lowercase()
        ));
    }
    html.push_str("</section>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Mounts an HTML page at `route`, expecting exactly `hits` requests
pub async fn mount_page(server: &MockServer, route: &str, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(hits)
        .mount(server)
        .await;
}

/// Mounts the three-page chain used by several tests
///
/// Page 1 and 2 carry two items, page 3 carries one and has no next link.
pub async fn mount_three_pages(server: &MockServer, hits: [u64; 3]) {
    mount_page(
        server,
        "/catalogue/page-1.html",
        listing(&["Alpha", "Beta"], Some("page-2.html")),
        hits[0],
    )
    .await;
    mount_page(
        server,
        "/catalogue/page-2.html",
        listing(&["Gamma", "Delta"], Some("page-3.html")),
        hits[1],
    )
    .await;
    mount_page(
        server,
        "/catalogue/page-3.html",
        listing(&["Epsilon"], None),
        hits[2],
    )
    .await;
}

pub fn first_page(server: &MockServer) -> String {
    format!("{}/catalogue/page-1.html", server.uri())
}

/// Export sink that keeps every record set it receives
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub exports: Arc<Mutex<Vec<Vec<Record>>>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<Vec<Record>> {
        self.exports.lock().unwrap().clone()
    }
}

impl ExportSink for RecordingSink {
    fn export(&self, records: &[Record]) -> Result<ExportReport, ExportError> {
        self.exports.lock().unwrap().push(records.to_vec());
        Ok(ExportReport {
            destination: "memory".into(),
            records: records.len(),
        })
    }
}

/// Builds a crawler over plain HTTP with the CSS transform
pub fn crawler(
    config: ScraperConfig,
    store: Arc<dyn CheckpointStore>,
    sink: RecordingSink,
) -> Crawler {
    let backend = HttpBackend::new(&config.session).unwrap();
    let transform = CssTransform::from_config(&config).unwrap();
    Crawler::new(config, store, Box::new(backend), Box::new(transform), Box::new(sink)).unwrap()
}

/// Which store call simulates the crash
#[derive(Debug, Clone, Copy)]
pub enum FailPoint {
    /// The n-th `save` (1-based) fails
    Save(usize),
    /// The n-th `append_records` (1-based) fails
    Append(usize),
}

/// Store wrapper that fails one write, standing in for a crash or full disk
pub struct FailingStore {
    inner: Arc<dyn CheckpointStore>,
    fail_at: FailPoint,
    saves: AtomicUsize,
    appends: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn CheckpointStore>, fail_at: FailPoint) -> Self {
        Self {
            inner,
            fail_at,
            saves: AtomicUsize::new(0),
            appends: AtomicUsize::new(0),
        }
    }

    fn disk_full() -> StorageError {
        StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

impl CheckpointStore for FailingStore {
    fn create(&self, job_id: &str, base_url: &str) -> StorageResult<CrawlState> {
        self.inner.create(job_id, base_url)
    }

    fn save(&self, state: &mut CrawlState) -> StorageResult<()> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fail_at, FailPoint::Save(at) if at == n) {
            return Err(Self::disk_full());
        }
        self.inner.save(state)
    }

    fn load(&self, job_id: &str) -> StorageResult<Option<CrawlState>> {
        self.inner.load(job_id)
    }

    fn list(&self) -> StorageResult<Vec<CrawlState>> {
        self.inner.list()
    }

    fn delete(&self, job_id: &str) -> StorageResult<bool> {
        self.inner.delete(job_id)
    }

    fn append_records(&self, job_id: &str, url: &str, records: &[Record]) -> StorageResult<()> {
        let n = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fail_at, FailPoint::Append(at) if at == n) {
            return Err(Self::disk_full());
        }
        self.inner.append_records(job_id, url, records)
    }

    fn load_records(&self, state: &CrawlState) -> StorageResult<Vec<Record>> {
        self.inner.load_records(state)
    }
}

/// Titles of the records, in order
pub fn titles(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("title").flatten().unwrap_or_default().to_string())
        .collect()
}
