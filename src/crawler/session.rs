//! HTTP session management
//!
//! Builds one reqwest client per configured proxy (a proxy is fixed when a
//! client is built) and hands them out round-robin, together with
//! browser-like request headers.

use crate::config::SessionConfig;
use crate::crawler::FetchError;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Desktop browser User-Agent strings used for rotation
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Rotating pool of HTTP clients
pub struct SessionManager {
    clients: Mutex<Vec<Client>>,
    next: AtomicUsize,
    rotate_user_agent: bool,
}

impl SessionManager {
    /// Builds the client pool
    ///
    /// Without proxies the pool holds a single direct client.
    pub fn new(config: &SessionConfig) -> Result<Self, FetchError> {
        let clients = if config.proxies.is_empty() {
            vec![build_client(config, None)?]
        } else {
            config
                .proxies
                .iter()
                .map(|proxy| build_client(config, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::debug!("Session ready with {} client(s)", clients.len());

        Ok(Self {
            clients: Mutex::new(clients),
            next: AtomicUsize::new(0),
            rotate_user_agent: config.rotate_user_agent,
        })
    }

    /// Returns the next client in rotation
    pub fn next_client(&self) -> Result<Client, FetchError> {
        let clients = self
            .clients
            .lock()
            .map_err(|e| FetchError::Client(format!("session lock poisoned: {}", e)))?;

        if clients.is_empty() {
            return Err(FetchError::Client("session is closed".to_string()));
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % clients.len();
        Ok(clients[idx].clone())
    }

    /// Request headers, with a random User-Agent when rotation is on
    pub fn headers(&self) -> HeaderMap {
        let user_agent = if self.rotate_user_agent {
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
        } else {
            USER_AGENTS[0]
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        headers.insert(
            "upgrade-insecure-requests",
            HeaderValue::from_static("1"),
        );
        headers
    }

    /// Drops every client, releasing their connection pools
    pub fn close(&self) {
        if let Ok(mut clients) = self.clients.lock() {
            if !clients.is_empty() {
                tracing::debug!("Closing {} HTTP client(s)", clients.len());
            }
            clients.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.clients.lock().map(|c| c.is_empty()).unwrap_or(true)
    }
}

fn build_client(config: &SessionConfig, proxy: Option<&String>) -> Result<Client, FetchError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|e| FetchError::Client(format!("invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}
