//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests for the crawler, including:
//! - The [`FetchBackend`] contract shared by every backend
//! - Error classification into retryable and permanent failures
//! - The direct-HTTP backend built on the rotating session

use crate::config::SessionConfig;
use crate::crawler::session::SessionManager;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Browser error for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns true if trying the same request again may succeed
    ///
    /// | Condition | Retryable |
    /// |-----------|-----------|
    /// | Timeout | yes |
    /// | Connection reset / refused | yes |
    /// | HTTP 5xx, 408, 429 | yes |
    /// | Other HTTP 4xx | no |
    /// | Browser navigation failure | yes |
    /// | Malformed URL, client setup | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } | Self::Browser { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::InvalidUrl { .. } | Self::Client(_) => false,
        }
    }

    /// Classifies a reqwest error raised while fetching `url`
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if error.is_builder() {
            Self::InvalidUrl {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Connection {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Source of raw page content
///
/// Each call is one attempt; retrying is the caller's business.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Fetches `url` and returns its body
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Releases connections, browsers and other resources held by the backend
    async fn close(&self);

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Checks that `url` is an absolute http(s) URL before sending anything
pub fn check_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(parsed)
}

/// Direct HTTP backend
pub struct HttpBackend {
    session: SessionManager,
}

impl HttpBackend {
    /// Builds the backend and its HTTP clients
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sumi_sift::config::SessionConfig;
    /// use sumi_sift::crawler::HttpBackend;
    ///
    /// let backend = HttpBackend::new(&SessionConfig::default()).unwrap();
    /// ```
    pub fn new(config: &SessionConfig) -> Result<Self, FetchError> {
        Ok(Self {
            session: SessionManager::new(config)?,
        })
    }
}

#[async_trait]
impl FetchBackend for HttpBackend {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        check_url(url)?;

        let client = self.session.next_client()?;
        let response = client
            .get(url)
            .headers(self.session.headers())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if status != StatusCode::OK {
            tracing::debug!("Fetched {} with status {}", url, status);
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    async fn close(&self) {
        self.session.close();
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
