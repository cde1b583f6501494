//! Headless browser backend for pages that render their content with JavaScript
//!
//! One Chromium instance is launched per job. Every fetch opens a fresh tab
//! and snapshots the rendered DOM once the load event fired. The tab is
//! closed afterwards, also when the render timed out.

use crate::config::ScraperConfig;
use crate::crawler::fetcher::{check_url, FetchBackend, FetchError};
use crate::crawler::session::USER_AGENTS;
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::seq::SliceRandom;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Rendered-page backend driving headless Chromium
pub struct BrowserBackend {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
    rotate_user_agent: bool,
}

impl BrowserBackend {
    /// Launches the browser and starts its event handler
    pub async fn launch(config: &ScraperConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.session.timeout_secs);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if let Some(proxy) = config.session.proxies.first() {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        let browser_config = builder.build().map_err(FetchError::Client)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Client(format!("failed to launch browser: {}", e)))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Launched headless browser");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handle)),
            timeout,
            rotate_user_agent: config.session.rotate_user_agent,
        })
    }

    async fn open_page(&self, url: &str) -> Result<Page, FetchError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| FetchError::Client("browser is closed".to_string()))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error(url, e))?;

        if self.rotate_user_agent {
            let user_agent = USER_AGENTS.choose(&mut rand::thread_rng()).copied();
            if let Some(user_agent) = user_agent {
                page.set_user_agent(user_agent)
                    .await
                    .map_err(|e| browser_error(url, e))?;
            }
        }

        Ok(page)
    }
}

async fn render(page: &Page, url: &str) -> Result<String, FetchError> {
    // goto resolves once the load event fired
    let content: Result<String, CdpError> = async {
        page.goto(url).await?;
        page.content().await
    }
    .await;
    content.map_err(|e| browser_error(url, e))
}

fn browser_error(url: &str, e: CdpError) -> FetchError {
    FetchError::Browser {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Runs `load` under `timeout`, then `cleanup` whether it finished or not
async fn with_deadline<T, L, C>(
    url: &str,
    timeout: Duration,
    load: L,
    cleanup: C,
) -> Result<T, FetchError>
where
    L: Future<Output = Result<T, FetchError>>,
    C: Future<Output = ()>,
{
    let result = tokio::time::timeout(timeout, load).await;
    cleanup.await;
    result.unwrap_or_else(|_| {
        Err(FetchError::Timeout {
            url: url.to_string(),
        })
    })
}

#[async_trait]
impl FetchBackend for BrowserBackend {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        check_url(url)?;

        let page = match tokio::time::timeout(self.timeout, self.open_page(url)).await {
            Ok(page) => page?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        };

        let close = async {
            if let Err(e) = page.clone().close().await {
                tracing::debug!("Failed to close tab for {}: {}", url, e);
            }
        };
        with_deadline(url, self.timeout, render(&page, url), close).await
    }

    async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!("Failed to wait for browser exit: {}", e);
            }
            tracing::debug!("Browser closed");
        }

        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
