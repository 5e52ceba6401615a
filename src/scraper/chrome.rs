use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};
use url::Url;

use crate::app::{GuardError, Result};
use crate::scraper::config::ScraperConfig;
use crate::scraper::source::PageSource;

/// Snapshots buffered between the poller and the observer
const SNAPSHOT_BUFFER: usize = 4;

/// Headless Chrome page source using chromiumoxide.
///
/// Sees the DOM after scripts ran, and can watch a live page for changes.
pub struct ChromePageSource {
    browser: Arc<Browser>,
    config: ScraperConfig,
    semaphore: Arc<Semaphore>,
}

impl ChromePageSource {
    pub async fn new(config: ScraperConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer");

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| GuardError::Scraper(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            GuardError::Scraper(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        Ok(Self {
            browser: Arc::new(browser),
            config,
            semaphore,
        })
    }

    async fn open(&self, url: &Url) -> Result<Page> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| GuardError::Scraper(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| GuardError::Scraper(format!("Failed to set user agent: {}", e)))?;
        }

        tokio::time::timeout(self.config.timeout(), page.wait_for_navigation())
            .await
            .map_err(|_| GuardError::Scraper(format!("Timed out loading {}", url)))?
            .map_err(|e| GuardError::Scraper(format!("Navigation failed: {}", e)))?;

        // Additional wait for dynamic content
        tokio::time::sleep(self.config.wait_after_load()).await;

        Ok(page)
    }
}

#[async_trait]
impl PageSource for ChromePageSource {
    async fn load(&self, url: &Url) -> Result<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| GuardError::Scraper(format!("Semaphore error: {}", e)))?;

        let page = self.open(url).await?;
        let html = page
            .content()
            .await
            .map_err(|e| GuardError::Scraper(format!("Failed to read page content: {}", e)));

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        html
    }

    async fn observe(&self, url: &Url) -> Result<Option<mpsc::Receiver<String>>> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| GuardError::Scraper(format!("Semaphore error: {}", e)))?;

        let page = self.open(url).await?;
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let poll_interval = self.config.poll_interval();
        let url = url.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let mut last: Option<String> = None;

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }

                let html = match page.content().await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("Lost page {} while observing: {}", url, e);
                        break;
                    }
                };

                if last.as_deref() == Some(html.as_str()) {
                    continue;
                }
                if tx.send(html.clone()).await.is_err() {
                    break;
                }
                last = Some(html);
            }

            debug!("Stopped observing {}", url);
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }
        });

        Ok(Some(rx))
    }
}
