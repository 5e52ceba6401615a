use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use tokio::sync::mpsc;
use url::Url;

use crate::app::Result;
use crate::scraper::ScraperConfig;

/// Where page HTML comes from
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load the page and return its current HTML
    async fn load(&self, url: &Url) -> Result<String>;

    /// DOM snapshots of the live page, one per observed change.
    ///
    /// `None` when the source has no live page to watch. Dropping the
    /// receiver stops the observation.
    async fn observe(&self, url: &Url) -> Result<Option<mpsc::Receiver<String>>>;
}

/// Plain HTTP loader; sees the server-rendered document only
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-IN,en;q=0.9"));

        let mut builder = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .default_headers(headers);

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn load(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.as_str()).send().await?;
        response.error_for_status_ref()?;
        Ok(response.text().await?)
    }

    async fn observe(&self, _url: &Url) -> Result<Option<mpsc::Receiver<String>>> {
        Ok(None)
    }
}
