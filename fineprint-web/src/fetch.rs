use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use fineprint_config::FetchConfig;
use fineprint_http::{ClientOpts, HttpClient, HttpError};
use url::Url;

/// Raw page bytes plus the server's `Content-Type`, which carries the
/// charset the extractor decodes with.
#[derive(Debug, Clone, Default)]
pub struct FetchedDocument {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl FetchedDocument {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Retrieves a page for a URL.
///
/// `Ok(None)` means "no usable content" and ends the run with a fetch
/// failure; `Err` is reported as an unexpected fault.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Option<FetchedDocument>>;
}

/// Fetcher backed by [`fineprint_http::HttpClient`].
///
/// Non-success statuses, exceeded redirect limits, unsupported schemes and
/// bodies outside `[min_bytes, max_bytes]` all yield `Ok(None)`. Transport
/// faults that survive the client's retries are returned as errors.
pub struct HttpFetcher {
    client: HttpClient,
    min_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: HttpClient, min_bytes: usize) -> Self {
        Self { client, min_bytes }
    }

    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        let client = HttpClient::new(ClientOpts {
            user_agent: cfg.user_agent.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            max_redirects: cfg.max_redirects,
        })?
        .with_timeout(Duration::from_secs(cfg.timeout_secs))
        .with_retries(cfg.retries)
        .with_max_body_bytes(cfg.max_bytes);
        Ok(Self::new(client, cfg.min_bytes))
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Option<FetchedDocument>> {
        if !matches!(url.scheme(), "http" | "https") {
            tracing::debug!(scheme = url.scheme(), "fetch.unsupported_scheme");
            return Ok(None);
        }

        let page = match self.client.get_bytes(url).await {
            Ok(page) => page,
            Err(
                err @ (HttpError::Status { .. }
                | HttpError::TooLarge { .. }
                | HttpError::Redirect(_)),
            ) => {
                tracing::info!(error = %err, "fetch.no_content");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if page.body.len() < self.min_bytes {
            tracing::info!(
                body_len = page.body.len(),
                min_bytes = self.min_bytes,
                "fetch.body_too_small"
            );
            return Ok(None);
        }

        Ok(Some(FetchedDocument {
            body: page.body,
            content_type: page.content_type,
        }))
    }
}
