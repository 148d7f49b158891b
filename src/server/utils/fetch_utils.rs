use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::server::error::{AppResult, Error};

/// connect, read and total request ceiling, the provider either answers fast or not at all
const UPSTREAM_TIMEOUT_SECS: u64 = 30;

pub type DynRemoteFetcher = Arc<dyn RemoteFetcher + Send + Sync>;

/// raw upstream payload handed back to the player untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// everything that talks to the provider goes through here so tests can swap it out
///
/// failures are logged and flattened into `None`, callers decide how to degrade
#[automock]
#[async_trait]
pub trait RemoteFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value>;
    async fn fetch_content(&self, url: &str) -> Option<FetchedContent>;
}

/// query string safe version of arbitrary text (credentials mostly)
pub fn url_encode(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build tuned http client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self { http }
    }

    async fn get(&self, url: &str) -> AppResult<reqwest::Response> {
        let url = url::Url::parse(url).map_err(|e| {
            error!("refusing to fetch malformed url {}: {}", url, e);
            Error::BadRequest(format!("malformed upstream url: {}", e))
        })?;

        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            error!("request to {} failed: {}", url, e);
            Error::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            // the body is usually an html error page, not worth logging
            error!("upstream {} answered {}", url, status);
            return Err(Error::Transport(format!("upstream returned {}", status)));
        }

        Ok(response)
    }

    async fn try_fetch_json(&self, url: &str) -> AppResult<Value> {
        let response = self.get(url).await?;

        let text = response.text().await.map_err(|e| {
            error!("failed to read body from {}: {}", url, e);
            Error::Transport(e.to_string())
        })?;

        serde_json::from_str(&text).map_err(|e| {
            error!("failed to parse json from {}: {}", url, e);
            Error::Parse(e.to_string())
        })
    }

    async fn try_fetch_content(&self, url: &str) -> AppResult<FetchedContent> {
        let response = self.get(url).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response.bytes().await.map_err(|e| {
            error!("failed to read body from {}: {}", url, e);
            Error::Transport(e.to_string())
        })?;

        Ok(FetchedContent {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        let value = self.try_fetch_json(url).await.ok()?;
        debug!("fetched json from {}", url);
        Some(value)
    }

    async fn fetch_content(&self, url: &str) -> Option<FetchedContent> {
        let content = self.try_fetch_content(url).await.ok()?;
        debug!(
            "fetched {} bytes ({}) from {}",
            content.bytes.len(),
            content.content_type,
            url
        );
        Some(content)
    }
}
