//! HTTP content source
//!
//! Talks to the content server:
//! - `GET {base}/get-articles` → `{articles: [{title, path}]}`
//! - `GET {base}/get-article-metadata?path=...` → `{title, path, chunks: [{text, audio_path}]}`
//! - `GET {base}/{audio_path}` → audio bytes
//!
//! Audio is downloaded as bytes and wrapped locally, so the engine never needs
//! the audio to be addressable by anything other than this client.

use super::{AudioPayload, ContentSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use narr_common::model::{Article, ArticleCatalog, ArticleSummary, AudioRef};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("narr-ap/", env!("CARGO_PKG_VERSION"));

/// Content server client
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    http_client: reqwest::Client,
    base_url: Url,
    /// Applied to catalog and metadata requests only
    request_timeout: Duration,
}

impl HttpContentSource {
    /// Create a client for the content server at `base_url`
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        // Url::join replaces the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid content base URL '{}': {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a server-relative locator (absolute URLs pass through)
    fn url_for(&self, locator: &str) -> Result<Url> {
        self.base_url
            .join(locator.trim_start_matches('/'))
            .map_err(|e| Error::Fetch(format!("Invalid locator '{}': {}", locator, e)))
    }

    async fn get_json<T>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "{} returned {}: {}",
                what,
                status.as_u16(),
                body.trim()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Fetch(format!("Malformed {} response: {}", what, e)))
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
        let url = self.url_for("get-articles")?;
        debug!(url = %url, "Fetching article catalog");

        let catalog: ArticleCatalog = self
            .get_json(self.http_client.get(url), "article catalog")
            .await?;

        info!(count = catalog.articles.len(), "Fetched article catalog");
        Ok(catalog.articles)
    }

    async fn fetch_article(&self, path: &str) -> Result<Article> {
        let url = self.url_for("get-article-metadata")?;
        debug!(url = %url, path = %path, "Fetching article metadata");

        let article: Article = self
            .get_json(
                self.http_client.get(url).query(&[("path", path)]),
                "article metadata",
            )
            .await?;

        info!(
            path = %article.path,
            chunks = article.chunks.len(),
            "Fetched article metadata"
        );
        Ok(article)
    }

    async fn fetch_audio(&self, audio_ref: &AudioRef) -> Result<AudioPayload> {
        let url = self.url_for(audio_ref.as_str())?;
        debug!(url = %url, "Fetching chunk audio");

        // No timeout here: a slow download shows up as a long Loading state
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Audio request for {} failed: {}", audio_ref, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!(
                "Audio request for {} returned {}",
                audio_ref,
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !is_audio_content_type(ct) {
                warn!(url = %url, content_type = %ct, "Audio response has non-audio content type");
                return Err(Error::Fetch(format!(
                    "Audio request for {} returned non-audio content ({})",
                    audio_ref, ct
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("Audio download for {} failed: {}", audio_ref, e)))?;

        if bytes.is_empty() {
            return Err(Error::Fetch(format!("Audio for {} is empty", audio_ref)));
        }

        debug!(url = %url, bytes = bytes.len(), "Fetched chunk audio");
        Ok(AudioPayload {
            bytes,
            content_type,
        })
    }
}

/// Accept audio/* and generic binary; reject documents (HTML error pages, JSON errors)
fn is_audio_content_type(content_type: &str) -> bool {
    let base = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    base.starts_with("audio/") || base == "application/octet-stream" || base == "binary/octet-stream"
}
