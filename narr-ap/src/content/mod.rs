//! Content collaborators
//!
//! The engine consumes three read-only operations from the content server:
//! the article catalog, an article's chunk metadata, and a chunk's audio bytes.
//! `ContentSource` is the seam; `HttpContentSource` is the production
//! implementation.

pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use narr_common::model::{Article, ArticleSummary, AudioRef};

pub use http::HttpContentSource;

/// Raw audio fetched for a chunk, before it is wrapped in a handle
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub bytes: Bytes,
    /// Content type reported by the server, if any
    pub content_type: Option<String>,
}

/// Read-only access to articles and their audio
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List the articles available for narration
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>>;

    /// Fetch an article with its ordered chunk list
    async fn fetch_article(&self, path: &str) -> Result<Article>;

    /// Fetch the audio bytes referenced by `audio_ref`
    async fn fetch_audio(&self, audio_ref: &AudioRef) -> Result<AudioPayload>;
}
