//! Article data model
//!
//! Shapes returned by the content server's catalog and metadata endpoints.
//! An article is identified by its `path`; a chunk has no identity of its own
//! beyond its position in the article.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque locator of a chunk's audio resource.
///
/// Usually a server-relative path (`audio/article-1/0003.mp3`), occasionally a
/// full URL. The engine never interprets it beyond handing it back to the
/// content source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AudioRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AudioRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One narrated passage: display text plus the locator of its audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(rename = "audio_path", alias = "audioRef", alias = "audio_ref")]
    pub audio_ref: AudioRef,
}

impl Chunk {
    pub fn new(text: impl Into<String>, audio_ref: impl Into<AudioRef>) -> Self {
        Self {
            text: text.into(),
            audio_ref: audio_ref.into(),
        }
    }
}

/// Catalog entry returned by `GET /get-articles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub path: String,
}

/// Body of `GET /get-articles`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleCatalog {
    #[serde(default)]
    pub articles: Vec<ArticleSummary>,
}

/// Full article as returned by `GET /get-article-metadata`.
///
/// Chunk order is playback order and is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Article {
    pub fn new(title: impl Into<String>, path: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            chunks,
        }
    }

    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            title: self.title.clone(),
            path: self.path.clone(),
        }
    }
}
