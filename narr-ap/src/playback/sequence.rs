//! Ordered chunk sequence for the selected article

use crate::error::{Error, Result};
use narr_common::model::{Article, Chunk};
use std::sync::Arc;

/// Immutable, ordered view of an article's chunks.
///
/// Chunks are addressed by position only; duplicate text or audio references
/// at different positions are distinct chunks.
#[derive(Debug, Clone)]
pub struct ChunkSequence {
    article: Arc<Article>,
}

impl ChunkSequence {
    pub fn new(article: Arc<Article>) -> Self {
        Self { article }
    }

    pub fn article(&self) -> &Arc<Article> {
        &self.article
    }

    /// Article identifier
    pub fn path(&self) -> &str {
        &self.article.path
    }

    pub fn len(&self) -> usize {
        self.article.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.article.chunks.is_empty()
    }

    /// Chunk at `index`, or `OutOfRange`
    pub fn chunk(&self, index: usize) -> Result<&Chunk> {
        self.article.chunks.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.len(),
        })
    }

    pub fn has_prev(&self, index: usize) -> bool {
        index > 0 && index < self.len()
    }

    pub fn has_next(&self, index: usize) -> bool {
        index + 1 < self.len()
    }

    /// Preceding position; None at the first chunk (no wrap)
    pub fn prev_index(&self, index: usize) -> Option<usize> {
        self.has_prev(index).then(|| index - 1)
    }

    /// Following position; None at the last chunk (no wrap)
    pub fn next_index(&self, index: usize) -> Option<usize> {
        self.has_next(index).then(|| index + 1)
    }
}
