//! Audio resource cache
//!
//! Memoizes the handle created for each `(article, chunk index)` so that
//! revisiting a chunk reuses the same resource instead of fetching again.
//! Failed resolutions are never cached; the next visit retries.

use crate::audio::types::{AudioHandle, ChunkKey};
use crate::content::ContentSource;
use crate::error::Result;
use narr_common::model::AudioRef;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Cache of resolved chunk audio, keyed by position
#[derive(Debug, Default)]
pub struct AudioResourceCache {
    entries: Mutex<HashMap<ChunkKey, AudioHandle>>,
}

impl AudioResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `key`, fetching `audio_ref` on first use.
    ///
    /// The lock is not held while fetching. If two resolutions of the same key
    /// race, the first inserted handle wins and both callers receive it.
    pub async fn resolve(
        &self,
        source: &dyn ContentSource,
        key: ChunkKey,
        audio_ref: &AudioRef,
    ) -> Result<AudioHandle> {
        if let Some(handle) = self.entries.lock().await.get(&key) {
            debug!(chunk = %key, "Audio cache hit");
            return Ok(handle.clone());
        }

        debug!(chunk = %key, audio = %audio_ref, "Audio cache miss, fetching");
        let payload = source.fetch_audio(audio_ref).await?;
        let created = AudioHandle::new(key.clone(), payload);

        let mut entries = self.entries.lock().await;
        let handle = entries.entry(key).or_insert(created).clone();
        Ok(handle)
    }

    /// Release and forget every handle belonging to `article`
    pub async fn invalidate_article(&self, article: &str) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, handle| {
            if key.article == article {
                handle.release();
                false
            } else {
                true
            }
        });
        let released = before - entries.len();
        if released > 0 {
            info!(article = %article, released, "Released cached audio");
        }
        released
    }

    /// Release every cached handle
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        for handle in entries.values() {
            handle.release();
        }
        let released = entries.len();
        entries.clear();
        debug!(released, "Audio cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn contains(&self, key: &ChunkKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AudioPayload;
    use crate::error::Error;
    use async_trait::async_trait;
    use bytes::Bytes;
    use narr_common::model::{Article, ArticleSummary};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
            Ok(Vec::new())
        }

        async fn fetch_article(&self, path: &str) -> Result<Article> {
            Err(Error::Fetch(format!("no article {}", path)))
        }

        async fn fetch_audio(&self, audio_ref: &AudioRef) -> Result<AudioPayload> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Fetch(format!("{} unavailable", audio_ref)));
            }
            Ok(AudioPayload {
                bytes: Bytes::from(audio_ref.as_str().to_string()),
                content_type: Some("audio/mpeg".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_revisit_returns_same_resource() {
        let cache = AudioResourceCache::new();
        let source = CountingSource::default();
        let audio = AudioRef::new("a0.mp3");

        let first = cache.resolve(&source, ChunkKey::new("a", 0), &audio).await.unwrap();
        let second = cache.resolve(&source, ChunkKey::new("a", 0), &audio).await.unwrap();

        assert!(first.same_resource(&second));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_audio_at_different_positions_is_distinct() {
        let cache = AudioResourceCache::new();
        let source = CountingSource::default();
        let audio = AudioRef::new("same.mp3");

        let first = cache.resolve(&source, ChunkKey::new("a", 0), &audio).await.unwrap();
        let second = cache.resolve(&source, ChunkKey::new("a", 1), &audio).await.unwrap();

        assert!(!first.same_resource(&second));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = AudioResourceCache::new();
        let source = CountingSource {
            fail: true,
            ..Default::default()
        };
        let audio = AudioRef::new("missing.mp3");

        assert!(cache.resolve(&source, ChunkKey::new("a", 0), &audio).await.is_err());
        assert!(cache.resolve(&source, ChunkKey::new("a", 0), &audio).await.is_err());

        assert!(cache.is_empty().await);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_releases_only_that_article() {
        let cache = AudioResourceCache::new();
        let source = CountingSource::default();

        let a0 = cache
            .resolve(&source, ChunkKey::new("a", 0), &AudioRef::new("a0.mp3"))
            .await
            .unwrap();
        let b0 = cache
            .resolve(&source, ChunkKey::new("b", 0), &AudioRef::new("b0.mp3"))
            .await
            .unwrap();

        assert_eq!(cache.invalidate_article("a").await, 1);

        assert!(a0.is_released());
        assert!(!b0.is_released());
        assert!(!cache.contains(&ChunkKey::new("a", 0)).await);
        assert!(cache.contains(&ChunkKey::new("b", 0)).await);
    }

    #[tokio::test]
    async fn test_clear_releases_everything() {
        let cache = AudioResourceCache::new();
        let source = CountingSource::default();
        let a0 = cache
            .resolve(&source, ChunkKey::new("a", 0), &AudioRef::new("a0.mp3"))
            .await
            .unwrap();

        cache.clear().await;

        assert!(a0.is_released());
        assert!(cache.is_empty().await);
    }
}
