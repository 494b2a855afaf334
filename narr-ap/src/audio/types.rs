//! Core audio data types
//!
//! - `AudioHandle`: a resolved, locally held audio resource for one chunk
//! - `DecodedAudio`: PCM produced from a handle's bytes, ready for an output

use crate::content::AudioPayload;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cache key for a chunk's audio: chunks are addressed by position only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    /// Article identifier (its path)
    pub article: String,
    /// Position of the chunk within the article
    pub index: usize,
}

impl ChunkKey {
    pub fn new(article: impl Into<String>, index: usize) -> Self {
        Self {
            article: article.into(),
            index,
        }
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.article, self.index)
    }
}

#[derive(Debug)]
struct AudioResource {
    id: Uuid,
    key: ChunkKey,
    bytes: Bytes,
    content_type: Option<String>,
    released: AtomicBool,
}

/// Handle to audio bytes fetched for one chunk.
///
/// Clones share the same resource. The cache that created a handle releases
/// it when the owning article is replaced; a released handle must not be
/// played again.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    inner: Arc<AudioResource>,
}

impl AudioHandle {
    /// Wrap a fetched payload as a new handle with a fresh identity
    pub fn new(key: ChunkKey, payload: AudioPayload) -> Self {
        Self {
            inner: Arc::new(AudioResource {
                id: Uuid::new_v4(),
                key,
                bytes: payload.bytes,
                content_type: payload.content_type,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Unique identity of the underlying resource
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn key(&self) -> &ChunkKey {
        &self.inner.key
    }

    /// Audio bytes (reference-counted, cheap to clone)
    pub fn bytes(&self) -> Bytes {
        self.inner.bytes.clone()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.inner.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    /// True if both handles refer to the same resource
    pub fn same_resource(&self, other: &AudioHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Mark the resource as released. Bytes are freed once the last clone drops.
    pub(crate) fn release(&self) {
        self.inner.released.store(true, Ordering::Release);
    }
}

/// PCM decoded from an audio handle.
///
/// **Format:** f32 samples in -1.0..=1.0, interleaved by channel.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playing time of the decoded audio
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}
