//! Event types for the narr event system
//!
//! Events are produced by the navigation controller (the only writer of
//! session state) and fanned out to UI consumers over SSE.

use serde::{Deserialize, Serialize};

/// Playback status as observed by UI consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing bound to the output
    #[default]
    Idle,
    /// Audio is being resolved or handed to the output
    Loading,
    /// Output is producing sound
    Playing,
    /// Current chunk played to completion
    Ended,
    /// Audio could not be fetched or played
    Failed,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What caused the current chunk to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOrigin {
    /// A new article was selected (index reset to 0)
    ArticleSelected,
    /// User clicked a chunk
    ChunkSelected,
    /// Previous / next transport buttons
    Step,
    /// Previous chunk finished playing naturally
    AutoAdvance,
}

/// Category of a user-visible, non-fatal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Audio (or metadata) retrieval failed
    Fetch,
    /// Output rejected or could not decode the audio
    Playback,
}

/// Last failure recorded in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFailureInfo {
    pub kind: FailureKind,
    pub chunk_index: usize,
    pub message: String,
}

/// Chunk as presented to list renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkView {
    pub index: usize,
    pub text: String,
    /// True for the chunk that is currently highlighted
    pub active: bool,
}

/// Selected article as presented to renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleView {
    pub title: String,
    pub path: String,
    pub chunks: Vec<ChunkView>,
}

/// Point-in-time copy of the session state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub article: Option<ArticleView>,
    /// None when no article is selected
    pub current_chunk_index: Option<usize>,
    pub playback_status: PlaybackStatus,
    pub last_error: Option<PlaybackFailureInfo>,
}

/// narr event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NarrEvent {
    /// A new article became the selected article
    ArticleSelected {
        path: String,
        title: String,
        chunk_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The highlighted chunk moved
    ChunkChanged {
        path: String,
        chunk_index: usize,
        origin: NavigationOrigin,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback status changed
    PlaybackStatusChanged {
        status: PlaybackStatus,
        chunk_index: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio for a chunk could not be fetched or played
    PlaybackError {
        kind: FailureKind,
        chunk_index: usize,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Initial state sent on SSE connection
    InitialState {
        session: SessionSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl NarrEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            NarrEvent::ArticleSelected { .. } => "ArticleSelected",
            NarrEvent::ChunkChanged { .. } => "ChunkChanged",
            NarrEvent::PlaybackStatusChanged { .. } => "PlaybackStatusChanged",
            NarrEvent::PlaybackError { .. } => "PlaybackError",
            NarrEvent::InitialState { .. } => "InitialState",
        }
    }
}
