//! Shared session state
//!
//! Read side of the engine: the navigation controller is the only writer,
//! handlers and SSE clients read snapshots and subscribe to events.

use narr_common::events::{
    ArticleView, ChunkView, PlaybackFailureInfo, SessionSnapshot,
};
use narr_common::model::Article;
use narr_common::{NarrEvent, PlaybackStatus};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};

/// Capacity of the event broadcast channel
const EVENT_BUFFER: usize = 100;

/// Mutable session fields, kept under one lock so snapshots are coherent
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub article: Option<Arc<Article>>,
    /// Meaningful only while an article is selected
    pub current_index: Option<usize>,
    pub playback_status: PlaybackStatus,
    pub last_error: Option<PlaybackFailureInfo>,
}

/// Shared state accessible by all components
pub struct SharedState {
    session: RwLock<Session>,

    /// Event broadcaster for SSE events
    event_tx: broadcast::Sender<NarrEvent>,

    /// Flipped once when the server starts shutting down
    shutdown_tx: watch::Sender<bool>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            session: RwLock::new(Session::default()),
            event_tx,
            shutdown_tx,
        }
    }

    /// Ask long-lived responses (SSE streams) to finish
    pub fn begin_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Resolves once `begin_shutdown` has been called
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            // Sender lives as long as the state; an error means it is gone anyway
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: NarrEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NarrEvent> {
        self.event_tx.subscribe()
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn current_article(&self) -> Option<Arc<Article>> {
        self.session.read().await.article.clone()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.session.read().await.current_index
    }

    pub async fn playback_status(&self) -> PlaybackStatus {
        self.session.read().await.playback_status
    }

    pub async fn last_error(&self) -> Option<PlaybackFailureInfo> {
        self.session.read().await.last_error.clone()
    }

    /// Renderable copy of the session with the active chunk marked
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.read().await;

        let article = session.article.as_ref().map(|article| ArticleView {
            title: article.title.clone(),
            path: article.path.clone(),
            chunks: article
                .chunks
                .iter()
                .enumerate()
                .map(|(index, chunk)| ChunkView {
                    index,
                    text: chunk.text.clone(),
                    active: session.current_index == Some(index),
                })
                .collect(),
        });

        SessionSnapshot {
            article,
            current_chunk_index: session.current_index,
            playback_status: session.playback_status,
            last_error: session.last_error.clone(),
        }
    }

    /// Make `article` the selected article with the first chunk active.
    ///
    /// Status returns to Idle under the same lock, so no reader sees the new
    /// article paired with the previous article's playback status.
    pub(crate) async fn select_article(&self, article: Arc<Article>) {
        let mut session = self.session.write().await;
        session.article = Some(article);
        session.current_index = Some(0);
        session.playback_status = PlaybackStatus::Idle;
        session.last_error = None;
    }

    pub(crate) async fn set_current_index(&self, index: usize) {
        self.session.write().await.current_index = Some(index);
    }

    pub(crate) async fn set_playback_status(&self, status: PlaybackStatus) {
        self.session.write().await.playback_status = status;
    }

    pub(crate) async fn set_last_error(&self, error: Option<PlaybackFailureInfo>) {
        self.session.write().await.last_error = error;
    }

    /// Forget the article and return to Idle
    pub(crate) async fn reset(&self) {
        *self.session.write().await = Session::default();
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narr_common::events::FailureKind;
    use narr_common::model::Chunk;

    fn article() -> Arc<Article> {
        Arc::new(Article::new(
            "Rivers",
            "articles/rivers",
            vec![
                Chunk::new("One.", "a/0.mp3"),
                Chunk::new("Two.", "a/1.mp3"),
            ],
        ))
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty() {
        let state = SharedState::new();
        let snapshot = state.snapshot().await;

        assert!(snapshot.article.is_none());
        assert_eq!(snapshot.current_chunk_index, None);
        assert_eq!(snapshot.playback_status, PlaybackStatus::Idle);
    }

    #[tokio::test]
    async fn test_snapshot_marks_active_chunk() {
        let state = SharedState::new();
        state.select_article(article()).await;
        state.set_current_index(1).await;

        let snapshot = state.snapshot().await;
        let view = snapshot.article.unwrap();
        assert_eq!(view.chunks.len(), 2);
        assert!(!view.chunks[0].active);
        assert!(view.chunks[1].active);
        assert_eq!(snapshot.current_chunk_index, Some(1));
    }

    #[tokio::test]
    async fn test_selecting_article_clears_last_error() {
        let state = SharedState::new();
        state
            .set_last_error(Some(PlaybackFailureInfo {
                kind: FailureKind::Fetch,
                chunk_index: 0,
                message: "404".into(),
            }))
            .await;

        state.select_article(article()).await;
        assert!(state.last_error().await.is_none());
        assert_eq!(state.current_index().await, Some(0));
    }

    #[tokio::test]
    async fn test_selecting_article_resets_previous_status() {
        let state = SharedState::new();
        state.select_article(article()).await;
        state.set_current_index(1).await;
        state.set_playback_status(PlaybackStatus::Playing).await;

        state.select_article(article()).await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.playback_status, PlaybackStatus::Idle);
        assert_eq!(snapshot.current_chunk_index, Some(0));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.broadcast_event(NarrEvent::PlaybackStatusChanged {
            status: PlaybackStatus::Loading,
            chunk_index: Some(0),
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "PlaybackStatusChanged");
    }

    #[tokio::test]
    async fn test_shutdown_request_resolves_waiters() {
        let state = SharedState::new();
        let waiter = tokio::spawn(state.shutdown_requested());

        state.begin_shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
