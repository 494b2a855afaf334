//! Navigation controller
//!
//! Single owner of the selected article, the current chunk index, the audio
//! cache and the playback driver. Runs as one tokio task; intents, output
//! signals and the in-flight audio resolution are multiplexed in `run`, so
//! intents never interleave.
//!
//! Every play-at allocates a request token. A newer intent drops the pending
//! resolution (which aborts its fetch), and a resolution that still completes
//! is only bound to the output if its token is the current one.

use crate::audio::types::{AudioHandle, ChunkKey};
use crate::content::ContentSource;
use crate::error::{Error, Result};
use crate::playback::cache::AudioResourceCache;
use crate::playback::driver::PlaybackDriver;
use crate::playback::events::{DriverEvent, DriverTransition};
use crate::playback::sequence::ChunkSequence;
use crate::state::SharedState;
use chrono::Utc;
use narr_common::events::{FailureKind, NavigationOrigin, PlaybackFailureInfo};
use narr_common::model::Article;
use narr_common::{NarrEvent, PlaybackStatus};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

type ResolveFuture = Pin<Box<dyn Future<Output = Resolved> + Send>>;

/// Intent sent to the controller task
#[derive(Debug)]
pub(crate) enum Command {
    SelectArticle {
        article: Article,
        ticket: SelectionTicket,
        reply: oneshot::Sender<Result<()>>,
    },
    SelectChunk {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    StepPrev {
        reply: oneshot::Sender<Result<bool>>,
    },
    StepNext {
        reply: oneshot::Sender<Result<bool>>,
    },
}

/// Order in which article selections were requested.
///
/// Reserved before the article's metadata is fetched, so a selection whose
/// fetch finished late cannot replace one that was requested after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectionTicket(pub(crate) u64);

/// Identifies one play-at request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequestToken(u64);

/// Completed audio resolution for a play-at request
struct Resolved {
    request: RequestToken,
    index: usize,
    result: Result<AudioHandle>,
}

pub struct NavigationController {
    state: Arc<SharedState>,
    source: Arc<dyn ContentSource>,
    cache: Arc<AudioResourceCache>,
    driver: PlaybackDriver,
    sequence: Option<ChunkSequence>,
    current_index: Option<usize>,
    next_request: u64,
    current_request: Option<RequestToken>,
    pending: Option<ResolveFuture>,
    latest_selection: Option<SelectionTicket>,
}

impl NavigationController {
    pub fn new(
        state: Arc<SharedState>,
        source: Arc<dyn ContentSource>,
        cache: Arc<AudioResourceCache>,
        driver: PlaybackDriver,
    ) -> Self {
        Self {
            state,
            source,
            cache,
            driver,
            sequence: None,
            current_index: None,
            next_request: 1,
            current_request: None,
            pending: None,
            latest_selection: None,
        }
    }

    /// Process intents until every command sender is dropped, then tear down
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut driver_events: mpsc::UnboundedReceiver<DriverEvent>,
    ) {
        info!("Navigation controller started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = driver_events.recv() => {
                    self.on_driver_event(event).await;
                }
                resolved = next_resolution(&mut self.pending) => {
                    self.pending = None;
                    self.on_resolved(resolved).await;
                }
            }
        }

        self.teardown().await;
        info!("Navigation controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        // A dropped reply receiver means the caller went away; the intent still applies
        match command {
            Command::SelectArticle {
                article,
                ticket,
                reply,
            } => {
                let _ = reply.send(self.select_ticketed(ticket, article).await);
            }
            Command::SelectChunk { index, reply } => {
                let _ = reply.send(self.select_chunk(index).await);
            }
            Command::StepPrev { reply } => {
                let _ = reply.send(self.step_prev().await);
            }
            Command::StepNext { reply } => {
                let _ = reply.send(self.step_next().await);
            }
        }
    }

    /// Select `article` unless a later-requested selection already applied
    async fn select_ticketed(&mut self, ticket: SelectionTicket, article: Article) -> Result<()> {
        if self.latest_selection.is_some_and(|latest| ticket < latest) {
            info!(article = %article.path, "Ignoring selection requested before the current one");
            return Err(Error::SelectionSuperseded(article.path));
        }
        self.select_article(article).await?;
        self.latest_selection = Some(ticket);
        Ok(())
    }

    /// Make `article` the selected article and start its first chunk
    pub async fn select_article(&mut self, article: Article) -> Result<()> {
        if article.chunks.is_empty() {
            warn!(article = %article.path, "Rejecting article with no chunks");
            return Err(Error::EmptyArticle(article.path));
        }

        info!(article = %article.path, chunks = article.chunks.len(), "Selecting article");

        // Nothing from the previous article may bind after this point
        self.cancel_pending();
        self.driver.stop();

        let previous = self.sequence.as_ref().map(|s| s.path().to_string());
        if let Some(previous) = previous {
            if previous != article.path {
                self.cache.invalidate_article(&previous).await;
            }
        }

        let article = Arc::new(article);
        self.sequence = Some(ChunkSequence::new(Arc::clone(&article)));
        self.current_index = Some(0);
        self.state.select_article(Arc::clone(&article)).await;

        self.state.broadcast_event(NarrEvent::ArticleSelected {
            path: article.path.clone(),
            title: article.title.clone(),
            chunk_count: article.chunks.len(),
            timestamp: Utc::now(),
        });
        self.publish_chunk_changed(0, NavigationOrigin::ArticleSelected);

        self.play_at(0).await;
        Ok(())
    }

    /// Jump to `index`, restarting playback even if it is already current
    pub async fn select_chunk(&mut self, index: usize) -> Result<()> {
        self.move_to(index, NavigationOrigin::ChunkSelected).await
    }

    /// Move to the preceding chunk; false when already at the first or nothing is selected
    pub async fn step_prev(&mut self) -> Result<bool> {
        let target = match (&self.sequence, self.current_index) {
            (Some(sequence), Some(index)) => sequence.prev_index(index),
            _ => None,
        };
        match target {
            Some(index) => self.move_to(index, NavigationOrigin::Step).await.map(|_| true),
            None => {
                debug!("Step back ignored");
                Ok(false)
            }
        }
    }

    /// Move to the following chunk; false at the last chunk (no wrap) or with nothing selected
    pub async fn step_next(&mut self) -> Result<bool> {
        self.advance(NavigationOrigin::Step).await
    }

    /// Auto-advance after the current chunk played to its end
    pub async fn on_playback_ended(&mut self) -> Result<bool> {
        self.advance(NavigationOrigin::AutoAdvance).await
    }

    async fn advance(&mut self, origin: NavigationOrigin) -> Result<bool> {
        let target = match (&self.sequence, self.current_index) {
            (Some(sequence), Some(index)) => sequence.next_index(index),
            _ => None,
        };
        match target {
            Some(index) => self.move_to(index, origin).await.map(|_| true),
            None => {
                debug!(?origin, "Step forward ignored");
                Ok(false)
            }
        }
    }

    async fn move_to(&mut self, index: usize, origin: NavigationOrigin) -> Result<()> {
        let sequence = self.sequence.as_ref().ok_or(Error::NoArticleSelected)?;
        sequence.chunk(index)?;

        info!(article = %sequence.path(), index, ?origin, "Moving to chunk");

        self.current_index = Some(index);
        self.state.set_current_index(index).await;
        self.publish_chunk_changed(index, origin);

        self.play_at(index).await;
        Ok(())
    }

    /// Stop whatever plays and start resolving the audio for `index`
    async fn play_at(&mut self, index: usize) {
        self.cancel_pending();
        self.driver.stop();

        let Some(sequence) = &self.sequence else {
            return;
        };
        let Ok(chunk) = sequence.chunk(index) else {
            return;
        };

        let request = RequestToken(self.next_request);
        self.next_request += 1;
        self.current_request = Some(request);

        let key = ChunkKey::new(sequence.path(), index);
        let audio_ref = chunk.audio_ref.clone();
        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);

        debug!(chunk = %key, request = request.0, "Resolving chunk audio");
        self.pending = Some(Box::pin(async move {
            let result = cache.resolve(source.as_ref(), key, &audio_ref).await;
            Resolved {
                request,
                index,
                result,
            }
        }));

        self.set_status(PlaybackStatus::Loading).await;
    }

    async fn on_resolved(&mut self, resolved: Resolved) {
        if self.current_request != Some(resolved.request) {
            debug!(
                request = resolved.request.0,
                index = resolved.index,
                "Discarding superseded audio resolution"
            );
            return;
        }
        self.current_request = None;

        let handle = match resolved.result {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(FailureKind::Fetch, resolved.index, e.to_string()).await;
                return;
            }
        };

        if let Err(e) = self.driver.load(handle) {
            self.fail(FailureKind::Playback, resolved.index, e.to_string()).await;
        }
    }

    async fn on_driver_event(&mut self, event: DriverEvent) {
        let Some(transition) = self.driver.apply(event) else {
            return;
        };

        match transition {
            DriverTransition::Playing => {
                self.set_status(PlaybackStatus::Playing).await;
            }
            DriverTransition::StartedAndEnded => {
                self.set_status(PlaybackStatus::Playing).await;
                self.finish_chunk().await;
            }
            DriverTransition::Ended => {
                self.finish_chunk().await;
            }
            DriverTransition::Failed(reason) => {
                let index = self.current_index.unwrap_or_default();
                self.fail(FailureKind::Playback, index, reason).await;
            }
        }
    }

    async fn finish_chunk(&mut self) {
        self.set_status(PlaybackStatus::Ended).await;
        if let Err(e) = self.on_playback_ended().await {
            warn!("Auto-advance failed: {}", e);
        }
    }

    /// Publish a recoverable failure; the index stays where navigation put it
    async fn fail(&mut self, kind: FailureKind, chunk_index: usize, message: String) {
        warn!(?kind, chunk_index, "Chunk playback failed: {}", message);

        self.state
            .set_last_error(Some(PlaybackFailureInfo {
                kind,
                chunk_index,
                message: message.clone(),
            }))
            .await;
        self.state.broadcast_event(NarrEvent::PlaybackError {
            kind,
            chunk_index,
            message,
            timestamp: Utc::now(),
        });

        self.set_status(PlaybackStatus::Failed).await;
    }

    async fn set_status(&mut self, status: PlaybackStatus) {
        self.state.set_playback_status(status).await;
        self.state.broadcast_event(NarrEvent::PlaybackStatusChanged {
            status,
            chunk_index: self.current_index,
            timestamp: Utc::now(),
        });
    }

    fn publish_chunk_changed(&self, chunk_index: usize, origin: NavigationOrigin) {
        if let Some(sequence) = &self.sequence {
            self.state.broadcast_event(NarrEvent::ChunkChanged {
                path: sequence.path().to_string(),
                chunk_index,
                origin,
                timestamp: Utc::now(),
            });
        }
    }

    fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("Superseding in-flight audio resolution");
        }
        self.current_request = None;
    }

    async fn teardown(&mut self) {
        self.cancel_pending();
        self.driver.stop();
        self.cache.clear().await;
        self.sequence = None;
        self.current_index = None;
        self.state.reset().await;
    }
}

/// Await the in-flight resolution, or never complete when there is none
async fn next_resolution(pending: &mut Option<ResolveFuture>) -> Resolved {
    match pending.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}
