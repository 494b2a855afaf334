//! Client side of the navigation controller
//!
//! `NavigationHandle` is cheap to clone and is what the HTTP handlers hold.
//! Each call sends one intent and waits for the controller's answer.

use crate::audio::output::AudioSink;
use crate::content::ContentSource;
use crate::error::{Error, Result};
use crate::playback::cache::AudioResourceCache;
use crate::playback::controller::{Command, NavigationController, SelectionTicket};
use crate::playback::driver::PlaybackDriver;
use crate::state::SharedState;
use narr_common::model::Article;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Pending intents beyond this make callers wait
const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone)]
pub struct NavigationHandle {
    commands: mpsc::Sender<Command>,
    /// Shared by all clones; hands out selection tickets in request order
    selections: Arc<AtomicU64>,
}

/// Start the navigation controller task.
///
/// The task runs until every `NavigationHandle` clone is dropped; it then
/// stops playback and releases all cached audio before the join handle
/// completes.
pub fn spawn_navigation(
    state: Arc<SharedState>,
    source: Arc<dyn ContentSource>,
    cache: Arc<AudioResourceCache>,
    sink: Box<dyn AudioSink>,
) -> (NavigationHandle, JoinHandle<()>) {
    let (driver, driver_events) = PlaybackDriver::new(sink);
    let controller = NavigationController::new(state, source, cache, driver);

    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(controller.run(command_rx, driver_events));

    let handle = NavigationHandle {
        commands,
        selections: Arc::new(AtomicU64::new(0)),
    };
    (handle, task)
}

impl NavigationHandle {
    /// Claim the next place in the article selection order.
    ///
    /// Take the ticket before fetching the article so the last request wins,
    /// not the last fetch to finish.
    pub fn reserve_selection(&self) -> SelectionTicket {
        SelectionTicket(self.selections.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub async fn select_article(&self, article: Article) -> Result<()> {
        let ticket = self.reserve_selection();
        self.select_reserved(ticket, article).await
    }

    /// Select `article` in the place reserved by `ticket`.
    ///
    /// Fails with `SelectionSuperseded` if a selection reserved later has
    /// already been applied.
    pub async fn select_reserved(&self, ticket: SelectionTicket, article: Article) -> Result<()> {
        self.request(|reply| Command::SelectArticle {
            article,
            ticket,
            reply,
        })
        .await
    }

    pub async fn select_chunk(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::SelectChunk { index, reply })
            .await
    }

    /// Returns false when already at the first chunk or nothing is selected
    pub async fn step_prev(&self) -> Result<bool> {
        self.request(|reply| Command::StepPrev { reply }).await
    }

    /// Returns false when already at the last chunk or nothing is selected
    pub async fn step_next(&self) -> Result<bool> {
        self.request(|reply| Command::StepNext { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| Error::EngineStopped)?;
        response.await.map_err(|_| Error::EngineStopped)?
    }
}
