//! Playback driver
//!
//! Binds at most one audio handle to the output at a time and turns raw
//! output signals into lifecycle transitions:
//!
//! ```text
//!   Idle ──load──► Loading ──Started──► Playing ──Finished──► Ended
//!                     │  │                 │                    ▲
//!                     │  └──────Finished (start implied)────────┘
//!                     └──────Failed────────┴──► Failed
//! ```
//!
//! `load` and `stop` both retire the current binding's token. Signals carrying
//! a retired token are ignored, so audio that was replaced can never report
//! an end on behalf of its successor.

use crate::audio::output::{AudioSink, SinkNotifier};
use crate::audio::types::AudioHandle;
use crate::error::Result;
use crate::playback::events::{DriverEvent, DriverTransition, PlaybackToken, SinkSignal};
use narr_common::PlaybackStatus;
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub struct PlaybackDriver {
    sink: Box<dyn AudioSink>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    next_token: u64,
    current: Option<PlaybackToken>,
    status: PlaybackStatus,
}

impl PlaybackDriver {
    /// Create a driver over `sink`.
    ///
    /// Returns the receiver on which the output's signals arrive; feed each
    /// one back through [`PlaybackDriver::apply`].
    pub fn new(sink: Box<dyn AudioSink>) -> (Self, mpsc::UnboundedReceiver<DriverEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                sink,
                events_tx,
                next_token: 1,
                current: None,
                status: PlaybackStatus::Idle,
            },
            events_rx,
        )
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn sink_name(&self) -> String {
        self.sink.name()
    }

    /// Replace whatever is bound with `handle` and start it
    pub fn load(&mut self, handle: AudioHandle) -> Result<PlaybackToken> {
        self.stop();

        let token = self.allocate_token();
        self.current = Some(token);
        self.status = PlaybackStatus::Loading;
        debug!(chunk = %handle.key(), token = token.0, "Loading audio");

        if let Err(e) = self.sink.play(handle, SinkNotifier::new(token, self.events_tx.clone())) {
            self.current = None;
            self.status = PlaybackStatus::Failed;
            return Err(e);
        }
        Ok(token)
    }

    /// Halt and unbind. Never produces an `Ended` transition.
    pub fn stop(&mut self) {
        if self.current.take().is_some() {
            self.sink.stop();
        }
        // Retire any token handed out so far
        self.next_token += 1;
        self.status = PlaybackStatus::Idle;
    }

    /// Apply an output signal; returns the transition it caused, if any
    pub fn apply(&mut self, event: DriverEvent) -> Option<DriverTransition> {
        if self.current != Some(event.token) {
            trace!(token = event.token.0, "Ignoring signal from retired playback");
            return None;
        }

        match (self.status, event.signal) {
            (PlaybackStatus::Loading, SinkSignal::Started) => {
                self.status = PlaybackStatus::Playing;
                Some(DriverTransition::Playing)
            }
            (PlaybackStatus::Playing, SinkSignal::Finished) => {
                self.status = PlaybackStatus::Ended;
                self.current = None;
                Some(DriverTransition::Ended)
            }
            // Finished without a Started (e.g. audio shorter than the output's
            // first callback): the start is implied, then the playback ends
            (PlaybackStatus::Loading, SinkSignal::Finished) => {
                self.status = PlaybackStatus::Ended;
                self.current = None;
                Some(DriverTransition::StartedAndEnded)
            }
            (PlaybackStatus::Loading, SinkSignal::Failed(reason))
            | (PlaybackStatus::Playing, SinkSignal::Failed(reason)) => {
                self.status = PlaybackStatus::Failed;
                self.current = None;
                Some(DriverTransition::Failed(reason))
            }
            (status, signal) => {
                trace!(?status, ?signal, "Ignoring out-of-order output signal");
                None
            }
        }
    }

    fn allocate_token(&mut self) -> PlaybackToken {
        let token = PlaybackToken(self.next_token);
        self.next_token += 1;
        token
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
