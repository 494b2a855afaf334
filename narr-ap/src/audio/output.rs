//! Audio outputs
//!
//! `AudioSink` is the physical output seam owned by the playback driver.
//! A sink is told to play a handle and reports back through a `SinkNotifier`:
//! `started` once sound begins, then exactly one of `finished` (natural end)
//! or `failed`. After `stop` a sink must not report `finished` for the
//! stopped audio; the driver additionally discards anything carrying a stale
//! token.
//!
//! Outputs:
//! - `ClockSink`: headless, decodes the audio and waits out its duration
//! - `DeviceSink` (feature `device-output`): cpal device output, see `audio::device`

use crate::audio::decoder::decode_handle;
use crate::audio::types::AudioHandle;
use crate::error::{Error, Result};
use crate::playback::events::{DriverEvent, PlaybackToken, SinkSignal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Physical audio output
pub trait AudioSink: Send {
    /// Begin playing `handle` immediately, replacing anything already playing.
    ///
    /// Errors returned here mean the output refused the audio outright; errors
    /// discovered later (e.g. while decoding) are reported via `notifier.failed`.
    fn play(&mut self, handle: AudioHandle, notifier: SinkNotifier) -> Result<()>;

    /// Stop playback without reporting completion
    fn stop(&mut self);

    /// Human-readable output name for logs and the API
    fn name(&self) -> String;
}

/// Reports the progress of one playback back to the driver
#[derive(Debug, Clone)]
pub struct SinkNotifier {
    token: PlaybackToken,
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl SinkNotifier {
    pub(crate) fn new(token: PlaybackToken, tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> PlaybackToken {
        self.token
    }

    pub fn started(&self) {
        self.send(SinkSignal::Started);
    }

    pub fn finished(&self) {
        self.send(SinkSignal::Finished);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.send(SinkSignal::Failed(reason.into()));
    }

    fn send(&self, signal: SinkSignal) {
        // Receiver gone means the engine is shutting down
        if self
            .tx
            .send(DriverEvent {
                token: self.token,
                signal,
            })
            .is_err()
        {
            debug!("Driver event receiver closed, dropping sink signal");
        }
    }
}

/// Headless output: plays "silently" for exactly the decoded duration.
///
/// Used on servers without audio hardware and as the default output. Timing
/// of Started/Finished matches what a real device would report, so chunk
/// highlighting and auto-advance behave the same.
#[derive(Debug, Default)]
pub struct ClockSink {
    task: Option<JoinHandle<()>>,
}

impl ClockSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for ClockSink {
    fn play(&mut self, handle: AudioHandle, notifier: SinkNotifier) -> Result<()> {
        self.stop();

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::PlaybackFailure(format!("Clock output needs a runtime: {}", e)))?;

        let task = runtime.spawn(async move {
            let key = handle.key().clone();
            let decoded = tokio::task::spawn_blocking(move || decode_handle(&handle)).await;

            match decoded {
                Ok(Ok(audio)) => {
                    debug!(chunk = %key, "Clock output playing {:.2}s", audio.duration().as_secs_f32());
                    notifier.started();
                    tokio::time::sleep(audio.duration()).await;
                    notifier.finished();
                }
                Ok(Err(e)) => {
                    warn!(chunk = %key, "Clock output could not decode audio: {}", e);
                    notifier.failed(e.to_string());
                }
                Err(e) => {
                    notifier.failed(format!("Decode task failed: {}", e));
                }
            }
        });

        self.task = Some(task);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn name(&self) -> String {
        "clock".to_string()
    }
}

impl Drop for ClockSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::ChunkKey;
    use crate::content::AudioPayload;
    use bytes::Bytes;
    use std::io::Cursor;
    use std::time::Duration;

    fn wav_handle(frames: usize) -> AudioHandle {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        AudioHandle::new(
            ChunkKey::new("articles/a", 0),
            AudioPayload {
                bytes: Bytes::from(cursor.into_inner()),
                content_type: Some("audio/wav".to_string()),
            },
        )
    }

    #[tokio::test]
    async fn test_clock_sink_reports_started_then_finished() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ClockSink::new();

        // 400 frames at 8kHz = 50ms
        sink.play(wav_handle(400), SinkNotifier::new(PlaybackToken(1), tx))
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.signal, SinkSignal::Started);
        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second.signal, SinkSignal::Finished);
        assert_eq!(second.token, PlaybackToken(1));
    }

    #[tokio::test]
    async fn test_clock_sink_stop_suppresses_finished() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ClockSink::new();

        // 8000 frames = 1s
        sink.play(wav_handle(8000), SinkNotifier::new(PlaybackToken(7), tx))
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.signal, SinkSignal::Started);

        sink.stop();

        let next = tokio::time::timeout(Duration::from_millis(1500), rx.recv()).await;
        match next {
            Err(_) | Ok(None) => {}
            Ok(Some(event)) => panic!("unexpected signal after stop: {:?}", event),
        }
    }

    #[tokio::test]
    async fn test_clock_sink_reports_decode_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ClockSink::new();
        let handle = AudioHandle::new(
            ChunkKey::new("articles/a", 0),
            AudioPayload {
                bytes: Bytes::from_static(b"definitely not audio"),
                content_type: None,
            },
        );

        sink.play(handle, SinkNotifier::new(PlaybackToken(2), tx)).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(event.signal, SinkSignal::Failed(_)));
    }
}
