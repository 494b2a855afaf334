//! Shared test doubles for narr-ap integration tests
//!
//! - `MemorySource`: in-memory content source that counts audio fetches and
//!   can hold a fetch open until the test releases it
//! - `ScriptedSink`: audio output whose Started/Finished signals the test
//!   triggers explicitly
//! - `TestEngine`: navigation task wired to both

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use narr_ap::audio::{AudioHandle, AudioSink, SinkNotifier};
use narr_ap::content::{AudioPayload, ContentSource};
use narr_ap::playback::{spawn_navigation, AudioResourceCache, NavigationHandle};
use narr_ap::{Error, Result, SharedState};
use narr_common::events::SessionSnapshot;
use narr_common::model::{Article, ArticleSummary, AudioRef, Chunk};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(2);

/// Mono 16-bit WAV of silence lasting `millis` at 8kHz
pub fn wav_bytes(millis: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..(8 * millis) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Article whose chunk `i` has text "Chunk i." and audio "<path>/i.mp3"
pub fn article(path: &str, chunks: usize) -> Article {
    Article::new(
        format!("Title of {}", path),
        path,
        (0..chunks)
            .map(|i| Chunk::new(format!("Chunk {}.", i), format!("{}/{}.mp3", path, i)))
            .collect(),
    )
}

// ============================================================================
// Content source
// ============================================================================

#[derive(Default)]
pub struct MemorySource {
    articles: Mutex<HashMap<String, Article>>,
    fetches: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    /// Served for every audio fetch when set; otherwise the locator's bytes
    audio: Mutex<Option<Bytes>>,
}

impl MemorySource {
    pub fn new(articles: Vec<Article>) -> Self {
        let source = Self::default();
        {
            let mut map = source.articles.lock().unwrap();
            for article in articles {
                map.insert(article.path.clone(), article);
            }
        }
        source
    }

    /// Serve `bytes` (e.g. a real WAV file) for every audio fetch
    pub fn serve_audio(&self, bytes: Vec<u8>) {
        *self.audio.lock().unwrap() = Some(Bytes::from(bytes));
    }

    /// Number of times `audio_ref` was fetched
    pub fn fetch_count(&self, audio_ref: &str) -> usize {
        self.fetches.lock().unwrap().get(audio_ref).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    /// Make fetches of `audio_ref` fail until `recover` is called
    pub fn fail(&self, audio_ref: &str) {
        self.failing.lock().unwrap().insert(audio_ref.to_string());
    }

    pub fn recover(&self, audio_ref: &str) {
        self.failing.lock().unwrap().remove(audio_ref);
    }

    /// Hold fetches of `audio_ref` open until the returned gate is opened
    pub fn hold(&self, audio_ref: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(audio_ref.to_string(), Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
        let mut summaries: Vec<ArticleSummary> = self
            .articles
            .lock()
            .unwrap()
            .values()
            .map(|a| a.summary())
            .collect();
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(summaries)
    }

    async fn fetch_article(&self, path: &str) -> Result<Article> {
        self.articles
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("article metadata returned 404: {}", path)))
    }

    async fn fetch_audio(&self, audio_ref: &AudioRef) -> Result<AudioPayload> {
        let key = audio_ref.as_str().to_string();
        *self.fetches.lock().unwrap().entry(key.clone()).or_default() += 1;

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|_| Error::Fetch("gate closed".into()))?;
            permit.forget();
        }

        if self.failing.lock().unwrap().contains(&key) {
            return Err(Error::Fetch(format!("{} returned 404", key)));
        }

        let served = self.audio.lock().unwrap().clone();
        Ok(match served {
            Some(bytes) => AudioPayload {
                bytes,
                content_type: Some("audio/wav".to_string()),
            },
            None => AudioPayload {
                bytes: Bytes::from(key),
                content_type: Some("audio/mpeg".to_string()),
            },
        })
    }
}

// ============================================================================
// Audio output
// ============================================================================

pub struct Played {
    pub handle: AudioHandle,
    pub notifier: SinkNotifier,
}

#[derive(Default)]
struct SinkLog {
    played: Vec<Played>,
    stops: usize,
    refuse: HashSet<usize>,
}

/// Test-side view of a `ScriptedSink`
#[derive(Clone, Default)]
pub struct SinkProbe {
    log: Arc<Mutex<SinkLog>>,
}

impl SinkProbe {
    /// Chunk indices handed to the output, in order
    pub fn played_indices(&self) -> Vec<usize> {
        self.log
            .lock()
            .unwrap()
            .played
            .iter()
            .map(|p| p.handle.key().index)
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.log.lock().unwrap().played.len()
    }

    pub fn stop_count(&self) -> usize {
        self.log.lock().unwrap().stops
    }

    /// Handle of the `n`th playback
    pub fn handle(&self, n: usize) -> AudioHandle {
        self.log.lock().unwrap().played[n].handle.clone()
    }

    /// Notifier of the `n`th playback
    pub fn notifier(&self, n: usize) -> SinkNotifier {
        self.log.lock().unwrap().played[n].notifier.clone()
    }

    /// Notifier of the most recent playback
    pub fn last(&self) -> SinkNotifier {
        let log = self.log.lock().unwrap();
        log.played[log.played.len() - 1].notifier.clone()
    }

    /// Output refuses to play the chunk at `index`
    pub fn refuse(&self, index: usize) {
        self.log.lock().unwrap().refuse.insert(index);
    }

    /// Report Started then Finished for the most recent playback
    pub fn play_through(&self) {
        let notifier = self.last();
        notifier.started();
        notifier.finished();
    }
}

pub struct ScriptedSink {
    probe: SinkProbe,
}

impl ScriptedSink {
    pub fn new() -> (Self, SinkProbe) {
        let probe = SinkProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl AudioSink for ScriptedSink {
    fn play(&mut self, handle: AudioHandle, notifier: SinkNotifier) -> Result<()> {
        let mut log = self.probe.log.lock().unwrap();
        if log.refuse.contains(&handle.key().index) {
            return Err(Error::PlaybackFailure(format!("output refused {}", handle.key())));
        }
        log.played.push(Played { handle, notifier });
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.log.lock().unwrap().stops += 1;
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct TestEngine {
    pub state: Arc<SharedState>,
    pub navigation: NavigationHandle,
    pub source: Arc<MemorySource>,
    pub cache: Arc<AudioResourceCache>,
    pub sink: SinkProbe,
    pub task: JoinHandle<()>,
}

impl TestEngine {
    /// Engine with a scripted output
    pub fn start(articles: Vec<Article>) -> Self {
        let (sink, probe) = ScriptedSink::new();
        Self::start_with_sink(articles, Box::new(sink), probe)
    }

    /// Engine with a real output; `probe` stays empty in that case
    pub fn start_with_sink(articles: Vec<Article>, sink: Box<dyn AudioSink>, probe: SinkProbe) -> Self {
        let state = Arc::new(SharedState::new());
        let source = Arc::new(MemorySource::new(articles));
        let cache = Arc::new(AudioResourceCache::new());

        let (navigation, task) = spawn_navigation(
            Arc::clone(&state),
            Arc::clone(&source) as Arc<dyn ContentSource>,
            Arc::clone(&cache),
            sink,
        );

        Self {
            state,
            navigation,
            source,
            cache,
            sink: probe,
            task,
        }
    }

    /// Select an article known to the source
    pub async fn select(&self, path: &str) -> Result<()> {
        let article = self.source.fetch_article(path).await?;
        self.navigation.select_article(article).await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot().await
    }

    /// Poll the session until `check` holds, panicking after `WAIT`
    pub async fn wait_for<F>(&self, what: &str, check: F) -> SessionSnapshot
    where
        F: Fn(&SessionSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let snapshot = self.state.snapshot().await;
            if check(&snapshot) {
                return snapshot;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for {}: {:?}", what, snapshot);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait until the output has been asked to play `count` times
    pub async fn wait_for_plays(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.sink.play_count() < count {
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "timed out waiting for {} plays, saw {:?}",
                    count,
                    self.sink.played_indices()
                );
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Drop the last handle and wait for the controller to tear down
    pub async fn shutdown(self) -> (Arc<SharedState>, Arc<AudioResourceCache>, SinkProbe) {
        let Self {
            state,
            navigation,
            cache,
            sink,
            task,
            ..
        } = self;
        drop(navigation);
        tokio::time::timeout(WAIT, task)
            .await
            .expect("controller did not stop")
            .expect("controller panicked");
        (state, cache, sink)
    }
}
