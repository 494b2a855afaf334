//! Audio device output using cpal
//!
//! Each playback runs on its own thread: cpal streams are not `Send`, so the
//! thread that builds the stream also owns it until the audio drains or the
//! playback is stopped.

use crate::audio::decoder::decode_handle;
use crate::audio::output::{AudioSink, SinkNotifier};
use crate::audio::resampler::Resampler;
use crate::audio::types::{AudioHandle, DecodedAudio};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// List available audio output devices.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::PlaybackFailure(format!("Failed to enumerate devices: {}", e)))?
        .filter_map(|device| device.name().ok())
        .collect();

    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Flags shared between the sink, the playback thread and the stream callback
#[derive(Debug, Default)]
struct PlaybackFlags {
    stop: AtomicBool,
    drained: AtomicBool,
    stream_error: AtomicBool,
}

/// Plays chunk audio on a local output device
#[derive(Debug)]
pub struct DeviceSink {
    device_name: Option<String>,
    current: Option<Arc<PlaybackFlags>>,
}

impl DeviceSink {
    /// `device_name`: None = default output device
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            current: None,
        }
    }
}

impl AudioSink for DeviceSink {
    fn play(&mut self, handle: AudioHandle, notifier: SinkNotifier) -> Result<()> {
        self.stop();

        let flags = Arc::new(PlaybackFlags::default());
        let thread_flags = Arc::clone(&flags);
        let device_name = self.device_name.clone();

        std::thread::Builder::new()
            .name(format!("narr-output-{}", handle.key().index))
            .spawn(move || run_playback(handle, device_name, notifier, thread_flags))
            .map_err(|e| Error::PlaybackFailure(format!("Failed to start output thread: {}", e)))?;

        self.current = Some(flags);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(flags) = self.current.take() {
            flags.stop.store(true, Ordering::SeqCst);
        }
    }

    fn name(&self) -> String {
        match &self.device_name {
            Some(name) => format!("device:{}", name),
            None => "device:default".to_string(),
        }
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_playback(
    handle: AudioHandle,
    device_name: Option<String>,
    notifier: SinkNotifier,
    flags: Arc<PlaybackFlags>,
) {
    let key = handle.key().clone();

    let stream = match open_stream(&handle, device_name.as_deref(), &flags) {
        Ok(stream) => stream,
        Err(e) => {
            if !flags.stop.load(Ordering::SeqCst) {
                warn!(chunk = %key, "Device output failed: {}", e);
                notifier.failed(e.to_string());
            }
            return;
        }
    };

    if flags.stop.load(Ordering::SeqCst) {
        return;
    }
    notifier.started();

    loop {
        std::thread::sleep(POLL_INTERVAL);

        if flags.stop.load(Ordering::SeqCst) {
            debug!(chunk = %key, "Device playback stopped");
            break;
        }
        if flags.stream_error.load(Ordering::SeqCst) {
            notifier.failed("Audio stream error");
            break;
        }
        if flags.drained.load(Ordering::SeqCst) {
            notifier.finished();
            break;
        }
    }

    if let Err(e) = stream.pause() {
        debug!("Failed to pause stream: {}", e);
    }
}

/// Decode, match the device rate, and start a stream playing the audio
fn open_stream(
    handle: &AudioHandle,
    device_name: Option<&str>,
    flags: &Arc<PlaybackFlags>,
) -> Result<Stream> {
    let decoded = decode_handle(handle)?;
    let device = find_device(device_name)?;

    let supported = device
        .default_output_config()
        .map_err(|e| Error::PlaybackFailure(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config = supported.config();

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let samples = prepare_samples(&decoded, config.sample_rate.0, config.channels)?;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, samples, flags)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, samples, flags)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, samples, flags)?,
        other => {
            return Err(Error::PlaybackFailure(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| Error::PlaybackFailure(format!("Failed to start stream: {}", e)))?;
    Ok(stream)
}

/// Requested device by name, falling back to the default device
fn find_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::PlaybackFailure(format!("Failed to enumerate devices: {}", e)))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::PlaybackFailure("No default output device found".to_string()))?;
    info!(
        "Using audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(device)
}

/// Resample to the device rate and map source channels onto device channels
fn prepare_samples(decoded: &DecodedAudio, device_rate: u32, device_channels: u16) -> Result<Vec<f32>> {
    let resampled = Resampler::resample(
        &decoded.samples,
        decoded.sample_rate,
        device_rate,
        decoded.channels,
    )?;

    if decoded.channels == device_channels {
        return Ok(resampled);
    }

    let src = decoded.channels as usize;
    let dst = device_channels as usize;
    let mut mapped = Vec::with_capacity(resampled.len() / src * dst);
    for frame in resampled.chunks_exact(src) {
        for ch in 0..dst {
            // Extra device channels repeat the last source channel
            mapped.push(frame[ch.min(src - 1)]);
        }
    }
    Ok(mapped)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    flags: &Arc<PlaybackFlags>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let data_flags = Arc::clone(flags);
    let error_flags = Arc::clone(flags);
    let mut position = 0usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.iter_mut() {
                    let sample = samples.get(position).copied().unwrap_or(0.0);
                    *out = T::from_sample(sample.clamp(-1.0, 1.0));
                    position += 1;
                }
                if position >= samples.len() {
                    data_flags.drained.store(true, Ordering::SeqCst);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flags.stream_error.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::PlaybackFailure(format!("Failed to build stream: {}", e)))
}
