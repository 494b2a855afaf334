//! Audio decoder using symphonia
//!
//! Decodes a chunk's in-memory audio payload (MP3 in practice; FLAC, AAC,
//! Vorbis and WAV also accepted) to interleaved f32 PCM.
//!
//! A payload symphonia cannot probe or decode is a `PlaybackFailure`.

use crate::audio::types::{AudioHandle, DecodedAudio};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode the audio held by `handle`.
pub fn decode_handle(handle: &AudioHandle) -> Result<DecodedAudio> {
    if handle.is_released() {
        return Err(Error::PlaybackFailure(format!(
            "audio for {} was released",
            handle.key()
        )));
    }
    decode_bytes(handle.bytes(), handle.content_type())
}

/// Decode an entire in-memory payload to PCM.
///
/// # Returns
/// Interleaved f32 samples with the source sample rate and channel count
///
/// # Errors
/// - Unrecognized container format
/// - No audio track / missing sample rate
/// - Payload contains no decodable frames
pub fn decode_bytes(bytes: Bytes, content_type: Option<&str>) -> Result<DecodedAudio> {
    debug!(
        "Decoding {} byte payload (content type: {})",
        bytes.len(),
        content_type.unwrap_or("unknown")
    );

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(mime) = content_type {
        hint.mime_type(mime);
        if let Some(ext) = extension_for_mime(mime) {
            hint.with_extension(ext);
        }
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::PlaybackFailure(format!("Unrecognized audio payload: {}", e)))?;

    let mut format = probed.format;

    // Get the default audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::PlaybackFailure("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::PlaybackFailure("Sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::PlaybackFailure(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::PlaybackFailure(format!("Error reading packet: {}", e)));
            }
        };

        // Skip packets for other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame; keep going
                warn!("Decode error: {}", e);
                continue;
            }
            Err(e) => {
                return Err(Error::PlaybackFailure(format!("Decoder failed: {}", e)));
            }
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(Error::PlaybackFailure(
            "Payload contained no audio frames".to_string(),
        ));
    }

    let decoded = DecodedAudio {
        samples,
        sample_rate,
        channels: channels as u16,
    };

    debug!(
        "Decoded {} frames at {}Hz, {} channels ({:.2}s)",
        decoded.frames(),
        decoded.sample_rate,
        decoded.channels,
        decoded.duration().as_secs_f32()
    );

    Ok(decoded)
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let base = mime.split(';').next().unwrap_or(mime).trim();
    match base.to_ascii_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/ogg" | "audio/vorbis" => Some("ogg"),
        "audio/aac" => Some("aac"),
        "audio/mp4" | "audio/x-m4a" => Some("m4a"),
        _ => None,
    }
}
