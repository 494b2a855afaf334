//! Audio subsystem
//!
//! Decoding of fetched chunk audio and the outputs that play it.

pub mod decoder;
#[cfg(feature = "device-output")]
pub mod device;
pub mod output;
#[cfg(feature = "device-output")]
pub mod resampler;
pub mod types;

pub use output::{AudioSink, ClockSink, SinkNotifier};
pub use types::{AudioHandle, ChunkKey, DecodedAudio};

use crate::config::{OutputConfig, SinkKind};
#[cfg(not(feature = "device-output"))]
use crate::error::Error;
use crate::error::Result;
use tracing::info;

/// Build the audio output selected by configuration
pub fn build_sink(config: &OutputConfig) -> Result<Box<dyn AudioSink>> {
    let sink: Box<dyn AudioSink> = match config.sink {
        SinkKind::Clock => Box::new(ClockSink::new()),
        #[cfg(feature = "device-output")]
        SinkKind::Device => Box::new(device::DeviceSink::new(config.device_name.clone())),
        #[cfg(not(feature = "device-output"))]
        SinkKind::Device => {
            return Err(Error::Config(
                "Device output requested but narr-ap was built without the device-output feature"
                    .to_string(),
            ))
        }
    };

    info!("Audio output: {}", sink.name());
    Ok(sink)
}

/// Output devices the `device` sink can be pointed at.
///
/// Empty when narr-ap was built without the device-output feature.
pub fn list_output_devices() -> Result<Vec<String>> {
    #[cfg(feature = "device-output")]
    {
        device::list_devices()
    }
    #[cfg(not(feature = "device-output"))]
    {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_output_is_clock() {
        let sink = build_sink(&OutputConfig::default()).unwrap();
        assert_eq!(sink.name(), "clock");
    }

    #[cfg(not(feature = "device-output"))]
    #[test]
    fn test_device_output_requires_feature() {
        let config = OutputConfig {
            sink: SinkKind::Device,
            device_name: None,
        };
        assert!(matches!(build_sink(&config), Err(Error::Config(_))));
    }

    #[cfg(not(feature = "device-output"))]
    #[test]
    fn test_no_devices_without_device_output() {
        assert!(list_output_devices().unwrap().is_empty());
    }
}
