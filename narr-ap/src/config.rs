//! Configuration management for narr-ap
//!
//! Settings sources priority:
//! 1. Command-line arguments (--port, --content-url)
//! 2. Environment variables (NARR_AP_PORT, NARR_CONTENT_URL) via clap
//! 3. TOML configuration file (see `narr_common::config` for its location)
//! 4. Built-in defaults (code constants)

use crate::error::Result;
use narr_common::config::{load_toml, resolve_config_path, ConfigLocation};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file when `--config` is absent
pub const CONFIG_ENV_VAR: &str = "NARR_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Content server (article catalog, metadata and audio)
    #[serde(default)]
    pub content: ContentConfig,

    /// Audio output selection
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            content: ContentConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Config file for narr-ap: `cli_arg`, then `NARR_CONFIG`, then the OS config directory
    pub fn locate(cli_arg: Option<&Path>) -> ConfigLocation {
        resolve_config_path(cli_arg, CONFIG_ENV_VAR, "narr-ap")
    }

    /// Load configuration from `location`, falling back to defaults
    pub fn load(location: &ConfigLocation) -> Result<Self> {
        Ok(load_toml(location)?)
    }
}

/// Content server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Base URL of the content server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for catalog and metadata requests.
    ///
    /// Audio downloads are not bounded by this; they use the transport default.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ContentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Which audio output backs the playback driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Headless output paced by the wall clock
    #[default]
    Clock,
    /// Physical output device (requires the `device-output` feature)
    Device,
}

impl std::str::FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clock" => Ok(SinkKind::Clock),
            "device" => Ok(SinkKind::Device),
            other => Err(format!("unknown output sink '{}' (expected clock or device)", other)),
        }
    }
}

/// Audio output settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub sink: SinkKind,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device_name: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5750);
        assert_eq!(config.content.base_url, "http://localhost:5000");
        assert_eq!(config.content.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.output.sink, SinkKind::Clock);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[content]").unwrap();
        writeln!(file, "base_url = \"http://reader.local:8080\"").unwrap();
        writeln!(file, "[output]").unwrap();
        writeln!(file, "sink = \"device\"").unwrap();

        let config = TomlConfig::load(&ConfigLocation::explicit(file.path())).unwrap();
        assert_eq!(config.port, 5750);
        assert_eq!(config.content.base_url, "http://reader.local:8080");
        assert_eq!(config.content.request_timeout_ms, 10_000);
        assert_eq!(config.output.sink, SinkKind::Device);
        assert!(config.output.device_name.is_none());
    }

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!("Clock".parse::<SinkKind>().unwrap(), SinkKind::Clock);
        assert_eq!("device".parse::<SinkKind>().unwrap(), SinkKind::Device);
        assert!("speaker".parse::<SinkKind>().is_err());
    }

    #[test]
    #[serial]
    fn test_config_file_named_by_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 6001").unwrap();
        std::env::set_var(CONFIG_ENV_VAR, file.path());

        let location = TomlConfig::locate(None);
        let config = TomlConfig::load(&location);
        std::env::remove_var(CONFIG_ENV_VAR);

        assert!(location.required);
        assert_eq!(config.unwrap().port, 6001);
    }

    #[test]
    #[serial]
    fn test_cli_path_beats_environment() {
        std::env::set_var(CONFIG_ENV_VAR, "/nonexistent/narr-ap.toml");
        let file = tempfile::NamedTempFile::new().unwrap();

        let location = TomlConfig::locate(Some(file.path()));
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(location.path.as_deref(), Some(file.path()));
        // Empty file: every field falls back to its default
        assert_eq!(TomlConfig::load(&location).unwrap().port, 5750);
    }
}
