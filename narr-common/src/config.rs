//! Configuration file resolution and loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-module file in the OS config directory (`<config_dir>/narr/<module>.toml`)
//!
//! A file named explicitly (1 or 2) must exist. The per-module default file is
//! optional: when it is missing the caller gets built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the configuration for a module comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// File to read, if any could be determined
    pub path: Option<PathBuf>,
    /// True when the path was named explicitly and must exist
    pub required: bool,
}

impl ConfigLocation {
    /// No config file at all; built-in defaults only
    pub fn none() -> Self {
        Self {
            path: None,
            required: false,
        }
    }

    /// Explicitly named file that must exist
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            required: true,
        }
    }
}

/// Resolve the configuration file for `module_name`.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    module_name: &str,
) -> ConfigLocation {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigLocation::explicit(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return ConfigLocation::explicit(path);
        }
    }

    // Priority 3: OS config directory
    match default_config_path(module_name) {
        Some(path) => ConfigLocation {
            path: Some(path),
            required: false,
        },
        None => ConfigLocation::none(),
    }
}

/// Get the default configuration file path for a module on this platform
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("narr").join(format!("{}.toml", module_name)))
}

/// Load a TOML configuration of type `T` from `location`.
///
/// Missing optional files yield `T::default()` with a warning; missing required
/// files and parse failures are errors.
pub fn load_toml<T>(location: &ConfigLocation) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = location.path.as_ref() else {
        debug!("No configuration file location, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        if location.required {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
