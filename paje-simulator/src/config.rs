//! Simulator configuration
//!
//! This module provides the construction-time options of a simulation run.
//! Configuration can be assembled in code through the builder-style setters
//! or loaded from TOML and YAML files with extension-based format
//! detection.

use serde::{Deserialize, Serialize};
use std::path::Path;

use paje_core::time::Timestamp;

use crate::error::{SimulationError, SimulationResult};

/// Configuration file formats
#[derive(Debug, Clone, Copy)]
enum ConfigFileFormat {
    Toml,
    Yaml,
}

/// Construction-time options of a simulation run
///
/// # Examples
///
/// ```rust
/// use paje_simulator::SimulatorConfig;
///
/// let config = SimulatorConfig::new().with_stop_at(100.0);
/// assert_eq!(config.stop_at, Some(100.0));
/// assert!(!config.enforce_monotonic_time);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulation cutoff: finalization closes at this time and timed events
    /// beyond it are discarded
    pub stop_at: Option<Timestamp>,
    /// When set, a timed event older than the last known time is rejected
    /// instead of being silently accepted
    pub enforce_monotonic_time: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            stop_at: None,
            enforce_monotonic_time: false,
        }
    }
}

impl SimulatorConfig {
    /// Creates the default configuration: no cutoff, no monotonicity check
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the simulation cutoff
    ///
    /// # Arguments
    ///
    /// * `time` - The time finalization closes the model at
    pub fn with_stop_at(mut self, time: Timestamp) -> Self {
        self.stop_at = Some(time);
        self
    }

    /// Enables or disables monotonic time enforcement
    pub fn with_monotonic_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_monotonic_time = enforce;
        self
    }

    /// Loads configuration from a file with automatic format detection
    ///
    /// The format is detected from the file extension: `.toml` parses as
    /// TOML, `.yaml` and `.yml` as YAML. Any other extension attempts TOML
    /// first and falls back to YAML.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            SimulationError::configuration(format!(
                "could not read '{}': {}",
                path.display(),
                err
            ))
        })?;
        match Self::detect_format(path) {
            Some(ConfigFileFormat::Toml) => Self::from_toml_str(&contents),
            Some(ConfigFileFormat::Yaml) => Self::from_yaml_str(&contents),
            None => Self::from_toml_str(&contents).or_else(|_| Self::from_yaml_str(&contents)),
        }
    }

    fn detect_format(path: &Path) -> Option<ConfigFileFormat> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Some(ConfigFileFormat::Toml),
            Some("yaml") | Some("yml") => Some(ConfigFileFormat::Yaml),
            _ => None,
        }
    }

    /// Parses configuration from TOML text
    pub fn from_toml_str(contents: &str) -> SimulationResult<Self> {
        toml::from_str(contents).map_err(|err| {
            SimulationError::configuration(format!("invalid TOML configuration: {}", err))
        })
    }

    /// Parses configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> SimulationResult<Self> {
        serde_yaml::from_str(contents).map_err(|err| {
            SimulationError::configuration(format!("invalid YAML configuration: {}", err))
        })
    }
}
