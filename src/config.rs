//! YAML Configuration File Support for scenefp
//!
//! Loads matcher parameters and rescan settings from a single YAML file.
//! Every section and field is optional and falls back to its default.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # scenefp configuration
//! version: "1.0"
//! name: "library-rescan"
//!
//! matcher:
//!   audio:
//!     min_hashes: 20
//!     density_threshold: 0.3
//!     delta_tolerance: 2
//!     min_span: 0
//!   visual:
//!     hamming_max: 8
//!     min_frames: 5
//!     density_threshold: 0.3
//!     delta_tolerance: 2
//!     min_span: 0
//!
//! rescan:
//!   parallel: true
//!   modalities: [audio, visual]
//!   max_hash_occurrences: 500
//! ```
//!
//! Tuning values are never range-checked here: a `delta_tolerance` of 0
//! still means "use the default" and a negative `min_span` still disables
//! the span gate. Only values that cannot be interpreted at all are
//! rejected.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rescan::RescanConfig;
use matcher::MatchConfig;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenefpConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Audio and visual matcher parameters
    #[serde(default)]
    pub matcher: MatchConfig,

    /// Library rescan settings
    #[serde(default)]
    pub rescan: RescanConfig,
}

impl ScenefpConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ScenefpConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML, e.g. to dump the effective configuration.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if !self.matcher.audio.density_threshold.is_finite() {
            return Err(ConfigLoadError::Validation(
                "matcher.audio.density_threshold must be a finite number".to_string(),
            ));
        }
        if !self.matcher.visual.density_threshold.is_finite() {
            return Err(ConfigLoadError::Validation(
                "matcher.visual.density_threshold must be a finite number".to_string(),
            ));
        }
        if self.rescan.modalities.is_empty() {
            return Err(ConfigLoadError::Validation(
                "rescan.modalities must name at least one of: audio, visual".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ScenefpConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            matcher: MatchConfig::default(),
            rescan: RescanConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
