use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_HEAD_REGION_RATIO, DEFAULT_UNKNOWN_THRESHOLD,
    DEFAULT_WINDOW_SIZE, PERSON_CLASS_ID,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Session options for head-up analysis.
///
/// Every field has a default, so a config file only needs to list the
/// options it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples held by each smoothing window.
    pub window_size: usize,
    /// Fraction of the person box height treated as the head.
    pub head_region_ratio: f64,
    /// Mean brightness at or above which a head counts as up.
    pub brightness_threshold: f64,
    pub enable_face_identification: bool,
    /// Match distance above which the identifier answers Unknown.
    /// Scale is defined by the identifier in use.
    pub unknown_threshold: f64,
    /// Detector class id that denotes a person.
    pub person_class_id: u32,
    /// Drop identities not seen for this many `analyze_frame` calls.
    /// `None` keeps every identity for the whole session.
    pub max_idle_frames: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            head_region_ratio: DEFAULT_HEAD_REGION_RATIO,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            enable_face_identification: true,
            unknown_threshold: DEFAULT_UNKNOWN_THRESHOLD,
            person_class_id: PERSON_CLASS_ID,
            max_idle_frames: None,
        }
    }
}

impl AnalysisConfig {
    /// Platform config location: `<config dir>/ClassWatch/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ClassWatch").join("config.json"))
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 1 {
            return Err(out_of_range("window_size", ">= 1", self.window_size));
        }
        if !(self.head_region_ratio > 0.0 && self.head_region_ratio <= 1.0) {
            return Err(out_of_range(
                "head_region_ratio",
                "in (0, 1]",
                self.head_region_ratio,
            ));
        }
        if !(0.0..=1.0).contains(&self.brightness_threshold) {
            return Err(out_of_range(
                "brightness_threshold",
                "in [0, 1]",
                self.brightness_threshold,
            ));
        }
        if !(self.unknown_threshold >= 0.0) {
            return Err(out_of_range(
                "unknown_threshold",
                ">= 0",
                self.unknown_threshold,
            ));
        }
        if self.max_idle_frames == Some(0) {
            return Err(out_of_range("max_idle_frames", ">= 1 when set", 0));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, expected: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        expected,
        value: value.to_string(),
    }
}
