//! Run configuration for a loop-closure evaluation.
//!
//! Everything the pipeline needs is carried in [`PipelineConfig`], which is
//! usually loaded from a YAML file:
//!
//! ```yaml
//! vocabulary_path: data/voc.yml.gz
//! database_path: data/db.yml.gz
//! image_directory: data/images
//! corpus_directory: data/corpus
//! manifest_path: data/list.txt
//! pose_path: data/pose.txt
//! image_width: 640
//! image_height: 480
//! direct_index_level: 2
//! detector:
//!   use_nss: true
//!   alpha: 0.3
//!   k: 1
//!   geom_check: direct_index
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Geometric verification strategy requested from the loop detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometricCheck {
    /// Compare all features between the two images.
    Exhaustive,
    /// As exhaustive, through a FLANN structure.
    Flann,
    /// Only compare features sharing a vocabulary node at `di_levels`.
    DirectIndex,
    /// No geometric verification.
    None,
}

/// Parameters handed to the loop detector when it is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Use the normalized similarity score instead of the raw score.
    pub use_nss: bool,

    /// Threshold applied to the (normalized) similarity score.
    pub alpha: f64,

    /// Number of previous matches a loop must be consistent with.
    pub k: usize,

    /// Geometric verification mode.
    pub geom_check: GeometricCheck,

    /// Direct index level used by [`GeometricCheck::DirectIndex`].
    /// Overwritten by [`PipelineConfig::direct_index_level`] at load time.
    pub di_levels: usize,

    /// Image height in pixels.
    pub image_rows: u32,

    /// Image width in pixels.
    pub image_cols: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            use_nss: true,
            alpha: 0.3,
            k: 1,
            geom_check: GeometricCheck::DirectIndex,
            di_levels: 0,
            image_rows: 480,
            image_cols: 640,
        }
    }
}

/// Complete description of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Vocabulary consumed by the detector.
    pub vocabulary_path: PathBuf,

    /// Persisted detector database, loaded before the first query.
    pub database_path: PathBuf,

    /// Directory holding the query images.
    pub image_directory: PathBuf,

    /// Directory holding the `.desc` / `.feat` corpus files.
    pub corpus_directory: PathBuf,

    /// Authoritative ordered image list.
    pub manifest_path: PathBuf,

    /// Optional robot pose file (`timestamp, x, y, theta`).
    #[serde(default)]
    pub pose_path: Option<PathBuf>,

    #[serde(default = "default_width")]
    pub image_width: u32,

    #[serde(default = "default_height")]
    pub image_height: u32,

    /// Direct index level for geometric checking.
    #[serde(default)]
    pub direct_index_level: usize,

    #[serde(default)]
    pub detector: DetectorParams,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse from a YAML string and normalize derived fields.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.sync_detector_params();
        config.validate()?;
        Ok(config)
    }

    /// Copy the image geometry and direct index level into the detector
    /// parameters so the detector only ever sees one source of truth.
    pub fn sync_detector_params(&mut self) {
        self.detector.di_levels = self.direct_index_level;
        self.detector.image_rows = self.image_height;
        self.detector.image_cols = self.image_width;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if !(self.detector.alpha.is_finite() && self.detector.alpha >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "alpha must be a non-negative number, got {}",
                self.detector.alpha
            )));
        }
        Ok(())
    }
}
