//! Feature extractors.
//!
//! - [`CorpusExtractor`] serves the precomputed corpus features of an image.
//! - `SiftExtractor` (feature `opencv`) computes root-SIFT features from
//!   the image itself.

#[cfg(feature = "opencv")]
pub mod sift;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::corpus::{DescriptorVector, FeatureSet, LoadedCorpus};
use crate::detection::FeatureExtractor;
use crate::io::enumerate::base_name;

#[cfg(feature = "opencv")]
pub use sift::SiftExtractor;

/// Root-SIFT: L1-normalize each descriptor, then take the element-wise
/// square root. Descriptors whose components sum to zero are left as is.
pub fn root_sift(descriptors: &mut [DescriptorVector]) {
    for desc in descriptors.iter_mut() {
        let sum: f32 = desc.iter().sum();
        if sum == 0.0 || !sum.is_finite() {
            continue;
        }
        for v in desc.iter_mut() {
            *v = (*v / sum).max(0.0).sqrt();
        }
    }
}

/// Looks query images up in the loaded corpus by base name instead of
/// computing features.
#[derive(Debug, Clone)]
pub struct CorpusExtractor {
    corpus: Arc<LoadedCorpus>,
}

impl CorpusExtractor {
    pub fn new(corpus: Arc<LoadedCorpus>) -> Self {
        Self { corpus }
    }
}

impl FeatureExtractor for CorpusExtractor {
    fn extract(&mut self, image_path: &Path) -> Result<FeatureSet> {
        let file_name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid image path {}", image_path.display()))?;
        let base = base_name(file_name);
        let idx = self
            .corpus
            .position(base)
            .with_context(|| format!("No corpus features for {}", base))?;
        let record = self
            .corpus
            .get(idx)
            .with_context(|| format!("Corpus index {} out of range", idx))?;
        Ok(record.features.clone())
    }
}
