//! Seams to the external collaborators of a run.

use std::path::Path;

use anyhow::Result;

use crate::corpus::{FeatureSet, LoadedCorpus};
use crate::reconcile::IndexMapping;

use super::result::DetectionResult;

/// Produces keypoints and 128-dimensional descriptors for one image.
///
/// Implemented once per descriptor family (SIFT, SURF, ...).
pub trait FeatureExtractor {
    fn extract(&mut self, image_path: &Path) -> Result<FeatureSet>;
}

/// Bag-of-words loop detector.
///
/// Implementations own the vocabulary, the inverted/direct index and the
/// verification stages; they are built from a vocabulary and
/// [`DetectorParams`](crate::config::DetectorParams). The orchestrator only
/// loads the database, hands over the corpus features and queries.
pub trait LoopDetector {
    /// Load a persisted database before the first query.
    fn load_database(&mut self, path: &Path) -> Result<()>;

    /// Give the detector the precomputed features of every corpus image,
    /// indexed by corpus position.
    fn attach_corpus(&mut self, corpus: &LoadedCorpus) -> Result<()>;

    /// Add the query image to the detector and look for a loop.
    fn detect_loop(
        &mut self,
        query: usize,
        features: &FeatureSet,
        mapping: &IndexMapping,
    ) -> Result<DetectionResult>;
}

impl<T: FeatureExtractor + ?Sized> FeatureExtractor for &mut T {
    fn extract(&mut self, image_path: &Path) -> Result<FeatureSet> {
        (**self).extract(image_path)
    }
}

impl<T: LoopDetector + ?Sized> LoopDetector for &mut T {
    fn load_database(&mut self, path: &Path) -> Result<()> {
        (**self).load_database(path)
    }

    fn attach_corpus(&mut self, corpus: &LoadedCorpus) -> Result<()> {
        (**self).attach_corpus(corpus)
    }

    fn detect_loop(
        &mut self,
        query: usize,
        features: &FeatureSet,
        mapping: &IndexMapping,
    ) -> Result<DetectionResult> {
        (**self).detect_loop(query, features, mapping)
    }
}
