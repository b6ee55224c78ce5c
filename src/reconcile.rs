//! Alignment of the ordered image manifest with the unordered corpus.
//!
//! The manifest defines image identity and order (e.g. trajectory order used
//! by temporal checks), while the corpus is a cache keyed by file name. The
//! detector needs, for every manifest index, the position of the matching
//! corpus entry; [`reconcile`] builds that table once and the rest of the
//! run only reads it.

use std::ops::Index;

use thiserror::Error;

use crate::io::enumerate::base_name;
use crate::io::manifest::ImageManifest;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(
        "there are {descriptors} .desc files whereas there are {keypoints} .feat files"
    )]
    CardinalityMismatch { descriptors: usize, keypoints: usize },

    #[error("there is no descriptor associated to the file {entry} (manifest index {manifest_index})")]
    Unresolved { entry: String, manifest_index: usize },
}

/// Manifest index → corpus index, one entry per manifest image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexMapping(Vec<usize>);

impl IndexMapping {
    pub fn new(corpus_indices: Vec<usize>) -> Self {
        Self(corpus_indices)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Corpus index of the image at `manifest_idx`.
    pub fn corpus_index(&self, manifest_idx: usize) -> Option<usize> {
        self.0.get(manifest_idx).copied()
    }

    /// First manifest index that maps to `corpus_idx`.
    pub fn manifest_index(&self, corpus_idx: usize) -> Option<usize> {
        self.0.iter().position(|&c| c == corpus_idx)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().copied().enumerate()
    }
}

impl Index<usize> for IndexMapping {
    type Output = usize;

    fn index(&self, manifest_idx: usize) -> &usize {
        &self.0[manifest_idx]
    }
}

/// Build the manifest → corpus mapping.
///
/// 1. The descriptor and keypoint file counts must agree.
/// 2. A manifest/corpus size difference is only reported here; it turns
///    fatal when an entry fails to resolve.
/// 3. Each manifest entry, stripped of its extension, is matched against the
///    descriptor base names; the first (lowest) matching corpus index wins.
/// 4. An entry without match fails the whole reconciliation.
pub fn reconcile<S: AsRef<str>>(
    manifest: &ImageManifest,
    descriptor_files: &[S],
    keypoint_files: &[S],
) -> Result<IndexMapping, ReconcileError> {
    if descriptor_files.len() != keypoint_files.len() {
        return Err(ReconcileError::CardinalityMismatch {
            descriptors: descriptor_files.len(),
            keypoints: keypoint_files.len(),
        });
    }

    if manifest.len() != descriptor_files.len() {
        tracing::warn!(
            "There are {} .desc files whereas there are {} images listed in the list file",
            descriptor_files.len(),
            manifest.len()
        );
    }

    let corpus_bases: Vec<&str> = descriptor_files
        .iter()
        .map(|name| base_name(name.as_ref()))
        .collect();

    let mut mapping = Vec::with_capacity(manifest.len());
    for (manifest_index, entry) in manifest.iter().enumerate() {
        let wanted = base_name(entry);
        let corpus_idx = corpus_bases
            .iter()
            .position(|&b| b == wanted)
            .ok_or_else(|| ReconcileError::Unresolved {
                entry: entry.clone(),
                manifest_index,
            })?;
        mapping.push(corpus_idx);
    }

    tracing::debug!("Reconciled {} manifest entries", mapping.len());
    Ok(IndexMapping(mapping))
}
