//! Precomputed feature corpus.
//!
//! Each image of the corpus is stored as two files sharing a base name:
//! - `<name>.feat`: keypoints, text ([`keypoints`])
//! - `<name>.desc`: 128-float descriptors, binary ([`descriptors`])
//!
//! [`catalog::CorpusCatalog`] finds and pairs them, and
//! [`catalog::LoadedCorpus`] holds the parsed [`FeatureRecord`]s in corpus
//! order.

pub mod catalog;
pub mod descriptors;
pub mod keypoints;
pub mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::io::EnumerateError;

pub use catalog::{CorpusCatalog, CorpusEntry, LoadedCorpus};
pub use descriptors::{load_descriptors, write_descriptors};
pub use keypoints::{load_keypoints, write_keypoints};
pub use types::{DESCRIPTOR_DIM, DescriptorVector, FeatureRecord, FeatureSet, Keypoint};

/// Errors raised while discovering or parsing corpus files.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error(transparent)]
    Enumerate(#[from] EnumerateError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("there is no .desc file in the directory {0}")]
    Empty(PathBuf),

    #[error("{0} has no matching descriptor/keypoint counterpart")]
    UnpairedEntry(String),

    #[error("base name {0} appears more than once in the corpus")]
    DuplicateEntry(String),

    #[error("{path}: malformed keypoints at line {line}: {reason}")]
    MalformedKeypoints {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{path}: header declares {declared} descriptors but the file holds only {available_bytes} bytes")]
    TruncatedDescriptors {
        path: PathBuf,
        declared: u64,
        available_bytes: u64,
    },
}

impl CorpusError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
