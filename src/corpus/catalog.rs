//! Discovery of the on-disk corpus and parallel loading of its records.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::CorpusError;
use super::descriptors::load_descriptors;
use super::keypoints::load_keypoints;
use super::types::{FeatureRecord, FeatureSet};
use crate::io::enumerate::{
    DESCRIPTOR_EXTENSION, EntryForm, KEYPOINT_EXTENSION, base_name, list_files,
};

/// File names found in a corpus directory.
///
/// Both lists are sorted by name so that corpus indices are stable across
/// runs on any filesystem.
#[derive(Debug, Clone)]
pub struct CorpusCatalog {
    pub directory: PathBuf,
    pub descriptor_files: Vec<String>,
    pub keypoint_files: Vec<String>,
}

/// The descriptor and keypoint file of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub base_name: String,
    pub descriptor_path: PathBuf,
    pub keypoint_path: PathBuf,
}

impl CorpusCatalog {
    /// List the `.desc` and `.feat` files of `dir`.
    ///
    /// Fails if the directory cannot be read or holds no descriptor file.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self, CorpusError> {
        let dir = dir.as_ref();
        let mut descriptor_files = list_files(dir, &[DESCRIPTOR_EXTENSION], EntryForm::FileName)?;
        let mut keypoint_files = list_files(dir, &[KEYPOINT_EXTENSION], EntryForm::FileName)?;

        if descriptor_files.is_empty() {
            return Err(CorpusError::Empty(dir.to_path_buf()));
        }

        descriptor_files.sort();
        keypoint_files.sort();

        tracing::info!(
            "Corpus {}: {} descriptor files, {} keypoint files",
            dir.display(),
            descriptor_files.len(),
            keypoint_files.len()
        );

        Ok(Self {
            directory: dir.to_path_buf(),
            descriptor_files,
            keypoint_files,
        })
    }

    /// Pair every descriptor file with the keypoint file of the same base
    /// name. The result follows descriptor order, so entry `i` is corpus
    /// index `i`.
    pub fn pair(&self) -> Result<Vec<CorpusEntry>, CorpusError> {
        let mut keypoints_by_base: HashMap<&str, &str> = HashMap::new();
        for name in &self.keypoint_files {
            if keypoints_by_base.insert(base_name(name), name.as_str()).is_some() {
                return Err(CorpusError::DuplicateEntry(base_name(name).to_string()));
            }
        }

        let mut entries = Vec::with_capacity(self.descriptor_files.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for desc in &self.descriptor_files {
            let base = base_name(desc);
            if !seen.insert(base) {
                return Err(CorpusError::DuplicateEntry(base.to_string()));
            }
            let feat = keypoints_by_base
                .remove(base)
                .ok_or_else(|| CorpusError::UnpairedEntry(desc.clone()))?;
            entries.push(CorpusEntry {
                base_name: base.to_string(),
                descriptor_path: self.directory.join(desc),
                keypoint_path: self.directory.join(feat),
            });
        }

        // Anything left is a keypoint file without descriptors.
        if let Some(orphan) = keypoints_by_base.values().min() {
            return Err(CorpusError::UnpairedEntry((*orphan).to_string()));
        }

        Ok(entries)
    }
}

/// Every record of the corpus, indexed by corpus position.
#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    records: Vec<FeatureRecord>,
    index_by_base: HashMap<String, usize>,
}

impl LoadedCorpus {
    /// Load all entries. Entries are parsed in parallel, each into its own
    /// record; the first failure aborts the load.
    pub fn load(entries: &[CorpusEntry]) -> Result<Self, CorpusError> {
        let records = entries
            .par_iter()
            .map(load_record)
            .collect::<Result<Vec<_>, _>>()?;

        for (i, rec) in records.iter().enumerate() {
            tracing::debug!(
                "Descriptor {}: {} has {} features",
                i,
                rec.base_name,
                rec.num_features()
            );
        }

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<FeatureRecord>) -> Self {
        let index_by_base = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.base_name.clone(), i))
            .collect();
        Self {
            records,
            index_by_base,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn get(&self, corpus_idx: usize) -> Option<&FeatureRecord> {
        self.records.get(corpus_idx)
    }

    /// Corpus index of the record with the given base name.
    pub fn position(&self, base_name: &str) -> Option<usize> {
        self.index_by_base.get(base_name).copied()
    }

    /// Total number of descriptors across the corpus.
    pub fn total_features(&self) -> usize {
        self.records.iter().map(FeatureRecord::num_features).sum()
    }
}

/// Load the descriptor and keypoint files of one entry.
pub fn load_record(entry: &CorpusEntry) -> Result<FeatureRecord, CorpusError> {
    let keypoints = load_keypoints(&entry.keypoint_path)?;
    let descriptors = load_descriptors(&entry.descriptor_path)?;

    if keypoints.len() != descriptors.len() {
        tracing::debug!(
            "{}: {} keypoints for {} descriptors",
            entry.base_name,
            keypoints.len(),
            descriptors.len()
        );
    }

    Ok(FeatureRecord {
        base_name: entry.base_name.clone(),
        features: FeatureSet::new(keypoints, descriptors),
    })
}
