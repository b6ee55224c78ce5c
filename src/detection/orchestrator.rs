//! The evaluation loop.
//!
//! A run has two stages:
//! 1. [`prepare`]: every precondition is checked and every input is loaded
//!    (corpus discovery, manifest, reconciliation, corpus records, query
//!    images, poses). Any failure here aborts before the first query.
//! 2. [`Orchestrator::execute`]: the detector database is loaded, the corpus
//!    is handed over, and each query image goes through extraction,
//!    detection and classification in manifest order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::config::{DetectorParams, PipelineConfig};
use crate::corpus::{CorpusCatalog, LoadedCorpus};
use crate::io::enumerate::{EntryForm, IMAGE_EXTENSIONS, list_files};
use crate::io::{ImageManifest, Pose2, load_poses};
use crate::reconcile::{IndexMapping, reconcile};

use super::result::DetectionOutcome;
use super::stats::{PHASE_DETECTION, PHASE_FEATURES, QueryReport, RunReport, RunStatistics};
use super::traits::{FeatureExtractor, LoopDetector};

/// Inputs of a run, validated and loaded.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub manifest: ImageManifest,
    pub catalog: CorpusCatalog,
    pub mapping: IndexMapping,
    pub corpus: Arc<LoadedCorpus>,
    /// Query images in manifest order.
    pub query_images: Vec<PathBuf>,
    pub poses: Vec<Pose2>,
}

/// Check every precondition of the run and load its inputs.
pub fn prepare(config: &PipelineConfig) -> Result<PreparedRun> {
    let catalog = CorpusCatalog::discover(&config.corpus_directory)
        .context("The program cannot work without a usable corpus")?;

    let manifest = ImageManifest::load(&config.manifest_path)?;
    if manifest.is_empty() {
        bail!(
            "The image list {} is empty",
            config.manifest_path.display()
        );
    }
    info!(
        "Manifest {}: {} images",
        config.manifest_path.display(),
        manifest.len()
    );

    let mapping = reconcile(
        &manifest,
        &catalog.descriptor_files,
        &catalog.keypoint_files,
    )
    .context("Failed to align the image list with the corpus")?;

    let entries = catalog.pair()?;
    let corpus = LoadedCorpus::load(&entries)?;
    info!(
        "Loaded {} corpus records ({} descriptors)",
        corpus.len(),
        corpus.total_features()
    );

    let query_images = resolve_query_images(&config.image_directory, &manifest)?;

    let poses = match &config.pose_path {
        Some(path) => {
            let poses = load_poses(path)?;
            info!("Loaded {} poses from {}", poses.len(), path.display());
            poses
        }
        None => Vec::new(),
    };

    Ok(PreparedRun {
        manifest,
        catalog,
        mapping,
        corpus: Arc::new(corpus),
        query_images,
        poses,
    })
}

/// Map every manifest entry to a file of the image directory.
fn resolve_query_images(image_dir: &Path, manifest: &ImageManifest) -> Result<Vec<PathBuf>> {
    let available = list_files(image_dir, IMAGE_EXTENSIONS, EntryForm::FileName)
        .with_context(|| format!("The images directory {} cannot be read", image_dir.display()))?;
    if available.is_empty() {
        bail!("There is no image in the directory {}", image_dir.display());
    }

    let available: HashSet<String> = available.into_iter().collect();
    if available.len() != manifest.len() {
        warn!(
            "{} images in {} for {} listed images",
            available.len(),
            image_dir.display(),
            manifest.len()
        );
    }

    manifest
        .iter()
        .map(|entry| {
            if available.contains(entry) {
                Ok(image_dir.join(entry))
            } else {
                bail!(
                    "Listed image {} is missing from {}",
                    entry,
                    image_dir.display()
                )
            }
        })
        .collect()
}

/// Drives one detector over a sequence of query images.
pub struct Orchestrator<E, D> {
    params: DetectorParams,
    extractor: E,
    detector: D,
}

impl<E: FeatureExtractor, D: LoopDetector> Orchestrator<E, D> {
    pub fn new(params: DetectorParams, extractor: E, detector: D) -> Self {
        Self {
            params,
            extractor,
            detector,
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn into_parts(self) -> (E, D) {
        (self.extractor, self.detector)
    }

    /// Load the detector database, hand over the corpus and run every query.
    pub fn execute(&mut self, database_path: &Path, prepared: &PreparedRun) -> Result<RunReport> {
        info!("Loading database {}", database_path.display());
        self.detector
            .load_database(database_path)
            .with_context(|| format!("Failed to load database {}", database_path.display()))?;
        self.detector
            .attach_corpus(&prepared.corpus)
            .context("Detector rejected the corpus features")?;

        self.run(&prepared.query_images, &prepared.mapping)
    }

    /// Process `images` in order. Query `i` is manifest image `i`.
    ///
    /// An extraction or detection failure aborts the run.
    pub fn run(&mut self, images: &[PathBuf], mapping: &IndexMapping) -> Result<RunReport> {
        info!("Processing sequence of {} images", images.len());
        let mut stats = RunStatistics::new();

        for (i, image) in images.iter().enumerate() {
            debug!("Adding image {}: {}", i, image.display());

            let features = stats
                .profiler
                .time(PHASE_FEATURES, || self.extractor.extract(image))
                .with_context(|| format!("Feature extraction failed for {}", image.display()))?;

            let result = stats
                .profiler
                .time(PHASE_DETECTION, || self.detector.detect_loop(i, &features, mapping))
                .with_context(|| format!("Loop detection failed for {}", image.display()))?;

            if result.query != i {
                bail!(
                    "Detector answered for query {} while processing query {}",
                    result.query,
                    i
                );
            }

            let outcome = DetectionOutcome::classify(&result)?;
            info!(
                "Image {} ({} features): {}",
                i,
                features.num_features(),
                outcome.describe(&self.params)
            );

            stats.record(QueryReport {
                query: i,
                image: image.clone(),
                num_features: features.num_features(),
                outcome,
            });
        }

        info!(
            "Processed {} images, {} loops found",
            stats.queries_processed(),
            stats.loops_found()
        );
        Ok(stats.finish())
    }
}

/// Prepare a run from `config` and execute it.
pub fn run_pipeline<E, D>(config: &PipelineConfig, extractor: E, detector: D) -> Result<RunReport>
where
    E: FeatureExtractor,
    D: LoopDetector,
{
    let prepared = prepare(config)?;
    let mut orchestrator = Orchestrator::new(config.detector.clone(), extractor, detector);
    orchestrator.execute(&config.database_path, &prepared)
}
