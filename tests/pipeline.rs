use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use rust_loop_eval::config::{DetectorParams, PipelineConfig};
use rust_loop_eval::corpus::{
    DESCRIPTOR_DIM, FeatureSet, Keypoint, LoadedCorpus, write_descriptors, write_keypoints,
};
use rust_loop_eval::detection::{
    DetectionResult, DetectionStatus, FeatureExtractor, LoopDetector, Orchestrator,
    RejectionReason, prepare, run_pipeline,
};
use rust_loop_eval::extract::CorpusExtractor;
use rust_loop_eval::reconcile::{IndexMapping, ReconcileError};

struct Dataset {
    _tmp: TempDir,
    config: PipelineConfig,
}

fn write_corpus_entry(dir: &Path, base: &str, n: usize) {
    let kps: Vec<_> = (0..n)
        .map(|i| Keypoint::new(i as f32, i as f32 * 2.0, 1.5, 0.0))
        .collect();
    let descs: Vec<_> = (0..n).map(|i| [i as f32 / 10.0; DESCRIPTOR_DIM]).collect();
    write_keypoints(dir.join(format!("{base}.feat")), &kps).unwrap();
    write_descriptors(dir.join(format!("{base}.desc")), &descs).unwrap();
}

fn dataset(manifest: &[&str], corpus: &[(&str, usize)], images: &[&str]) -> Dataset {
    let tmp = TempDir::new().unwrap();
    let corpus_dir = tmp.path().join("corpus");
    let image_dir = tmp.path().join("images");
    std::fs::create_dir(&corpus_dir).unwrap();
    std::fs::create_dir(&image_dir).unwrap();

    for (base, n) in corpus {
        write_corpus_entry(&corpus_dir, base, *n);
    }
    for name in images {
        std::fs::write(image_dir.join(name), b"").unwrap();
    }
    let manifest_path = tmp.path().join("list.txt");
    std::fs::write(&manifest_path, manifest.join("\n")).unwrap();

    let pose_path = tmp.path().join("pose.txt");
    std::fs::write(&pose_path, "0.0, 0.0, 0.0, 0.0\n\n1.0, 1.0, 0.5, 0.1\n").unwrap();

    let mut config = PipelineConfig {
        vocabulary_path: tmp.path().join("voc.yml.gz"),
        database_path: tmp.path().join("db.yml.gz"),
        image_directory: image_dir,
        corpus_directory: corpus_dir,
        manifest_path,
        pose_path: Some(pose_path),
        image_width: 640,
        image_height: 480,
        direct_index_level: 2,
        detector: DetectorParams::default(),
    };
    config.sync_detector_params();

    Dataset { _tmp: tmp, config }
}

/// Answers from a fixed script and records what it was given.
#[derive(Default)]
struct ScriptedDetector {
    script: Vec<(DetectionStatus, Option<usize>)>,
    database: Option<PathBuf>,
    corpus_sizes: Vec<usize>,
    queries: Vec<(usize, usize)>,
}

impl LoopDetector for ScriptedDetector {
    fn load_database(&mut self, path: &Path) -> Result<()> {
        self.database = Some(path.to_path_buf());
        Ok(())
    }

    fn attach_corpus(&mut self, corpus: &LoadedCorpus) -> Result<()> {
        self.corpus_sizes = corpus.records().iter().map(|r| r.num_features()).collect();
        Ok(())
    }

    fn detect_loop(
        &mut self,
        query: usize,
        features: &FeatureSet,
        mapping: &IndexMapping,
    ) -> Result<DetectionResult> {
        assert_eq!(mapping.as_slice(), &[0, 1]);
        self.queries.push((query, features.num_features()));
        let (status, matched) = self.script[query];
        Ok(DetectionResult {
            status,
            query,
            matched,
        })
    }
}

#[test]
fn test_end_to_end_two_images() {
    let ds = dataset(
        &["img001.jpg", "img002.jpg"],
        &[("img001", 4), ("img002", 6)],
        &["img001.jpg", "img002.jpg"],
    );

    let prepared = prepare(&ds.config).unwrap();
    assert_eq!(prepared.mapping.as_slice(), &[0, 1]);
    assert_eq!(prepared.query_images.len(), 2);
    assert_eq!(prepared.poses.len(), 2);
    assert_eq!(prepared.corpus.total_features(), 10);

    let detector = ScriptedDetector {
        script: vec![
            (DetectionStatus::NoDbResults, None),
            (DetectionStatus::LoopDetected, Some(0)),
        ],
        ..Default::default()
    };
    let extractor = CorpusExtractor::new(prepared.corpus.clone());
    let mut orch = Orchestrator::new(ds.config.detector.clone(), extractor, detector);
    let report = orch.execute(&ds.config.database_path, &prepared).unwrap();

    assert_eq!(report.loops_found, 1);
    assert_eq!(report.rejected(RejectionReason::NoDbResults), 1);
    assert_eq!(report.loops().collect::<Vec<_>>(), vec![(1, 0)]);
    assert!(report.mean_features.is_some());
    assert!(report.mean_detection.is_some());
    assert!(report.to_string().starts_with("1 loop found"));

    let (_, detector) = orch.into_parts();
    assert_eq!(detector.database.as_deref(), Some(ds.config.database_path.as_path()));
    assert_eq!(detector.corpus_sizes, vec![4, 6]);
    assert_eq!(detector.queries, vec![(0, 4), (1, 6)]);
}

struct ConstantExtractor;

impl FeatureExtractor for ConstantExtractor {
    fn extract(&mut self, _image_path: &Path) -> Result<FeatureSet> {
        Ok(FeatureSet::new(Vec::new(), vec![[0.0; DESCRIPTOR_DIM]; 9]))
    }
}

#[test]
fn test_run_pipeline_entry_point() {
    let ds = dataset(
        &["img001.jpg", "img002.jpg"],
        &[("img001", 1), ("img002", 1)],
        &["img001.jpg", "img002.jpg"],
    );
    let detector = ScriptedDetector {
        script: vec![
            (DetectionStatus::LowScores, Some(1)),
            (DetectionStatus::CloseMatchesOnly, None),
        ],
        ..Default::default()
    };

    let report = run_pipeline(&ds.config, ConstantExtractor, detector).unwrap();
    assert_eq!(report.loops_found, 0);
    assert_eq!(report.queries.iter().map(|q| q.num_features).sum::<usize>(), 18);
    assert!(report.to_string().starts_with("No loops found"));
}

#[test]
fn test_unresolved_manifest_entry_aborts_before_detection() {
    let ds = dataset(
        &["img001.jpg", "img003.jpg"],
        &[("img001", 1), ("img002", 1)],
        &["img001.jpg", "img003.jpg"],
    );
    let err = prepare(&ds.config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReconcileError>(),
        Some(ReconcileError::Unresolved { manifest_index: 1, .. })
    ));
}

#[test]
fn test_missing_keypoint_file_aborts() {
    let ds = dataset(&["img001.jpg"], &[("img001", 1)], &["img001.jpg"]);
    std::fs::remove_file(ds.config.corpus_directory.join("img001.feat")).unwrap();

    let err = prepare(&ds.config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReconcileError>(),
        Some(ReconcileError::CardinalityMismatch {
            descriptors: 1,
            keypoints: 0
        })
    ));
}

#[test]
fn test_missing_query_image_aborts() {
    let ds = dataset(
        &["img001.jpg", "img002.jpg"],
        &[("img001", 1), ("img002", 1)],
        &["img001.jpg"],
    );
    let err = prepare(&ds.config).unwrap_err();
    assert!(err.to_string().contains("img002.jpg"));
}

#[test]
fn test_missing_corpus_directory_aborts() {
    let mut ds = dataset(&["img001.jpg"], &[("img001", 1)], &["img001.jpg"]);
    ds.config.corpus_directory = ds.config.corpus_directory.join("nope");
    assert!(prepare(&ds.config).is_err());
}

#[test]
fn test_empty_image_directory_aborts() {
    let ds = dataset(&["img001.jpg"], &[("img001", 1)], &[]);
    let err = prepare(&ds.config).unwrap_err();
    assert!(format!("{:#}", err).contains("There is no image"));
}

#[test]
fn test_missing_image_directory_aborts() {
    let mut ds = dataset(&["img001.jpg"], &[("img001", 1)], &["img001.jpg"]);
    ds.config.image_directory = ds.config.image_directory.join("nope");
    let err = prepare(&ds.config).unwrap_err();
    assert!(format!("{:#}", err).contains("cannot be read"));
}
