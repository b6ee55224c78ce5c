//! OpenCV SIFT extraction.

use std::path::Path;

use anyhow::{Context, Result, bail};
use opencv::core::{KeyPoint, Mat, Ptr, Vector};
use opencv::features2d;
use opencv::prelude::*;
use opencv::{imgcodecs, imgcodecs::IMREAD_GRAYSCALE};

use crate::corpus::{DESCRIPTOR_DIM, DescriptorVector, FeatureSet, Keypoint};
use crate::detection::FeatureExtractor;

use super::root_sift;

/// SIFT detector settings.
#[derive(Debug, Clone, Copy)]
pub struct SiftParams {
    pub n_features: i32,
    pub n_octave_layers: i32,
    pub contrast_threshold: f64,
    pub edge_threshold: f64,
    pub sigma: f64,
}

impl Default for SiftParams {
    fn default() -> Self {
        Self {
            n_features: 15000,
            n_octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
        }
    }
}

/// Reads an image as grayscale and computes root-SIFT features.
pub struct SiftExtractor {
    sift: Ptr<features2d::SIFT>,
}

impl SiftExtractor {
    pub fn new(params: SiftParams) -> Result<Self> {
        let sift = features2d::SIFT::create(
            params.n_features,
            params.n_octave_layers,
            params.contrast_threshold,
            params.edge_threshold,
            params.sigma,
            false,
        )?;
        Ok(Self { sift })
    }

    fn detect(&mut self, image: &Mat) -> Result<FeatureSet> {
        let mut cv_keypoints = Vector::<KeyPoint>::new();
        let mut cv_descriptors = Mat::default();
        let mask = Mat::default();
        self.sift.detect_and_compute(
            image,
            &mask,
            &mut cv_keypoints,
            &mut cv_descriptors,
            false,
        )?;

        let keypoints = cv_keypoints
            .iter()
            .map(|kp| Keypoint::new(kp.pt().x, kp.pt().y, kp.size(), kp.angle()))
            .collect();

        if !cv_descriptors.empty() && cv_descriptors.cols() != DESCRIPTOR_DIM as i32 {
            bail!(
                "SIFT produced {}-dimensional descriptors, expected {}",
                cv_descriptors.cols(),
                DESCRIPTOR_DIM
            );
        }

        let mut descriptors: Vec<DescriptorVector> =
            Vec::with_capacity(cv_descriptors.rows().max(0) as usize);
        for row in 0..cv_descriptors.rows() {
            let values = cv_descriptors.at_row::<f32>(row)?;
            let mut desc = [0f32; DESCRIPTOR_DIM];
            desc.copy_from_slice(&values[..DESCRIPTOR_DIM]);
            descriptors.push(desc);
        }
        root_sift(&mut descriptors);

        Ok(FeatureSet::new(keypoints, descriptors))
    }
}

impl FeatureExtractor for SiftExtractor {
    fn extract(&mut self, image_path: &Path) -> Result<FeatureSet> {
        let path_str = image_path
            .to_str()
            .with_context(|| format!("Non UTF-8 image path {:?}", image_path))?;
        let image = imgcodecs::imread(path_str, IMREAD_GRAYSCALE)
            .with_context(|| format!("Failed to read image {:?}", image_path))?;
        if image.empty() {
            bail!("Image {:?} is empty or could not be decoded", image_path);
        }
        self.detect(&image)
    }
}
