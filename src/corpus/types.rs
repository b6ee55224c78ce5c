//! Per-image feature data shared by the loader, the extractors and the detector.

use nalgebra::Point2;

/// Dimension of every descriptor vector handled by the pipeline.
pub const DESCRIPTOR_DIM: usize = 128;

/// One 128-float descriptor.
pub type DescriptorVector = [f32; DESCRIPTOR_DIM];

/// A detected interest point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Pixel position.
    pub pt: Point2<f32>,
    /// Diameter of the meaningful neighbourhood.
    pub size: f32,
    /// Orientation in degrees.
    pub angle: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32, angle: f32) -> Self {
        Self {
            pt: Point2::new(x, y),
            size,
            angle,
        }
    }
}

/// Keypoints and descriptors of one image, as parallel arrays.
///
/// The two arrays are not required to have the same length; the descriptor
/// count is what the pipeline treats as the image's feature volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<DescriptorVector>,
}

impl FeatureSet {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<DescriptorVector>) -> Self {
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn num_features(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Parsed content of one corpus entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// File name without extension, shared by the `.desc` and `.feat` files.
    pub base_name: String,
    pub features: FeatureSet,
}

impl FeatureRecord {
    pub fn num_features(&self) -> usize {
        self.features.num_features()
    }
}
