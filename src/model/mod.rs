pub mod onnx;
pub mod skeleton;

use anyhow::Result;

use crate::source::Frame;

pub use onnx::{decode_outputs, OnnxPoseModel};
pub use skeleton::{Skeleton, SkeletonCatalog};

/// Parameters of a single `detect_poses` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectParams {
    pub default_fov_degrees: f32,
    pub internal_batch_size: u32,
    pub num_aug: u32,
    pub average_aug: bool,
    pub skeleton: String,
    pub detector_threshold: f32,
    pub detector_nms_iou_threshold: f32,
    /// -1 means no limit
    pub max_detections: i32,
    pub antialias_factor: u32,
    pub suppress_implausible_poses: bool,
}

/// Everything the model found in one frame. Outer index is the person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    /// `[x, y, width, height, confidence]` in pixels
    pub boxes: Vec<[f32; 5]>,
    /// Camera-space millimetres, Y pointing down
    pub poses3d: Vec<Vec<[f32; 3]>>,
    /// Image-space pixels
    pub poses2d: Vec<Vec<[f32; 2]>>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box confidences as whole percentages, e.g. `"97% 88% "`.
    pub fn confidence_summary(&self) -> String {
        self.boxes
            .iter()
            .map(|b| format!("{:.0}% ", 100.0 * b[4]))
            .collect()
    }
}

/// A pre-trained 3D pose estimator.
///
/// Detection, augmentation, lifting and suppression all happen behind
/// `detect_poses`; callers only pick parameters and a skeleton.
pub trait PoseModel {
    fn detect_poses(&mut self, frame: &Frame, params: &DetectParams) -> Result<Detections>;

    fn skeleton(&self, name: &str) -> Result<&Skeleton>;
}
