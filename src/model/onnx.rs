use anyhow::{bail, Context, Result};
use ndarray::{Array1, ArrayViewD, Ix2, Ix3};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::skeleton::{Skeleton, SkeletonCatalog};
use super::{DetectParams, Detections, PoseModel};
use crate::source::Frame;

pub const MODEL_FILE: &str = "model.onnx";
pub const SKELETONS_FILE: &str = "skeletons.json";

fn build_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        log::info!("[ort] Attempting CUDA execution provider...");
        builder.with_execution_providers([ort::execution_providers::CUDAExecutionProvider::default().build()])?
    };

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))
}

/// Resolves a model argument to `(graph, skeleton definitions)`.
///
/// A directory holds both files; a `.onnx` path looks for the definitions beside it.
pub fn model_files(model: &Path) -> (PathBuf, PathBuf) {
    if model.extension().is_some_and(|e| e == "onnx") {
        let dir = model.parent().unwrap_or_else(|| Path::new("."));
        (model.to_path_buf(), dir.join(SKELETONS_FILE))
    } else {
        (model.join(MODEL_FILE), model.join(SKELETONS_FILE))
    }
}

/// Pose model exported to ONNX with its detection pipeline baked in.
///
/// Inputs: `image` (u8, H x W x 3 RGB) and one 1-element tensor per
/// parameter. Outputs over the full joint set: `boxes` (N x 5),
/// `poses3d` (N x J x 3), `poses2d` (N x J x 2).
pub struct OnnxPoseModel {
    session: Session,
    skeletons: SkeletonCatalog,
    path: PathBuf,
}

impl OnnxPoseModel {
    pub fn load<P: AsRef<Path>>(model: P) -> Result<Self> {
        let model = model.as_ref();
        let t0 = Instant::now();
        let (graph, definitions) = model_files(model);
        let skeletons = SkeletonCatalog::load(&definitions)?;
        let session = build_session(&graph)?;
        log::info!(
            "loaded model: {} in {:.1}sec ({} joints, {} skeletons)",
            model.display(),
            t0.elapsed().as_secs_f32(),
            skeletons.full_joint_count(),
            skeletons.names().count()
        );
        Ok(Self { session, skeletons, path: model.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn skeletons(&self) -> &SkeletonCatalog {
        &self.skeletons
    }
}

impl PoseModel for OnnxPoseModel {
    fn detect_poses(&mut self, frame: &Frame, params: &DetectParams) -> Result<Detections> {
        let skeleton = self.skeletons.get(&params.skeleton)?;

        let image = Tensor::from_array(frame.pixels.as_standard_layout().into_owned())?;
        let fov = Tensor::from_array(Array1::from_elem(1, params.default_fov_degrees))?;
        let batch = Tensor::from_array(Array1::from_elem(1, params.internal_batch_size as i64))?;
        let num_aug = Tensor::from_array(Array1::from_elem(1, params.num_aug as i64))?;
        let average_aug = Tensor::from_array(Array1::from_elem(1, params.average_aug))?;
        let threshold = Tensor::from_array(Array1::from_elem(1, params.detector_threshold))?;
        let iou = Tensor::from_array(Array1::from_elem(1, params.detector_nms_iou_threshold))?;
        let max_detections = Tensor::from_array(Array1::from_elem(1, params.max_detections as i64))?;
        let antialias = Tensor::from_array(Array1::from_elem(1, params.antialias_factor as i64))?;
        let suppress = Tensor::from_array(Array1::from_elem(1, params.suppress_implausible_poses))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "image" => image,
                "default_fov_degrees" => fov,
                "internal_batch_size" => batch,
                "num_aug" => num_aug,
                "average_aug" => average_aug,
                "detector_threshold" => threshold,
                "detector_nms_iou_threshold" => iou,
                "max_detections" => max_detections,
                "antialias_factor" => antialias,
                "suppress_implausible_poses" => suppress,
            ])
            .context("Inference failed")?;

        let boxes: ArrayViewD<f32> = outputs["boxes"]
            .try_extract_array()
            .context("Failed to extract boxes")?;
        let poses3d: ArrayViewD<f32> = outputs["poses3d"]
            .try_extract_array()
            .context("Failed to extract poses3d")?;
        let poses2d: ArrayViewD<f32> = outputs["poses2d"]
            .try_extract_array()
            .context("Failed to extract poses2d")?;

        let full = decode_outputs(boxes, poses3d, poses2d)?;
        select_skeleton(full, skeleton)
    }

    fn skeleton(&self, name: &str) -> Result<&Skeleton> {
        self.skeletons.get(name)
    }
}

/// Converts raw model outputs into per-person vectors, checking that shapes agree.
pub fn decode_outputs(
    boxes: ArrayViewD<f32>,
    poses3d: ArrayViewD<f32>,
    poses2d: ArrayViewD<f32>,
) -> Result<Detections> {
    let boxes = boxes
        .into_dimensionality::<Ix2>()
        .context("boxes must be N x 5")?;
    let poses3d = poses3d
        .into_dimensionality::<Ix3>()
        .context("poses3d must be N x J x 3")?;
    let poses2d = poses2d
        .into_dimensionality::<Ix3>()
        .context("poses2d must be N x J x 2")?;

    let n = boxes.nrows();
    if boxes.ncols() != 5 {
        bail!("boxes have {} columns, expected 5", boxes.ncols());
    }
    if poses3d.dim().0 != n || poses2d.dim().0 != n {
        bail!(
            "detection count mismatch: {} boxes, {} 3D poses, {} 2D poses",
            n,
            poses3d.dim().0,
            poses2d.dim().0
        );
    }
    if poses3d.dim().2 != 3 || poses2d.dim().2 != 2 {
        bail!("unexpected coordinate sizes: poses3d {:?}, poses2d {:?}", poses3d.dim(), poses2d.dim());
    }
    if poses3d.dim().1 != poses2d.dim().1 {
        bail!("joint count mismatch: {} in 3D, {} in 2D", poses3d.dim().1, poses2d.dim().1);
    }

    let boxes = boxes
        .outer_iter()
        .map(|b| [b[0], b[1], b[2], b[3], b[4]])
        .collect();
    let poses3d = poses3d
        .outer_iter()
        .map(|p| p.outer_iter().map(|j| [j[0], j[1], j[2]]).collect())
        .collect();
    let poses2d = poses2d
        .outer_iter()
        .map(|p| p.outer_iter().map(|j| [j[0], j[1]]).collect())
        .collect();

    Ok(Detections { boxes, poses3d, poses2d })
}

fn select_skeleton(full: Detections, skeleton: &Skeleton) -> Result<Detections> {
    let poses3d = full
        .poses3d
        .iter()
        .map(|p| skeleton.select(p))
        .collect::<Result<Vec<_>>>()?;
    let poses2d = full
        .poses2d
        .iter()
        .map(|p| skeleton.select(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(Detections { boxes: full.boxes, poses3d, poses2d })
}
