use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::Options;
use crate::model::{Detections, Skeleton};

/// 3D poses of one frame, person x joint x xyz.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FramePoses {
    Exact(Vec<Vec<[f32; 3]>>),
    Rounded(Vec<Vec<[i16; 3]>>),
}

impl FramePoses {
    pub fn len(&self) -> usize {
        match self {
            FramePoses::Exact(p) => p.len(),
            FramePoses::Rounded(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rounds half to even; values outside the i16 range saturate.
pub fn round_poses(poses: &[Vec<[f32; 3]>]) -> Vec<Vec<[i16; 3]>> {
    poses
        .iter()
        .map(|pose| {
            pose.iter()
                .map(|p| p.map(|v| v.round_ties_even() as i16))
                .collect()
        })
        .collect()
}

/// Everything written to the output JSON.
///
/// `boxes`, `poses` and `timestamps` grow together, one entry per
/// processed frame; `frames` always equals their length.
#[derive(Debug, Clone, Serialize)]
pub struct Results {
    pub options: Options,
    /// `[width, height]`
    pub resolution: [u32; 2],
    pub frames: usize,
    pub boxes: Vec<Vec<[f32; 5]>>,
    pub poses: Vec<FramePoses>,
    pub joints: Option<Vec<String>>,
    pub edges: Option<Vec<[usize; 2]>>,
    /// milliseconds
    pub timestamps: Vec<f64>,
}

impl Results {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            resolution: [0, 0],
            frames: 0,
            boxes: Vec::new(),
            poses: Vec::new(),
            joints: None,
            edges: None,
            timestamps: Vec::new(),
        }
    }

    pub fn record(&mut self, resolution: [u32; 2], timestamp: f64, detections: &Detections, skeleton: &Skeleton) {
        self.resolution = resolution;
        self.timestamps.push(timestamp);
        self.boxes.push(detections.boxes.clone());
        let poses = if self.options.round {
            FramePoses::Rounded(round_poses(&detections.poses3d))
        } else {
            FramePoses::Exact(detections.poses3d.clone())
        };
        self.poses.push(poses);
        if self.joints.is_none() {
            self.joints = Some(skeleton.joints.clone());
            self.edges = Some(skeleton.edges.clone());
        }
        self.frames = self.timestamps.len();
    }

    pub fn to_json(&self, minify: bool) -> Result<String> {
        let json = if minify {
            serde_json::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        Ok(json)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P, minify: bool) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json(minify)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }
        fs::write(path, json).with_context(|| format!("Failed to write results to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> Skeleton {
        Skeleton {
            joints: vec!["pelv".into(), "neck".into()],
            edges: vec![[0, 1]],
            indices: vec![0, 1],
        }
    }

    fn detections() -> Detections {
        Detections {
            boxes: vec![[10.0, 20.0, 30.0, 40.0, 0.95]],
            poses3d: vec![vec![[1.4, -2.5, 2999.6], [40000.0, 0.0, -0.4]]],
            poses2d: vec![vec![[5.0, 6.0], [7.0, 8.0]]],
        }
    }

    #[test]
    fn test_round_poses() {
        let rounded = round_poses(&detections().poses3d);
        assert_eq!(rounded, vec![vec![[1, -2, 3000], [i16::MAX, 0, 0]]]);
    }

    #[test]
    fn test_round_poses_ties_go_to_even() {
        let rounded = round_poses(&[vec![[0.5, 2.5, -2.5], [1.5, -0.5, 3.5]]]);
        assert_eq!(rounded, vec![vec![[0, 2, -2], [2, 0, 4]]]);
    }

    #[test]
    fn test_record_keeps_lengths_in_step() {
        let mut results = Results::new(Options::default());
        results.record([640, 480], 0.0, &detections(), &skeleton());
        results.record([640, 480], 33.3, &Detections::default(), &skeleton());

        assert_eq!(results.frames, 2);
        assert_eq!(results.boxes.len(), 2);
        assert_eq!(results.poses.len(), 2);
        assert_eq!(results.timestamps, vec![0.0, 33.3]);
        assert!(results.poses[1].is_empty());
        assert_eq!(results.resolution, [640, 480]);
        assert_eq!(results.joints.as_deref(), Some(&["pelv".to_string(), "neck".to_string()][..]));
    }

    #[test]
    fn test_schema_keys() {
        let mut results = Results::new(Options::default());
        results.record([4, 2], 0.0, &detections(), &skeleton());
        let value: serde_json::Value = serde_json::from_str(&results.to_json(true).unwrap()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["options", "resolution", "frames", "boxes", "poses", "joints", "edges", "timestamps"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert_eq!(keys.len(), 8);
        assert_eq!(value["poses"][0][0][0], serde_json::json!([1, -3, 3000]));
        assert_eq!(value["edges"], serde_json::json!([[0, 1]]));
        assert_eq!(value["options"]["round"], 1);
    }

    #[test]
    fn test_unrounded_poses_keep_fractions() {
        let options = Options { round: false, ..Options::default() };
        let mut results = Results::new(options);
        results.record([4, 2], 0.0, &detections(), &skeleton());
        let value: serde_json::Value = serde_json::from_str(&results.to_json(true).unwrap()).unwrap();
        let x = value["poses"][0][0][0][0].as_f64().unwrap();
        assert!((x - 1.4).abs() < 1e-4);
    }

    #[test]
    fn test_empty_results_have_null_skeleton() {
        let results = Results::new(Options::default());
        let value: serde_json::Value = serde_json::from_str(&results.to_json(true).unwrap()).unwrap();
        assert!(value["joints"].is_null());
        assert!(value["edges"].is_null());
        assert_eq!(value["frames"], 0);
    }

    #[test]
    fn test_minify_and_pretty() {
        let results = Results::new(Options::default());
        let compact = results.to_json(true).unwrap();
        let pretty = results.to_json(false).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains("\n  \"resolution\""));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("result.json");
        let results = Results::new(Options::default());
        results.write(&path, true).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"options\":"));
    }
}
