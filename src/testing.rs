//! Test doubles for the model and the video decoder.

use anyhow::{bail, Result};
use ndarray::Array3;
use opencv::core::{Mat, Scalar, Size, Vector, CV_8UC3};
use opencv::prelude::*;
use opencv::{imgcodecs, videoio};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::model::{DetectParams, Detections, PoseModel, Skeleton};
use crate::source::{Frame, FrameSource};

pub fn skeleton() -> Skeleton {
    Skeleton {
        joints: vec!["pelv".into(), "neck".into(), "head".into()],
        edges: vec![[0, 1], [1, 2]],
        indices: vec![0, 1, 2],
    }
}

pub fn blank_frame(width: usize, height: usize) -> Frame {
    Frame::new(Array3::zeros((height, width, 3)))
}

/// Writes an 8x6 grey PNG.
pub fn write_test_image(path: &Path) {
    let mat = Mat::new_rows_cols_with_default(6, 8, CV_8UC3, Scalar::all(128.0)).unwrap();
    let written = imgcodecs::imwrite(path.to_str().unwrap(), &mat, &Vector::new()).unwrap();
    assert!(written);
}

/// Writes a 64x48 MJPG clip; frame `i` is filled with grey level `20 * i`.
pub fn write_test_video(path: &Path, frames: usize, fps: f64) {
    let fourcc = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
    let mut writer =
        videoio::VideoWriter::new(path.to_str().unwrap(), fourcc, fps, Size::new(64, 48), true).unwrap();
    assert!(writer.is_opened().unwrap());
    for i in 0..frames {
        let level = (20 * i).min(255) as f64;
        let mat = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(level)).unwrap();
        writer.write(&mat).unwrap();
    }
    writer.release().unwrap();
}

/// Returns `people` detections per call; the n-th call puts the pelvis at depth `1000 + n`.
pub struct FakeModel {
    pub skeleton: Skeleton,
    pub people: usize,
    pub calls: Vec<(DetectParams, [u32; 2])>,
    pub fail_on_call: Option<usize>,
    /// Raises the flag while serving the given call, like a Ctrl-C mid-inference.
    pub interrupt_on_call: Option<(usize, Arc<AtomicBool>)>,
}

impl FakeModel {
    pub fn new(people: usize) -> Self {
        Self { skeleton: skeleton(), people, calls: Vec::new(), fail_on_call: None, interrupt_on_call: None }
    }
}

impl PoseModel for FakeModel {
    fn detect_poses(&mut self, frame: &Frame, params: &DetectParams) -> Result<Detections> {
        let call = self.calls.len();
        self.calls.push((params.clone(), frame.resolution()));
        if self.fail_on_call == Some(call) {
            bail!("model failure on call {}", call);
        }
        if let Some((on_call, flag)) = &self.interrupt_on_call {
            if *on_call == call {
                flag.store(true, Ordering::Relaxed);
            }
        }
        let joints = self.skeleton.joints.len();
        let mut detections = Detections::default();
        for person in 0..self.people {
            let offset = person as f32 * 100.0;
            detections.boxes.push([offset, 0.0, 50.0, 100.0, 0.9 - person as f32 * 0.1]);
            detections.poses3d.push(
                (0..joints)
                    .map(|j| [offset, -(j as f32) * 300.0, 1000.0 + call as f32])
                    .collect(),
            );
            detections.poses2d.push((0..joints).map(|j| [offset + 25.0, j as f32 * 30.0]).collect());
        }
        Ok(detections)
    }

    fn skeleton(&self, name: &str) -> Result<&Skeleton> {
        if name.is_empty() || name == "all" {
            Ok(&self.skeleton)
        } else {
            bail!("Unknown skeleton {:?}", name)
        }
    }
}

/// Constant-rate in-memory video. Seeking lands on the frame at or before the time.
pub struct MemorySource {
    frames: Vec<Frame>,
    fps: f64,
    next: usize,
    pub seeks: Vec<f64>,
}

impl MemorySource {
    pub fn new(count: usize, fps: f64) -> Self {
        Self { frames: (0..count).map(|_| blank_frame(8, 6)).collect(), fps, next: 0, seeks: Vec::new() }
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn resolution(&self) -> [u32; 2] {
        [8, 6]
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.next).cloned();
        if frame.is_some() {
            self.next += 1;
        }
        Ok(frame)
    }

    fn seek_ms(&mut self, ms: f64) -> Result<()> {
        self.seeks.push(ms);
        self.next = (ms * self.fps / 1000.0).floor() as usize;
        Ok(())
    }

    fn position_ms(&self) -> Result<f64> {
        Ok(self.next.saturating_sub(1) as f64 * 1000.0 / self.fps)
    }
}
