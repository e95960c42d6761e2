use anyhow::{bail, Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;

use super::image::bgr_to_frame;
use super::{Frame, FrameSource};

/// Video file decoded through OpenCV.
pub struct VideoFile {
    capture: VideoCapture,
    frame_count: u64,
    width: u32,
    height: u32,
    seek_refused: bool,
}

impl VideoFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_str().context("Video path is not valid UTF-8")?;
        let capture = VideoCapture::from_file(name, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            bail!("Video {} could not be opened", path.display());
        }

        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        Ok(Self { capture, frame_count, width, height, seek_refused: false })
    }

    /// True once the backend has rejected a seek.
    pub fn seek_refused(&self) -> bool {
        self.seek_refused
    }

    fn note_seek(&mut self, accepted: bool, ms: f64) {
        if !accepted && !self.seek_refused {
            log::warn!("video backend refused to seek to {:.0}ms, frames will not be skipped", ms);
            self.seek_refused = true;
        }
    }
}

impl FrameSource for VideoFile {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn resolution(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let mut frame = Mat::default();
        let ok = self.capture.read(&mut frame).context("Failed to read frame")?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        bgr_to_frame(&frame).map(Some)
    }

    fn seek_ms(&mut self, ms: f64) -> Result<()> {
        let accepted = self
            .capture
            .set(videoio::CAP_PROP_POS_MSEC, ms)
            .context("Failed to seek video")?;
        self.note_seek(accepted, ms);
        Ok(())
    }

    fn position_ms(&self) -> Result<f64> {
        Ok(self.capture.get(videoio::CAP_PROP_POS_MSEC)?)
    }
}
