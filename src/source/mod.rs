pub mod image;
pub mod video;

use anyhow::Result;
use ndarray::Array3;

pub use image::load_image;
pub use video::VideoFile;

/// One decoded RGB frame, `height x width x 3`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pixels: Array3<u8>,
}

impl Frame {
    pub fn new(pixels: Array3<u8>) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.dim().1 as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.dim().0 as u32
    }

    /// `[width, height]`
    pub fn resolution(&self) -> [u32; 2] {
        [self.width(), self.height()]
    }

    /// Pixel as `0xRRGGBB`.
    pub fn rgb(&self, x: usize, y: usize) -> u32 {
        let r = self.pixels[[y, x, 0]] as u32;
        let g = self.pixels[[y, x, 1]] as u32;
        let b = self.pixels[[y, x, 2]] as u32;
        (r << 16) | (g << 8) | b
    }
}

/// Sequential access to the frames of a video.
pub trait FrameSource {
    /// Frame count reported by the container, may be an estimate.
    fn frame_count(&self) -> u64;

    /// `[width, height]`
    fn resolution(&self) -> [u32; 2];

    /// Next frame, or `None` at the end of the stream.
    fn read(&mut self) -> Result<Option<Frame>>;

    fn seek_ms(&mut self, ms: f64) -> Result<()>;

    /// Timestamp of the current position in milliseconds.
    fn position_ms(&self) -> Result<f64>;
}
