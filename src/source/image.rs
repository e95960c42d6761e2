use anyhow::{bail, Context, Result};
use ndarray::Array3;
use opencv::{
    core::{Mat, CV_8UC3},
    imgcodecs, imgproc,
    prelude::*,
};
use std::path::Path;

use super::Frame;

/// Decodes an image file into an RGB frame.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();
    let name = path.to_str().context("Image path is not valid UTF-8")?;
    let bgr = imgcodecs::imread(name, imgcodecs::IMREAD_COLOR)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    if bgr.empty() {
        bail!("Could not decode image {}", path.display());
    }
    bgr_to_frame(&bgr)
}

/// BGR Mat (as decoded by OpenCV) -> RGB frame
pub(crate) fn bgr_to_frame(bgr: &Mat) -> Result<Frame> {
    if bgr.typ() != CV_8UC3 {
        bail!("Unsupported pixel format {}, expected 8-bit BGR", bgr.typ());
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };

    let height = rgb.rows() as usize;
    let width = rgb.cols() as usize;
    let data = rgb.data_bytes()?;
    let pixels = Array3::from_shape_vec((height, width, 3), data.to_vec())
        .context("Frame buffer does not match its dimensions")?;

    Ok(Frame::new(pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Vector};

    #[test]
    fn test_load_image_is_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blue.png");
        // BGR order: pure blue
        let blue = Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0)).unwrap();
        assert!(imgcodecs::imwrite(path.to_str().unwrap(), &blue, &Vector::new()).unwrap());

        let frame = load_image(&path).unwrap();
        assert_eq!(frame.resolution(), [6, 4]);
        assert_eq!(frame.pixels[[0, 0, 0]], 0);
        assert_eq!(frame.pixels[[0, 0, 1]], 0);
        assert_eq!(frame.pixels[[0, 0, 2]], 255);
        assert_eq!(frame.rgb(5, 3), 0x0000ff);
    }

    #[test]
    fn test_undecodable_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(load_image(&path).is_err());
    }
}
