use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Input, Options};
use crate::model::{Detections, PoseModel, Skeleton};
use crate::results::Results;
use crate::runner::Runner;
use crate::source::{load_image, Frame, FrameSource, VideoFile};

/// Outcome of one completed run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub input: Input,
    pub output: Option<PathBuf>,
    pub frames: usize,
    /// Boxes summed over all frames
    pub detections: usize,
    pub elapsed: Duration,
}

/// Processes the image or video named in `options` and writes the JSON if asked to.
///
/// Fails without touching the model when the interrupt is already raised. An
/// interrupt during a video keeps the frames processed so far.
pub fn run_job<M: PoseModel + ?Sized>(model: &mut M, options: &Options, interrupt: Arc<AtomicBool>) -> Result<JobReport> {
    let input = options.input()?;
    let output = options.output_path()?;
    if interrupt.load(Ordering::Relaxed) {
        bail!("aborted before processing {}", input.path());
    }
    let t0 = Instant::now();

    let results = match &input {
        Input::Image(path) => {
            let frame = load_image(path)?;
            log::info!("loaded image: {} resolution: {} x {}", path, frame.width(), frame.height());
            let mut runner = Runner::new(&mut *model, options, Arc::clone(&interrupt));
            let (results, detections) = runner.process_image(&frame)?;
            if options.plot && !interrupt.load(Ordering::Relaxed) {
                let skeleton = model.skeleton(&options.skeleton)?;
                plot(&frame, &detections, skeleton)?;
            }
            results
        }
        Input::Video(path) => {
            let mut source = VideoFile::open(path)?;
            let [w, h] = source.resolution();
            log::info!("loaded video: {} frames: {} resolution: {} x {}", path, source.frame_count(), w, h);
            if options.plot {
                log::debug!("plot is only available for images");
            }
            let mut runner = Runner::new(&mut *model, options, interrupt);
            runner.process_video(&mut source)?
        }
    };

    if let Some(path) = &output {
        write_results(&results, path, options.minify)?;
    }

    Ok(JobReport {
        input,
        output,
        frames: results.frames,
        detections: results.boxes.iter().map(Vec::len).sum(),
        elapsed: t0.elapsed(),
    })
}

pub fn write_results(results: &Results, path: &Path, minify: bool) -> Result<()> {
    results.write(path, minify)?;
    log::info!("results written to: {}", path.display());
    Ok(())
}

#[cfg(feature = "desktop")]
fn plot(frame: &Frame, detections: &Detections, skeleton: &Skeleton) -> Result<()> {
    use crate::render::{render_figure, PlotWindow, FIGURE_HEIGHT, FIGURE_WIDTH};

    log::info!("visualize: close the window or press Escape to continue");
    let canvas = render_figure(frame, detections, skeleton);
    let mut window = PlotWindow::new("pose3d-runner", FIGURE_WIDTH, FIGURE_HEIGHT)?;
    window.show(&canvas)
}

#[cfg(not(feature = "desktop"))]
fn plot(_frame: &Frame, _detections: &Detections, _skeleton: &Skeleton) -> Result<()> {
    log::warn!("plot requested but this build has no desktop support");
    Ok(())
}
