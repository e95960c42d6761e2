use anyhow::Result;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Options;
use crate::model::{DetectParams, Detections, PoseModel};
use crate::results::Results;
use crate::source::{Frame, FrameSource};

/// In-place progress line for video processing.
pub struct Progress {
    start: Instant,
    total: u64,
}

impl Progress {
    pub fn start(total: u64) -> Self {
        Self { start: Instant::now(), total }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn line(&self, frame: u64, timestamp: f64, took: Duration) -> String {
        format_progress(frame, self.total, timestamp, took.as_secs_f64(), self.elapsed().as_secs_f64())
    }
}

/// `frame` is 1-based. The estimate extrapolates the average time per frame to `total`.
pub fn format_progress(frame: u64, total: u64, timestamp: f64, took_secs: f64, elapsed_secs: f64) -> String {
    let total = total.max(frame).max(1);
    let frame_div = frame.max(1) as f64;
    let percent = 100.0 * frame as f64 / total as f64;
    let estimate = elapsed_secs / frame_div * total as f64;
    format!(
        "process: frame: {} of {} timestamp: {:.0} time: {:.3}sec progress: {:.0}% estimate: {:.0}sec",
        frame, total, timestamp, took_secs, percent, estimate
    )
}

/// Drives a pose model over frames and accumulates what it finds.
pub struct Runner<'a, M: PoseModel + ?Sized> {
    model: &'a mut M,
    options: &'a Options,
    params: DetectParams,
    interrupt: Arc<AtomicBool>,
}

impl<'a, M: PoseModel + ?Sized> Runner<'a, M> {
    pub fn new(model: &'a mut M, options: &'a Options, interrupt: Arc<AtomicBool>) -> Self {
        let params = options.detect_params();
        Self { model, options, params, interrupt }
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// One model call, recorded into `results`.
    pub fn predict(&mut self, frame: &Frame, timestamp: f64, results: &mut Results) -> Result<(Detections, Duration)> {
        let t0 = Instant::now();
        let detections = self.model.detect_poses(frame, &self.params)?;
        let took = t0.elapsed();
        let skeleton = self.model.skeleton(&self.params.skeleton)?;
        results.record(frame.resolution(), timestamp, &detections, skeleton);
        Ok((detections, took))
    }

    pub fn process_image(&mut self, frame: &Frame) -> Result<(Results, Detections)> {
        let mut results = Results::new(self.options.clone());
        let t0 = Instant::now();
        let (detections, _) = self.predict(frame, 0.0, &mut results)?;
        log::info!("processed image in {:.1}sec", t0.elapsed().as_secs_f32());
        log::info!(
            "detected poses: {} confidences: {}",
            detections.len(),
            detections.confidence_summary().trim_end()
        );

        Ok((results, detections))
    }

    /// Reads frames until the stream ends or an interrupt arrives. An interrupt
    /// raised during a frame lets that frame finish and be recorded.
    ///
    /// With `skipms` set, seeks to `count * skipms` before every read.
    pub fn process_video<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<Results> {
        let mut results = Results::new(self.options.clone());
        let skipms = self.options.skipms;
        let progress = Progress::start(source.frame_count());
        let mut count: u64 = 0;
        let mut progress_shown = false;

        loop {
            if self.interrupted() {
                if progress_shown {
                    println!();
                }
                progress_shown = false;
                log::warn!("aborted...");
                break;
            }
            if skipms > 0 {
                source.seek_ms((count * skipms) as f64)?;
            }
            let Some(frame) = source.read()? else {
                break;
            };
            count += 1;

            let timestamp = source.position_ms()?;
            let (_, took) = self.predict(&frame, timestamp, &mut results)?;

            if self.options.verbose {
                print!("\r{}", progress.line(count, timestamp, took));
                io::stdout().flush()?;
                progress_shown = true;
            }
        }

        if progress_shown {
            println!();
        }
        log::info!("processed video: {} frames in {:.1}sec", count, progress.elapsed().as_secs_f32());
        Ok(results)
    }
}
