use anyhow::Result;
use clap::Parser;
use std::sync::atomic::Ordering;

use pose3d_runner::app::{init_logging, interrupt_flag, VERSION};
use pose3d_runner::config::Options;
use pose3d_runner::job::run_job;
use pose3d_runner::model::OnnxPoseModel;

fn main() -> Result<()> {
    let options = Options::parse();
    init_logging(options.verbose);
    let interrupt = interrupt_flag()?;

    log::info!("pose3d-runner ({})", VERSION);
    log::info!("options: {}", options.summary());

    // fail on a missing input before paying for the model load
    options.input()?;

    let mut model = OnnxPoseModel::load(&options.model)?;
    if interrupt.load(Ordering::Relaxed) {
        log::warn!("aborted...");
        return Ok(());
    }
    let report = run_job(&mut model, &options, interrupt)?;

    log::info!(
        "done: {} frames, {} detections in {:.1}sec",
        report.frames,
        report.detections,
        report.elapsed.as_secs_f32()
    );
    Ok(())
}
