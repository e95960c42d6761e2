//! Reprocesses a list of inputs described by a TOML jobs file.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use pose3d_runner::app::{init_logging, interrupt_flag, VERSION};
use pose3d_runner::batch::{run_batch, BatchSettings, JobsFile};
use pose3d_runner::model::OnnxPoseModel;

#[derive(Parser)]
#[command(version = VERSION, about = "Run pose3d-runner jobs from a TOML file")]
struct Opts {
    /// jobs file
    jobs: PathBuf,
    /// skip jobs whose output json already exists
    #[arg(long)]
    skip_existing: bool,
    /// continue with the next job after a failure
    #[arg(long)]
    keep_going: bool,
    /// verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(opts.verbose);
    let interrupt = interrupt_flag()?;

    let jobs = JobsFile::load(&opts.jobs)?;
    log::info!("batch ({}): {} jobs from {}", VERSION, jobs.jobs.len(), opts.jobs.display());

    let settings = BatchSettings {
        skip_existing: opts.skip_existing,
        keep_going: opts.keep_going,
    };
    let summary = run_batch(&jobs, settings, interrupt, |model: &str| OnnxPoseModel::load(model))?;

    if summary.failed > 0 {
        bail!("{} of {} jobs failed", summary.failed, jobs.jobs.len());
    }
    Ok(())
}
