//! Lists the skeleton standards a model directory provides.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use pose3d_runner::app::init_logging;
use pose3d_runner::model::OnnxPoseModel;

#[derive(Parser)]
#[command(about = "Show the skeletons available in a pose model")]
struct Opts {
    /// model directory or .onnx file
    #[arg(default_value = "models/small")]
    model: PathBuf,
    /// also print joint names and edges
    #[arg(long)]
    joints: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(false);

    let model = OnnxPoseModel::load(&opts.model)?;
    println!("model: {}", model.path().display());
    for (name, skeleton) in model.skeletons().iter() {
        println!("  {:<24} joints: {:>4}  edges: {:>4}", name, skeleton.joints.len(), skeleton.edges.len());
        if opts.joints {
            println!("    joints: {}", skeleton.joints.join(", "));
            let edges: Vec<String> = skeleton
                .edges
                .iter()
                .map(|[a, b]| format!("{}-{}", skeleton.joints[*a], skeleton.joints[*b]))
                .collect();
            println!("    edges:  {}", edges.join(", "));
        }
    }
    Ok(())
}
