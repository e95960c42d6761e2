//! Process-level setup shared by the binaries.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const VERSION: &str = env!("GIT_VERSION");

/// `RUST_LOG` wins; otherwise `debug` when verbose, `info` when not.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

/// Flag raised by Ctrl-C. Checked after the model load, between frames and
/// between jobs; whoever sees it first reports the abort.
pub fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl-C handler")?;
    Ok(flag)
}
