use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{Options, Overrides};
use crate::job::{run_job, JobReport};
use crate::model::PoseModel;

/// A jobs file:
///
/// ```toml
/// [defaults]
/// json = "true"
/// augmentations = 10
///
/// [[job]]
/// name = "walk"
/// video = "media/walk.webm"
/// skipms = 100
///
/// [[job]]
/// image = "media/pose.jpg"
/// skeleton = "smpl_24"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsFile {
    #[serde(default)]
    pub defaults: Overrides,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobEntry {
    pub name: Option<String>,
    pub overrides: Overrides,
}

impl<'de> Deserialize<'de> for JobEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut table = toml::Table::deserialize(deserializer)?;
        let name = match table.remove("name") {
            None => None,
            Some(toml::Value::String(s)) => Some(s),
            Some(other) => return Err(D::Error::custom(format!("job name must be a string, found {}", other.type_str()))),
        };
        let overrides = toml::Value::Table(table).try_into::<Overrides>().map_err(D::Error::custom)?;
        Ok(Self { name, overrides })
    }
}

impl JobsFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read jobs file {}", path.display()))?;
        let jobs: JobsFile = toml::from_str(&content)
            .with_context(|| format!("Invalid jobs file {}", path.display()))?;
        Ok(jobs)
    }

    /// Built-in defaults, then `[defaults]`, then the job's own keys.
    pub fn resolve(&self, entry: &JobEntry) -> Options {
        let mut options = Options::default();
        options.apply(&self.defaults);
        options.apply(&entry.overrides);
        options
    }
}

impl JobEntry {
    pub fn label(&self, options: &Options) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        options
            .input()
            .map(|i| i.path().to_string())
            .unwrap_or_else(|_| "<no input>".to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSettings {
    /// Skip jobs whose output JSON is already on disk
    pub skip_existing: bool,
    /// Log failures and carry on instead of stopping
    pub keep_going: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs every job in order. Each model directory is loaded once through
/// `load_model` and shared by all jobs that name it.
pub fn run_batch<M, F>(
    jobs: &JobsFile,
    settings: BatchSettings,
    interrupt: Arc<AtomicBool>,
    mut load_model: F,
) -> Result<BatchSummary>
where
    M: PoseModel,
    F: FnMut(&str) -> Result<M>,
{
    let mut models: HashMap<String, M> = HashMap::new();
    let mut summary = BatchSummary::default();
    let total = jobs.jobs.len();

    for (index, entry) in jobs.jobs.iter().enumerate() {
        if interrupt.load(Ordering::Relaxed) {
            log::warn!("aborted before job {} of {}", index + 1, total);
            break;
        }

        let options = jobs.resolve(entry);
        let label = entry.label(&options);
        log::info!("job {} of {}: {}", index + 1, total, label);
        log::debug!("options: {}", options.summary());

        let outcome = run_entry(&options, settings, &interrupt, &mut models, &mut load_model);
        match outcome {
            Ok(Some(report)) => {
                log::info!(
                    "job {} done: {} frames, {} detections in {:.1}sec",
                    label,
                    report.frames,
                    report.detections,
                    report.elapsed.as_secs_f32()
                );
                summary.done += 1;
            }
            Ok(None) => {
                summary.skipped += 1;
            }
            Err(e) if settings.keep_going => {
                log::error!("job {} failed: {:#}", label, e);
                summary.failed += 1;
            }
            Err(e) => return Err(e.context(format!("job {} failed", label))),
        }
    }

    log::info!(
        "batch finished: {} done, {} skipped, {} failed",
        summary.done,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

fn run_entry<M, F>(
    options: &Options,
    settings: BatchSettings,
    interrupt: &Arc<AtomicBool>,
    models: &mut HashMap<String, M>,
    load_model: &mut F,
) -> Result<Option<JobReport>>
where
    M: PoseModel,
    F: FnMut(&str) -> Result<M>,
{
    options.input()?;
    if settings.skip_existing {
        if let Some(output) = options.output_path()? {
            if output.exists() {
                log::info!("skipping, {} already exists", output.display());
                return Ok(None);
            }
        }
    }

    if !models.contains_key(&options.model) {
        let model = load_model(&options.model)?;
        models.insert(options.model.clone(), model);
    }
    let model = models
        .get_mut(&options.model)
        .context("model cache lost an entry")?;

    run_job(model, options, Arc::clone(interrupt)).map(Some)
}
