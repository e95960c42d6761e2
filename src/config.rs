use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

use crate::model::DetectParams;

/// Options for one processing run.
///
/// Serialized verbatim into the `options` key of the result JSON, so field
/// names are part of the output schema. Flags serialize as `0`/`1`.
#[derive(Debug, Clone, PartialEq, Parser, Serialize)]
#[command(name = "pose3d-runner", version = env!("GIT_VERSION"), about = "3D pose estimation over images and videos")]
pub struct Options {
    /// image file
    #[arg(long)]
    pub image: Option<String>,
    /// video file
    #[arg(long)]
    pub video: Option<String>,
    /// write results to json file (`true` writes next to the input)
    #[arg(long)]
    pub json: Option<String>,
    /// verbose logging
    #[arg(long, default_value_t = true, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub verbose: bool,
    /// model directory used for predictions
    #[arg(long, default_value_t = default_model())]
    pub model: String,
    /// skip time between frames in milliseconds
    #[arg(long, default_value_t = 0)]
    pub skipms: u64,
    /// plot output when processing image
    #[arg(long, default_value_t = false, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub plot: bool,
    /// field-of-view in degrees
    #[arg(long, default_value_t = default_fov())]
    pub fov: u32,
    /// process n detected boxes in parallel
    #[arg(long, default_value_t = default_batch())]
    pub batch: u32,
    /// limit processing to n people in the scene (-1 is unlimited)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub maxpeople: i32,
    /// use specific skeleton definition standard
    #[arg(long, default_value_t = String::new())]
    pub skeleton: String,
    /// how many variations of detection to run
    #[arg(long, default_value_t = default_augmentations())]
    pub augmentations: u32,
    /// run average on augmentation variations
    #[arg(long, default_value_t = true, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub average: bool,
    /// suppress implausible poses
    #[arg(long, default_value_t = true, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub suppress: bool,
    /// round coordinates
    #[arg(long, default_value_t = true, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub round: bool,
    /// minify json output
    #[arg(long, default_value_t = true, value_parser = parse_flag, action = ArgAction::Set)]
    #[serde(serialize_with = "flag_as_int")]
    pub minify: bool,
    /// minimum detection confidence
    #[arg(long, default_value_t = default_minconfidence())]
    pub minconfidence: f32,
    /// iou threshold for overlaps (0 is any overlap, 1 ignores overlap)
    #[arg(long, default_value_t = default_iou())]
    pub iou: f32,
}

fn default_model() -> String { "models/small".to_string() }
fn default_fov() -> u32 { 55 }
fn default_batch() -> u32 { 64 }
fn default_augmentations() -> u32 { 6 }
fn default_minconfidence() -> f32 { 0.1 }
fn default_iou() -> f32 { 0.7 }

impl Default for Options {
    fn default() -> Self {
        Self {
            image: None,
            video: None,
            json: None,
            verbose: true,
            model: default_model(),
            skipms: 0,
            plot: false,
            fov: default_fov(),
            batch: default_batch(),
            maxpeople: -1,
            skeleton: String::new(),
            augmentations: default_augmentations(),
            average: true,
            suppress: true,
            round: true,
            minify: true,
            minconfidence: default_minconfidence(),
            iou: default_iou(),
        }
    }
}

/// What a run reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Image(String),
    Video(String),
}

impl Input {
    pub fn path(&self) -> &str {
        match self {
            Input::Image(p) | Input::Video(p) => p,
        }
    }
}

impl Options {
    /// Image takes precedence when both are given.
    pub fn input(&self) -> Result<Input> {
        match (&self.image, &self.video) {
            (Some(image), _) => Ok(Input::Image(image.clone())),
            (None, Some(video)) => Ok(Input::Video(video.clone())),
            (None, None) => bail!("image or video not specified"),
        }
    }

    /// Where results go, if anywhere. `--json true` writes `<input>.json`.
    pub fn output_path(&self) -> Result<Option<PathBuf>> {
        match self.json.as_deref() {
            None => Ok(None),
            Some("true") => Ok(Some(PathBuf::from(format!("{}.json", self.input()?.path())))),
            Some(path) => Ok(Some(PathBuf::from(path))),
        }
    }

    pub fn detect_params(&self) -> DetectParams {
        DetectParams {
            default_fov_degrees: self.fov as f32,
            internal_batch_size: self.batch,
            num_aug: self.augmentations,
            average_aug: self.average,
            skeleton: self.skeleton.clone(),
            detector_threshold: self.minconfidence,
            detector_nms_iou_threshold: self.iou,
            max_detections: self.maxpeople,
            antialias_factor: 1,
            suppress_implausible_poses: self.suppress,
        }
    }

    /// Single-line `key:value` listing for the startup banner.
    pub fn summary(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        json.replace('"', "")
            .replace(['{', '}'], "")
            .replace(": ", ":")
            .replace(',', " ")
    }

    /// Replaces every field that the overrides set.
    pub fn apply(&mut self, o: &Overrides) {
        if let Some(v) = &o.image { self.image = Some(v.clone()); }
        if let Some(v) = &o.video { self.video = Some(v.clone()); }
        if let Some(v) = &o.json { self.json = Some(v.clone()); }
        if let Some(v) = o.verbose { self.verbose = v; }
        if let Some(v) = &o.model { self.model = v.clone(); }
        if let Some(v) = o.skipms { self.skipms = v; }
        if let Some(v) = o.plot { self.plot = v; }
        if let Some(v) = o.fov { self.fov = v; }
        if let Some(v) = o.batch { self.batch = v; }
        if let Some(v) = o.maxpeople { self.maxpeople = v; }
        if let Some(v) = &o.skeleton { self.skeleton = v.clone(); }
        if let Some(v) = o.augmentations { self.augmentations = v; }
        if let Some(v) = o.average { self.average = v; }
        if let Some(v) = o.suppress { self.suppress = v; }
        if let Some(v) = o.round { self.round = v; }
        if let Some(v) = o.minify { self.minify = v; }
        if let Some(v) = o.minconfidence { self.minconfidence = v; }
        if let Some(v) = o.iou { self.iou = v; }
    }
}

/// Partial options, as found in jobs files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub skipms: Option<u64>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub plot: Option<bool>,
    #[serde(default)]
    pub fov: Option<u32>,
    #[serde(default)]
    pub batch: Option<u32>,
    #[serde(default)]
    pub maxpeople: Option<i32>,
    #[serde(default)]
    pub skeleton: Option<String>,
    #[serde(default)]
    pub augmentations: Option<u32>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub average: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub suppress: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub round: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub minify: Option<bool>,
    #[serde(default)]
    pub minconfidence: Option<f32>,
    #[serde(default)]
    pub iou: Option<f32>,
}

/// Truth values in the `strtobool` sense: y/yes/t/true/on/1 and n/no/f/false/off/0.
pub fn parse_flag(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(anyhow!("invalid truth value {:?}", other)),
    }
}

fn flag_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn opt_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<FlagValue>::deserialize(deserializer)?;
    value
        .map(|v| match v {
            FlagValue::Bool(b) => Ok(b),
            FlagValue::Int(0) => Ok(false),
            FlagValue::Int(1) => Ok(true),
            FlagValue::Int(n) => Err(serde::de::Error::custom(format!("invalid truth value {}", n))),
            FlagValue::Text(s) => parse_flag(&s).map_err(serde::de::Error::custom),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        for t in ["1", "true", "Yes", "on", "t", "y"] {
            assert!(parse_flag(t).unwrap(), "{}", t);
        }
        for f in ["0", "false", "NO", "off", "f", "n"] {
            assert!(!parse_flag(f).unwrap(), "{}", f);
        }
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_cli_defaults_match_default() {
        let parsed = Options::try_parse_from(["pose3d-runner"]).unwrap();
        assert_eq!(parsed, Options::default());
    }

    #[test]
    fn test_cli_flags_and_negative_numbers() {
        let parsed = Options::try_parse_from([
            "pose3d-runner", "--video", "clip.mp4", "--plot", "1", "--round", "false",
            "--maxpeople", "-1", "--skipms", "100", "--skeleton", "smpl+head_30",
        ])
        .unwrap();
        assert_eq!(parsed.video.as_deref(), Some("clip.mp4"));
        assert!(parsed.plot);
        assert!(!parsed.round);
        assert_eq!(parsed.maxpeople, -1);
        assert_eq!(parsed.skipms, 100);
        assert_eq!(parsed.skeleton, "smpl+head_30");
    }

    #[test]
    fn test_input_requires_image_or_video() {
        let options = Options::default();
        let err = options.input().unwrap_err();
        assert_eq!(err.to_string(), "image or video not specified");

        let options = Options {
            image: Some("a.jpg".into()),
            video: Some("b.mp4".into()),
            ..Options::default()
        };
        assert_eq!(options.input().unwrap(), Input::Image("a.jpg".into()));
    }

    #[test]
    fn test_output_path() {
        let mut options = Options { video: Some("media/clip.webm".into()), ..Options::default() };
        assert_eq!(options.output_path().unwrap(), None);

        options.json = Some("true".into());
        assert_eq!(options.output_path().unwrap(), Some(PathBuf::from("media/clip.webm.json")));

        options.json = Some("out/result.json".into());
        assert_eq!(options.output_path().unwrap(), Some(PathBuf::from("out/result.json")));
    }

    #[test]
    fn test_flags_serialize_as_integers() {
        let value = serde_json::to_value(Options::default()).unwrap();
        assert_eq!(value["average"], 1);
        assert_eq!(value["plot"], 0);
        assert_eq!(value["image"], serde_json::Value::Null);
        assert_eq!(value["fov"], 55);
    }

    #[test]
    fn test_summary_is_single_line() {
        let options = Options { image: Some("a.jpg".into()), ..Options::default() };
        let summary = options.summary();
        assert!(summary.starts_with("image:a.jpg video:null json:null verbose:1"));
        assert!(!summary.contains('"'));
        assert!(!summary.contains('{'));
        assert!(!summary.contains('\n'));
    }

    #[test]
    fn test_apply_overrides() {
        let overrides: Overrides = toml::from_str(
            r#"
            video = "clip.mp4"
            augmentations = 10
            average = 0
            suppress = "no"
            round = false
            "#,
        )
        .unwrap();
        let mut options = Options::default();
        options.apply(&overrides);
        assert_eq!(options.video.as_deref(), Some("clip.mp4"));
        assert_eq!(options.augmentations, 10);
        assert!(!options.average);
        assert!(!options.suppress);
        assert!(!options.round);
        // untouched
        assert_eq!(options.fov, 55);
        assert!(options.minify);
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        let result: Result<Overrides, _> = toml::from_str("augmentatons = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_params() {
        let options = Options { fov: 40, maxpeople: 3, ..Options::default() };
        let params = options.detect_params();
        assert_eq!(params.default_fov_degrees, 40.0);
        assert_eq!(params.max_detections, 3);
        assert_eq!(params.antialias_factor, 1);
        assert!(params.average_aug);
    }
}
