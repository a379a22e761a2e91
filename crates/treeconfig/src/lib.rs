use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

/// Slowest supported pattern or output pace.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TreeConfig {
    pub version: u32,
    #[serde(default)]
    pub tree: TreeSection,
    #[serde(default)]
    pub patterns: PatternsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TreeSection {
    #[serde(default = "default_tree_file")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternsSection {
    #[serde(default = "default_pattern_dir")]
    pub directory: PathBuf,
    /// Pattern started before the first frame.
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Frames per second handed to self-pacing patterns.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(
        default = "default_stop_warning",
        deserialize_with = "deserialize_duration"
    )]
    pub stop_warning: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Null,
    Jsonl,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Null => "null",
            OutputKind::Jsonl => "jsonl",
        }
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "null" | "none" => Ok(OutputKind::Null),
            "jsonl" | "json" => Ok(OutputKind::Jsonl),
            other => Err(format!(
                "unknown output '{other}'; expected 'null' or 'jsonl'"
            )),
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSection {
    #[serde(default)]
    pub kind: OutputKind,
    /// Frames per second the output consumes; 0 disables pacing.
    #[serde(default = "default_frame_rate")]
    pub fps: f32,
    /// File the `jsonl` output writes to instead of stdout.
    #[serde(default)]
    pub dump: Option<PathBuf>,
}

fn default_tree_file() -> PathBuf {
    PathBuf::from("tree.csv")
}

fn default_pattern_dir() -> PathBuf {
    PathBuf::from("patterns")
}

fn default_queue_capacity() -> usize {
    2
}

fn default_frame_rate() -> f32 {
    45.0
}

fn default_stop_warning() -> Duration {
    Duration::from_secs(2)
}

impl Default for TreeSection {
    fn default() -> Self {
        Self {
            file: default_tree_file(),
        }
    }
}

impl Default for PatternsSection {
    fn default() -> Self {
        Self {
            directory: default_pattern_dir(),
            default: None,
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            frame_rate: default_frame_rate(),
            stop_warning: default_stop_warning(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            kind: OutputKind::default(),
            fps: default_frame_rate(),
            dump: None,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            tree: TreeSection::default(),
            patterns: PatternsSection::default(),
            pipeline: PipelineSection::default(),
            output: OutputSection::default(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl TreeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: TreeConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Delay between frames of a self-pacing pattern.
    pub fn frame_interval(&self) -> Duration {
        rate_interval(self.pipeline.frame_rate).unwrap_or(MAX_FRAME_INTERVAL)
    }

    /// Output pacing; `None` when the output should run unthrottled.
    pub fn output_fps(&self) -> Option<f32> {
        if self.output.fps > 0.0 {
            Some(self.output.fps)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.tree.file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("tree.file may not be empty".into()));
        }

        if let Some(name) = &self.patterns.default {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "patterns.default may not be empty".into(),
                ));
            }
        }

        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.queue_capacity must be at least 1".into(),
            ));
        }

        let rate = self.pipeline.frame_rate;
        if rate_interval(rate).is_none() {
            return Err(ConfigError::Invalid(format!(
                "pipeline.frame_rate must be at least one frame per hour (got {rate})"
            )));
        }

        if self.pipeline.stop_warning.is_zero() {
            return Err(ConfigError::Invalid(
                "pipeline.stop_warning must be greater than zero".into(),
            ));
        }

        let fps = self.output.fps;
        if fps != 0.0 && rate_interval(fps).is_none() {
            return Err(ConfigError::Invalid(format!(
                "output.fps must be 0 or at least one frame per hour (got {fps})"
            )));
        }

        if self.output.dump.is_some() && self.output.kind != OutputKind::Jsonl {
            return Err(ConfigError::Invalid(
                "output.dump requires output.kind = \"jsonl\"".into(),
            ));
        }

        Ok(())
    }
}

/// `None` unless `rate` is positive and its period fits `MAX_FRAME_INTERVAL`.
fn rate_interval(rate: f32) -> Option<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f32(1.0 / rate)
        .ok()
        .filter(|interval| *interval <= MAX_FRAME_INTERVAL)
}
