use anyhow::{Context, Result};
use fpa_lib::{io::recording::RecordingLayout, AnalysisConfig, ChannelOrder, Subject};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Batch run description read by `fpa run`.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub recording: RecordingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "behavior")]
    pub behaviors: Vec<BehaviorConfig>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    pub path: PathBuf,
    /// Single-byte field separator; whitespace when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default = "default_subject")]
    pub subject: u8,
    #[serde(default)]
    pub channels: ChannelOrder,
    #[serde(default)]
    pub layout: RecordingLayout,
    /// Pre-normalized green signal. Without one the green channel is normalized by an
    /// exponential fit.
    #[serde(default)]
    pub normalized: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub results: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct BehaviorConfig {
    pub name: String,
    pub start: PathBuf,
    pub stop: PathBuf,
}

fn default_subject() -> u8 {
    1
}

impl RecordingConfig {
    pub fn subject(&self) -> Result<Subject> {
        Subject::from_number(self.subject)
            .with_context(|| format!("subject must be 1 or 2, got {}", self.subject))
    }
}

/// Read a run config. Relative paths are taken from the config file's directory.
pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut config: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

impl RunConfig {
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.recording.path);
        if let Some(p) = self.recording.normalized.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.output.results.as_mut() {
            resolve(p);
        }
        for behavior in &mut self.behaviors {
            resolve(&mut behavior.start);
            resolve(&mut behavior.stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpa_lib::{BaselineAnchor, EventTimeUnit};

    #[test]
    fn minimal_config_takes_defaults() {
        let config: RunConfig = toml::from_str("[recording]\npath = \"raw.txt\"\n").unwrap();
        assert_eq!(config.recording.subject().unwrap(), Subject::One);
        assert_eq!(config.recording.channels, ChannelOrder::STANDARD);
        assert_eq!(config.recording.layout, RecordingLayout::default());
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert!(config.behaviors.is_empty());
        assert!(config.output.results.is_none());
    }

    #[test]
    fn reads_behaviors_and_resolves_paths() {
        let text = r#"
[recording]
path = "raw.csv"
delimiter = ","
subject = 2

[analysis]
baseline_samples = 120
baseline_anchor = "start"
event_unit = "minutes"

[output]
results = "/tmp/results.txt"

[[behavior]]
name = "push"
start = "push_start.txt"
stop = "push_stop.txt"

[[behavior]]
name = "rear"
start = "rear_start.txt"
stop = "rear_stop.txt"
"#;
        let mut config: RunConfig = toml::from_str(text).unwrap();
        config.resolve_paths(Path::new("/data/run"));
        assert_eq!(config.recording.delimiter, Some(','));
        assert_eq!(config.recording.subject().unwrap(), Subject::Two);
        assert_eq!(config.analysis.baseline_samples, 120);
        assert_eq!(config.analysis.baseline_anchor, BaselineAnchor::Start);
        assert_eq!(config.analysis.event_unit, EventTimeUnit::Minutes);
        assert_eq!(config.analysis.sample_rate_hz, 60.0);
        assert_eq!(config.recording.path, Path::new("/data/run/raw.csv"));
        assert_eq!(config.output.results.as_deref(), Some(Path::new("/tmp/results.txt")));
        assert_eq!(config.behaviors.len(), 2);
        assert_eq!(config.behaviors[1].stop, Path::new("/data/run/rear_stop.txt"));
    }

    #[test]
    fn rejects_unknown_subject() {
        let config: RunConfig =
            toml::from_str("[recording]\npath = \"raw.txt\"\nsubject = 3\n").unwrap();
        assert!(config.recording.subject().is_err());
    }
}
