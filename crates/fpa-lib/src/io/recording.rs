//! Raw recording loader.
//!
//! A recording is a numeric table with one row per acquisition frame. Rows are either
//! whitespace-separated or split on a single-byte delimiter through the `csv` reader.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::signal::{RawSample, Subject};

/// Column positions of the raw table. `green` and `red` are indexed by [`Subject::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingLayout {
    pub time: usize,
    pub green: [usize; 2],
    pub red: [usize; 2],
}

impl Default for RecordingLayout {
    fn default() -> Self {
        Self {
            time: 0,
            green: [3, 2],
            red: [5, 4],
        }
    }
}

impl RecordingLayout {
    /// Fields a row needs before every column resolves.
    pub fn min_columns(&self) -> usize {
        self.green
            .iter()
            .chain(&self.red)
            .fold(self.time, |acc, &c| acc.max(c))
            + 1
    }

    fn sample(&self, fields: &[&str], line: usize) -> Result<RawSample> {
        if fields.len() < self.min_columns() {
            anyhow::bail!(
                "line {} has {} column(s), expected at least {}",
                line,
                fields.len(),
                self.min_columns()
            );
        }
        let num = |col: usize| -> Result<f64> {
            fields[col]
                .parse()
                .with_context(|| format!("line {} column {} is not f64: {}", line, col, fields[col]))
        };
        let mut green = [0.0; 2];
        let mut red = [0.0; 2];
        for subject in Subject::ALL {
            green[subject.index()] = num(self.green[subject.index()])?;
            red[subject.index()] = num(self.red[subject.index()])?;
        }
        Ok(RawSample {
            timestamp_ms: num(self.time)?,
            green,
            red,
        })
    }
}

/// Parse a whitespace-separated recording.
pub fn parse_recording(text: &str, layout: &RecordingLayout) -> Result<Vec<RawSample>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        out.push(layout.sample(&fields, idx + 1)?);
    }
    if out.is_empty() {
        anyhow::bail!("no samples found");
    }
    Ok(out)
}

/// Load a recording with the default column layout.
pub fn read_recording(path: &Path, delimiter: Option<u8>) -> Result<Vec<RawSample>> {
    read_recording_with_layout(path, delimiter, &RecordingLayout::default())
}

/// Load a recording. Without a delimiter the rows are split on whitespace.
pub fn read_recording_with_layout(
    path: &Path,
    delimiter: Option<u8>,
    layout: &RecordingLayout,
) -> Result<Vec<RawSample>> {
    let samples = match delimiter {
        None => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_recording(&text, layout)
        }
        Some(delimiter) => read_delimited(path, delimiter, layout),
    }
    .with_context(|| format!("parsing recording {}", path.display()))?;
    debug!("{}: {} raw sample(s)", path.display(), samples.len());
    Ok(samples)
}

fn read_delimited(path: &Path, delimiter: u8, layout: &RecordingLayout) -> Result<Vec<RawSample>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.context("reading record")?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        out.push(layout.sample(&fields, line)?);
    }
    if out.is_empty() {
        anyhow::bail!("no samples found");
    }
    Ok(out)
}
