use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// How to average z-score windows of unequal length position by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaggedPolicy {
    /// Average only the positions every window reaches.
    #[default]
    CommonPrefix,
    /// Average each position over the windows long enough to reach it.
    AvailableEvents,
}

/// Maximum of the event-averaged z-score trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakZScore {
    pub value: f64,
    /// 0-based position within the event window.
    pub position: usize,
    /// `position` expressed in seconds after the event start.
    pub seconds: f64,
    /// Positions included in the averaged trace.
    pub averaged_len: usize,
    /// Whether longer windows were cut to the common prefix.
    pub truncated: bool,
}

/// Mean fluorescence over every sample of every event: total sum over total count.
///
/// Unlike the baseline statistics this weighs events by their length.
pub fn area_under_curve<W: AsRef<[f64]>>(windows: &[W]) -> Result<f64> {
    if windows.is_empty() {
        return Err(AnalysisError::NoEvents);
    }
    let (sum, count) = windows.iter().fold((0.0, 0usize), |(sum, count), w| {
        let w = w.as_ref();
        (sum + w.iter().sum::<f64>(), count + w.len())
    });
    if count == 0 {
        return Err(AnalysisError::AllWindowsEmpty {
            events: windows.len(),
        });
    }
    Ok(sum / count as f64)
}

/// `(x - mean) / std` for every sample of every window.
pub fn z_scores<W: AsRef<[f64]>>(windows: &[W], mean: f64, std: f64) -> Result<Vec<Vec<f64>>> {
    if std == 0.0 {
        return Err(AnalysisError::DivisionByZero);
    }
    Ok(windows
        .iter()
        .map(|w| w.as_ref().iter().map(|x| (x - mean) / std).collect())
        .collect())
}

/// Column-wise average of the z-score windows.
///
/// Returns the averaged trace and whether any window was cut. Empty windows are ignored.
pub fn average_trace<W: AsRef<[f64]>>(windows: &[W], policy: RaggedPolicy) -> (Vec<f64>, bool) {
    let filled: Vec<&[f64]> = windows
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| !w.is_empty())
        .collect();
    let shortest = filled.iter().map(|w| w.len()).min().unwrap_or(0);
    let longest = filled.iter().map(|w| w.len()).max().unwrap_or(0);

    match policy {
        RaggedPolicy::CommonPrefix => {
            let trace = (0..shortest)
                .map(|i| filled.iter().map(|w| w[i]).sum::<f64>() / filled.len() as f64)
                .collect();
            (trace, longest > shortest)
        }
        RaggedPolicy::AvailableEvents => {
            let trace = (0..longest)
                .map(|i| {
                    let (sum, n) = filled
                        .iter()
                        .filter_map(|w| w.get(i))
                        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
                    sum / n as f64
                })
                .collect();
            (trace, false)
        }
    }
}

/// Peak of the averaged z-score trace. The first maximum wins; `seconds = position / rate`.
pub fn peak_z_score<W: AsRef<[f64]>>(
    z_windows: &[W],
    sample_rate_hz: f64,
    policy: RaggedPolicy,
) -> Result<PeakZScore> {
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(AnalysisError::InvalidSampleRate(sample_rate_hz));
    }
    let (trace, truncated) = average_trace(z_windows, policy);
    let (position, value) = argmax(&trace).ok_or(AnalysisError::NoEvents)?;
    Ok(PeakZScore {
        value,
        position,
        seconds: position as f64 / sample_rate_hz,
        averaged_len: trace.len(),
        truncated,
    })
}

fn argmax(data: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in data.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        match best {
            Some((_, v)) if x <= v => {}
            _ => best = Some((i, x)),
        }
    }
    best
}
