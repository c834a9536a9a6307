//! Per-behavior analysis: align events, slice windows, pool the baseline and score the events.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    align::{align_events, SearchStrategy},
    error::{AnalysisError, Result},
    io::results::ResultRecord,
    metrics::{
        area_under_curve, peak_z_score, pooled_mean, pooled_std, z_scores, PeakZScore,
        RaggedPolicy,
    },
    signal::{AlignedEvent, Behavior, EventTimeUnit},
    window::{extract_windows, BaselineAnchor, DegenerateWindow, WindowKind},
};

/// Tunables shared by every behavior of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of the baseline window in samples of the reference series.
    pub baseline_samples: usize,
    /// Samples per second of the reference series, used to report the peak position.
    pub sample_rate_hz: f64,
    pub baseline_anchor: BaselineAnchor,
    pub ragged: RaggedPolicy,
    pub event_unit: EventTimeUnit,
    pub search: SearchStrategy,
    /// Leave out events that have an empty behavior or baseline window.
    pub exclude_degenerate: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline_samples: 300,
            sample_rate_hz: 60.0,
            baseline_anchor: BaselineAnchor::Stop,
            ragged: RaggedPolicy::CommonPrefix,
            event_unit: EventTimeUnit::Milliseconds,
            search: SearchStrategy::Linear,
            exclude_degenerate: true,
        }
    }
}

/// Statistics of one behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub name: String,
    /// Events supplied.
    pub events: usize,
    /// Events whose behavior window entered the z-score trace.
    pub analyzed_events: usize,
    /// Mean over every behavior window, degenerate ones included.
    pub auc: f64,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub peak: PeakZScore,
    pub aligned: Vec<AlignedEvent>,
    pub degenerate: Vec<DegenerateWindow>,
    /// Events with a degenerate window that was kept out of the baseline or z-score input.
    pub excluded_events: Vec<usize>,
}

impl BehaviorSummary {
    pub fn record(&self) -> ResultRecord {
        ResultRecord {
            behavior: self.name.clone(),
            auc: self.auc,
            max_zscore: self.peak.value,
            max_zscore_location: self.peak.seconds,
        }
    }
}

/// Outcome of one behavior in a batch; a failure here does not affect the others.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorOutcome {
    pub name: String,
    pub result: Result<BehaviorSummary>,
}

/// Analyze one behavior against a reference time base (minutes) and the normalized signal that
/// shares its indices.
pub fn analyze_behavior(
    reference: &[f64],
    signal: &[f64],
    behavior: &Behavior,
    config: &AnalysisConfig,
) -> Result<BehaviorSummary> {
    if signal.len() != reference.len() {
        return Err(AnalysisError::SignalLengthMismatch {
            reference: reference.len(),
            signal: signal.len(),
        });
    }

    let aligned = align_events(reference, &behavior.events, config.event_unit, config.search)?;
    let starts: Vec<usize> = aligned.iter().map(|a| a.start_index).collect();
    let stops: Vec<usize> = aligned.iter().map(|a| a.stop_index).collect();
    let windows = extract_windows(
        &starts,
        &stops,
        signal,
        config.baseline_samples,
        config.baseline_anchor,
    )?;

    // Every start/stop pair counts toward the AUC; empty windows add no samples.
    let auc = area_under_curve(&windows.behavior)?;

    let excluded_events = if config.exclude_degenerate {
        windows.degenerate_events()
    } else {
        Vec::new()
    };
    let (behavior_windows, baseline_windows) = if excluded_events.is_empty() {
        (windows.behavior.clone(), windows.baseline.clone())
    } else {
        warn!(
            "{}: {} of {} event(s) have degenerate windows and are left out of the statistics \
             those windows feed: {:?}",
            behavior.name,
            excluded_events.len(),
            windows.len(),
            excluded_events
        );
        (
            windows.usable(WindowKind::Behavior),
            windows.usable(WindowKind::Baseline),
        )
    };

    let baseline_mean = pooled_mean(&baseline_windows)?;
    let baseline_std = pooled_std(&baseline_windows)?;
    let z = z_scores(&behavior_windows, baseline_mean, baseline_std)?;
    let peak = peak_z_score(&z, config.sample_rate_hz, config.ragged)?;
    if peak.truncated {
        debug!(
            "{}: z-score trace averaged over the common prefix of {} sample(s)",
            behavior.name, peak.averaged_len
        );
    }

    Ok(BehaviorSummary {
        name: behavior.name.clone(),
        events: behavior.events.len(),
        analyzed_events: behavior_windows.len(),
        auc,
        baseline_mean,
        baseline_std,
        peak,
        aligned,
        degenerate: windows.degenerate,
        excluded_events,
    })
}

/// Analyze behaviors one after another, in input order.
pub fn analyze_behaviors(
    reference: &[f64],
    signal: &[f64],
    behaviors: &[Behavior],
    config: &AnalysisConfig,
) -> Vec<BehaviorOutcome> {
    behaviors
        .iter()
        .map(|behavior| BehaviorOutcome {
            name: behavior.name.clone(),
            result: analyze_behavior(reference, signal, behavior, config),
        })
        .collect()
}

/// Same results as [`analyze_behaviors`], one scoped thread per behavior.
pub fn analyze_behaviors_parallel(
    reference: &[f64],
    signal: &[f64],
    behaviors: &[Behavior],
    config: &AnalysisConfig,
) -> Vec<BehaviorOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = behaviors
            .iter()
            .map(|behavior| {
                scope.spawn(move || analyze_behavior(reference, signal, behavior, config))
            })
            .collect();
        handles
            .into_iter()
            .zip(behaviors)
            .map(|(handle, behavior)| BehaviorOutcome {
                name: behavior.name.clone(),
                result: match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                },
            })
            .collect()
    })
}
