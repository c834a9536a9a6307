//! Per-event slicing of the normalized signal into behavior and baseline windows.
//!
//! Behavior windows span `[start, stop]` (stop sample included). Baseline windows span the
//! `prior_samples` samples before the anchor index. All windows are clipped to the series, so a
//! malformed boundary produces an empty window instead of an out-of-range slice.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Index the baseline window ends at (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineAnchor {
    Start,
    #[default]
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Behavior,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// Stop index precedes the start index.
    Reversed,
    /// Nothing left after clipping to the series bounds.
    Empty,
}

/// A zero-length window and the event it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateWindow {
    pub event: usize,
    pub window: WindowKind,
    pub reason: DegenerateReason,
}

/// `series[start .. start + duration]`, clipped to the series.
pub fn behavior_window(start_idx: usize, duration_samples: usize, series: &[f64]) -> &[f64] {
    let start = start_idx.min(series.len());
    let end = start_idx.saturating_add(duration_samples).min(series.len());
    &series[start..end]
}

/// `series[anchor - prior .. anchor]`, clipped to the series and never starting below zero.
pub fn baseline_window(anchor_idx: usize, prior_samples: usize, series: &[f64]) -> &[f64] {
    let end = anchor_idx.min(series.len());
    let start = anchor_idx.saturating_sub(prior_samples).min(end);
    &series[start..end]
}

/// Samples covered by the start-to-stop window, zero when the bounds are reversed.
pub fn start_to_stop_duration(start_idx: usize, stop_idx: usize) -> usize {
    if stop_idx < start_idx {
        0
    } else {
        stop_idx - start_idx + 1
    }
}

/// Behavior and baseline windows of every event of one behavior, borrowed from the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWindows<'a> {
    pub behavior: Vec<&'a [f64]>,
    pub baseline: Vec<&'a [f64]>,
    pub degenerate: Vec<DegenerateWindow>,
}

impl<'a> EventWindows<'a> {
    pub fn len(&self) -> usize {
        self.behavior.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behavior.is_empty()
    }

    /// Events with at least one degenerate window, ascending and without duplicates.
    pub fn degenerate_events(&self) -> Vec<usize> {
        let mut events: Vec<usize> = self.degenerate.iter().map(|d| d.event).collect();
        events.sort_unstable();
        events.dedup();
        events
    }

    /// Windows of `kind`, leaving out events whose own `kind` window is degenerate.
    pub fn usable(&self, kind: WindowKind) -> Vec<&'a [f64]> {
        let windows = match kind {
            WindowKind::Behavior => &self.behavior,
            WindowKind::Baseline => &self.baseline,
        };
        windows
            .iter()
            .enumerate()
            .filter(|&(event, _)| {
                !self
                    .degenerate
                    .iter()
                    .any(|d| d.event == event && d.window == kind)
            })
            .map(|(_, &w)| w)
            .collect()
    }
}

/// Slice one behavior window and one baseline window per event.
pub fn extract_windows<'a>(
    starts: &[usize],
    stops: &[usize],
    series: &'a [f64],
    prior_samples: usize,
    anchor: BaselineAnchor,
) -> Result<EventWindows<'a>> {
    if starts.len() != stops.len() {
        return Err(AnalysisError::MismatchedEventCount {
            starts: starts.len(),
            stops: stops.len(),
        });
    }

    let mut windows = EventWindows {
        behavior: Vec::with_capacity(starts.len()),
        baseline: Vec::with_capacity(starts.len()),
        degenerate: Vec::new(),
    };

    for (event, (&start, &stop)) in starts.iter().zip(stops).enumerate() {
        let behavior = behavior_window(start, start_to_stop_duration(start, stop), series);
        if behavior.is_empty() {
            let reason = if stop < start {
                DegenerateReason::Reversed
            } else {
                DegenerateReason::Empty
            };
            warn!(
                "event {}: behavior window [{}, {}] is degenerate ({:?})",
                event, start, stop, reason
            );
            windows.degenerate.push(DegenerateWindow {
                event,
                window: WindowKind::Behavior,
                reason,
            });
        }

        let anchor_idx = match anchor {
            BaselineAnchor::Start => start,
            BaselineAnchor::Stop => stop,
        };
        let baseline = baseline_window(anchor_idx, prior_samples, series);
        if baseline.is_empty() {
            warn!(
                "event {}: baseline window before index {} is empty",
                event, anchor_idx
            );
            windows.degenerate.push(DegenerateWindow {
                event,
                window: WindowKind::Baseline,
                reason: DegenerateReason::Empty,
            });
        }

        windows.behavior.push(behavior);
        windows.baseline.push(baseline);
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn baseline_clips_at_zero() {
        let s = series(20);
        assert_eq!(baseline_window(5, 10, &s), &s[0..5]);
        assert_eq!(baseline_window(15, 10, &s), &s[5..15]);
        assert!(baseline_window(0, 10, &s).is_empty());
        assert_eq!(baseline_window(30, 5, &s), &[] as &[f64]);
    }

    #[test]
    fn behavior_clips_at_end() {
        let s = series(10);
        assert_eq!(behavior_window(7, 10, &s), &s[7..10]);
        assert_eq!(behavior_window(2, 3, &s), &[2.0, 3.0, 4.0]);
        assert!(behavior_window(12, 3, &s).is_empty());
        assert!(behavior_window(usize::MAX, usize::MAX, &s).is_empty());
    }

    #[test]
    fn start_to_stop_includes_stop_sample() {
        let s = series(20);
        let w = extract_windows(&[4, 10], &[6, 10], &s, 3, BaselineAnchor::Stop).unwrap();
        assert_eq!(w.behavior, vec![&[4.0, 5.0, 6.0][..], &[10.0][..]]);
        assert_eq!(w.baseline, vec![&[3.0, 4.0, 5.0][..], &[7.0, 8.0, 9.0][..]]);
        assert!(w.degenerate.is_empty());
    }

    #[test]
    fn baseline_can_anchor_at_start() {
        let s = series(20);
        let w = extract_windows(&[8], &[12], &s, 4, BaselineAnchor::Start).unwrap();
        assert_eq!(w.baseline, vec![&[4.0, 5.0, 6.0, 7.0][..]]);
    }

    #[test]
    fn reversed_bounds_are_flagged_not_fatal() {
        let s = series(20);
        let w = extract_windows(&[5, 9, 0], &[3, 12, 2], &s, 2, BaselineAnchor::Start).unwrap();
        assert_eq!(w.len(), 3);
        assert!(w.behavior[0].is_empty());
        assert_eq!(
            w.degenerate,
            vec![
                DegenerateWindow {
                    event: 0,
                    window: WindowKind::Behavior,
                    reason: DegenerateReason::Reversed,
                },
                DegenerateWindow {
                    event: 2,
                    window: WindowKind::Baseline,
                    reason: DegenerateReason::Empty,
                },
            ]
        );
        assert_eq!(w.degenerate_events(), vec![0, 2]);

        // Each kind only drops its own degenerate windows.
        assert_eq!(
            w.usable(WindowKind::Behavior),
            vec![&s[9..=12], &s[0..=2]]
        );
        assert_eq!(w.usable(WindowKind::Baseline), vec![&s[3..5], &s[7..9]]);
    }

    #[test]
    fn mismatched_counts_fail() {
        let s = series(5);
        assert_eq!(
            extract_windows(&[0, 1], &[2], &s, 1, BaselineAnchor::Stop),
            Err(AnalysisError::MismatchedEventCount {
                starts: 2,
                stops: 1
            })
        );
    }
}
