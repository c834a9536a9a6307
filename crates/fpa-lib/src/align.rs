//! Nearest-timestamp lookup of behavior boundaries on a fluorescence time base.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::signal::{AlignedEvent, BehaviorEvent, EventTimeUnit};

/// How nearest-neighbour lookups scan the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Full scan; correct for any reference order.
    #[default]
    Linear,
    /// Binary search; requires an ascending reference and returns the same index as `Linear`.
    Sorted,
}

impl SearchStrategy {
    pub fn nearest_index(self, reference: &[f64], query: f64) -> Result<usize> {
        match self {
            SearchStrategy::Linear => nearest_index(reference, query),
            SearchStrategy::Sorted => nearest_index_sorted(reference, query),
        }
    }
}

/// Index of the reference sample closest to `query`. Ties resolve to the lowest index.
pub fn nearest_index(reference: &[f64], query: f64) -> Result<usize> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptyReference);
    }
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &t) in reference.iter().enumerate() {
        let dist = (t - query).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    Ok(best)
}

/// Binary-search form of [`nearest_index`] for ascending references.
pub fn nearest_index_sorted(reference: &[f64], query: f64) -> Result<usize> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptyReference);
    }
    let right = reference.partition_point(|&t| t < query);
    if right == 0 {
        return Ok(0);
    }
    // First occurrence of the value just below the query keeps lowest-index ties.
    let below = reference[right - 1];
    let left = reference.partition_point(|&t| t < below);
    if right == reference.len() {
        return Ok(left);
    }
    if (reference[right] - query).abs() < (query - below).abs() {
        Ok(right)
    } else {
        Ok(left)
    }
}

pub fn nearest_indices(reference: &[f64], queries: &[f64]) -> Result<Vec<usize>> {
    queries
        .iter()
        .map(|&q| nearest_index(reference, q))
        .collect()
}

pub fn nearest_value(reference: &[f64], query: f64) -> Result<f64> {
    nearest_index(reference, query).map(|i| reference[i])
}

/// Resolve each event boundary to its nearest sample of `reference` (minutes).
pub fn align_events(
    reference: &[f64],
    events: &[BehaviorEvent],
    unit: EventTimeUnit,
    strategy: SearchStrategy,
) -> Result<Vec<AlignedEvent>> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptyReference);
    }
    events
        .iter()
        .map(|event| {
            Ok(AlignedEvent {
                start_index: strategy.nearest_index(reference, unit.to_minutes(event.start))?,
                stop_index: strategy.nearest_index(reference, unit.to_minutes(event.stop))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MS_PER_MINUTE;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn picks_closest_sample() {
        let reference = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(nearest_index(&reference, 2.2).unwrap(), 2);
        assert_eq!(nearest_index(&reference, -5.0).unwrap(), 0);
        assert_eq!(nearest_index(&reference, 99.0).unwrap(), 4);
        assert_eq!(nearest_value(&reference, 3.6).unwrap(), 4.0);
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let reference = [0.0, 1.0, 2.0];
        assert_eq!(nearest_index(&reference, 0.5).unwrap(), 0);
        assert_eq!(nearest_index_sorted(&reference, 0.5).unwrap(), 0);

        let duplicates = [1.0, 5.0, 5.0, 5.0, 9.0];
        assert_eq!(nearest_index(&duplicates, 5.0).unwrap(), 1);
        assert_eq!(nearest_index(&duplicates, 6.0).unwrap(), 1);
        assert_eq!(nearest_index_sorted(&duplicates, 6.0).unwrap(), 1);
        assert_eq!(nearest_index_sorted(&duplicates, 5.0).unwrap(), 1);
    }

    #[test]
    fn unsorted_reference_uses_full_scan() {
        let reference = [10.0, 3.0, 7.0, 3.0];
        assert_eq!(nearest_index(&reference, 2.0).unwrap(), 1);
        assert_eq!(nearest_indices(&reference, &[9.0, 6.0]).unwrap(), vec![0, 2]);
    }

    #[test]
    fn empty_reference_is_an_error() {
        assert_eq!(nearest_index(&[], 1.0), Err(AnalysisError::EmptyReference));
        assert_eq!(
            nearest_index_sorted(&[], 1.0),
            Err(AnalysisError::EmptyReference)
        );
        assert_eq!(
            align_events(
                &[],
                &[BehaviorEvent::new(0.0, 1.0)],
                EventTimeUnit::Minutes,
                SearchStrategy::Linear
            ),
            Err(AnalysisError::EmptyReference)
        );
    }

    #[test]
    fn binary_search_matches_scan() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.gen_range(1..40);
            let mut reference: Vec<f64> = (0..n).map(|_| rng.gen_range(0..20) as f64 * 0.5).collect();
            reference.sort_by(|a, b| a.total_cmp(b));
            for _ in 0..20 {
                let q = rng.gen_range(-2.0..12.0);
                let linear = nearest_index(&reference, q).unwrap();
                let sorted = nearest_index_sorted(&reference, q).unwrap();
                assert_eq!(linear, sorted, "reference={:?} q={}", reference, q);
                let best = (reference[linear] - q).abs();
                assert!(reference.iter().all(|t| best <= (t - q).abs()));
            }
            // Queries landing exactly on, and halfway between, samples.
            for w in reference.windows(2) {
                let q = (w[0] + w[1]) / 2.0;
                assert_eq!(
                    nearest_index(&reference, q).unwrap(),
                    nearest_index_sorted(&reference, q).unwrap()
                );
            }
        }
    }

    #[test]
    fn millisecond_events_align_to_green_time_base() {
        let green: Vec<f64> = [26.0, 29.0].iter().map(|t| t / MS_PER_MINUTE).collect();
        let aligned = align_events(
            &green,
            &[BehaviorEvent::new(26.0, 27.0)],
            EventTimeUnit::Milliseconds,
            SearchStrategy::Sorted,
        )
        .unwrap();
        assert_eq!(
            aligned,
            vec![AlignedEvent {
                start_index: 0,
                stop_index: 0
            }]
        );
    }
}
