//! Strided recovery of per-channel series from the multiplexed raw stream.
//!
//! The acquisition rig cycles red, isosbestic and green excitation on consecutive rows, so each
//! channel is every third raw sample starting at its phase offset. Rows before the first phase
//! anchor are unreliable and never read.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::signal::{ChannelKind, ChannelSeries, RawSample, Subject, MS_PER_MINUTE};

/// Number of channels multiplexed into one raw stream.
pub const PHASES: usize = 3;

/// 0-based raw index at which each channel's phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOrder {
    pub red: usize,
    pub isosbestic: usize,
    pub green: usize,
}

impl ChannelOrder {
    /// Wiring of the two-animal rig: samples 0..24 are dropped, red anchors at 24.
    pub const STANDARD: ChannelOrder = ChannelOrder {
        red: 24,
        isosbestic: 25,
        green: 26,
    };

    pub fn offset(&self, kind: ChannelKind) -> usize {
        match kind {
            ChannelKind::Red => self.red,
            ChannelKind::Isosbestic => self.isosbestic,
            ChannelKind::Green => self.green,
        }
    }

    /// Shortest raw stream that can be de-interleaved: the last anchor plus one trailing sample.
    pub fn min_samples(&self) -> usize {
        self.red.max(self.isosbestic).max(self.green) + 2
    }

    pub fn validate(&self) -> Result<()> {
        let phases = [
            self.red % PHASES,
            self.isosbestic % PHASES,
            self.green % PHASES,
        ];
        if phases[0] == phases[1] || phases[0] == phases[2] || phases[1] == phases[2] {
            return Err(AnalysisError::InvalidChannelOrder {
                red: self.red,
                isosbestic: self.isosbestic,
                green: self.green,
            });
        }
        Ok(())
    }
}

impl Default for ChannelOrder {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// All series recovered from one recording. Every series has the same length and
/// `series(s, k).values[i]` is simultaneous with `time(k)[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deinterleaved {
    order: ChannelOrder,
    /// Time bases in minutes, indexed by `ChannelKind::index`.
    times: [Vec<f64>; 3],
    /// Subject-major: `subject.index() * 3 + kind.index()`.
    channels: Vec<ChannelSeries>,
}

impl Deinterleaved {
    pub fn order(&self) -> &ChannelOrder {
        &self.order
    }

    /// Samples per series.
    pub fn len(&self) -> usize {
        self.times[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn time(&self, kind: ChannelKind) -> &[f64] {
        &self.times[kind.index()]
    }

    pub fn series(&self, subject: Subject, kind: ChannelKind) -> &ChannelSeries {
        &self.channels[subject.index() * PHASES + kind.index()]
    }

    pub fn channels(&self) -> &[ChannelSeries] {
        &self.channels
    }
}

/// Split `raw` into six channel series and three time series using the phase offsets in `order`.
pub fn deinterleave(raw: &[RawSample], order: &ChannelOrder) -> Result<Deinterleaved> {
    order.validate()?;
    let required = order.min_samples();
    if raw.len() < required {
        return Err(AnalysisError::InsufficientData {
            len: raw.len(),
            required,
        });
    }

    // Truncate to the shortest phase so every series stays index-aligned.
    let len = ChannelKind::ALL
        .iter()
        .map(|&kind| strided_len(raw.len(), order.offset(kind)))
        .fold(usize::MAX, usize::min);

    let phase = |kind: ChannelKind| {
        raw[order.offset(kind)..]
            .iter()
            .step_by(PHASES)
            .take(len)
    };

    let times = ChannelKind::ALL.map(|kind| {
        phase(kind)
            .map(|sample| sample.timestamp_ms / MS_PER_MINUTE)
            .collect::<Vec<_>>()
    });

    let mut channels = Vec::with_capacity(Subject::ALL.len() * PHASES);
    for subject in Subject::ALL {
        for kind in ChannelKind::ALL {
            channels.push(ChannelSeries {
                subject,
                kind,
                timestamps: times[kind.index()].clone(),
                values: phase(kind)
                    .map(|sample| sample.field(subject, kind))
                    .collect(),
            });
        }
    }

    debug!(
        "de-interleaved {} raw samples into {} samples per channel",
        raw.len(),
        len
    );

    Ok(Deinterleaved {
        order: *order,
        times,
        channels,
    })
}

fn strided_len(total: usize, offset: usize) -> usize {
    (total.saturating_sub(offset) + PHASES - 1) / PHASES
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows with timestamp `i` ms and readings that encode the row index.
    fn ramp(n: usize) -> Vec<RawSample> {
        (0..n)
            .map(|i| {
                let i = i as f64;
                RawSample {
                    timestamp_ms: i,
                    green: [1000.0 + i, 2000.0 + i],
                    red: [3000.0 + i, 4000.0 + i],
                }
            })
            .collect()
    }

    #[test]
    fn thirty_samples_yield_two_per_channel() {
        let out = deinterleave(&ramp(30), &ChannelOrder::STANDARD).unwrap();
        assert_eq!(out.len(), 2);

        let minutes = |ms: &[f64]| ms.iter().map(|t| t / MS_PER_MINUTE).collect::<Vec<_>>();
        assert_eq!(out.time(ChannelKind::Red), minutes(&[24.0, 27.0]).as_slice());
        assert_eq!(
            out.time(ChannelKind::Isosbestic),
            minutes(&[25.0, 28.0]).as_slice()
        );
        assert_eq!(out.time(ChannelKind::Green), minutes(&[26.0, 29.0]).as_slice());

        assert_eq!(
            out.series(Subject::One, ChannelKind::Red).values,
            vec![3024.0, 3027.0]
        );
        assert_eq!(
            out.series(Subject::One, ChannelKind::Isosbestic).values,
            vec![1025.0, 1028.0]
        );
        assert_eq!(
            out.series(Subject::Two, ChannelKind::Green).values,
            vec![2026.0, 2029.0]
        );
    }

    #[test]
    fn all_series_share_length() {
        for n in 28..64 {
            let out = deinterleave(&ramp(n), &ChannelOrder::STANDARD).unwrap();
            let len = out.len();
            assert!(len >= 1);
            for kind in ChannelKind::ALL {
                assert_eq!(out.time(kind).len(), len, "time {:?} n={}", kind, n);
                for subject in Subject::ALL {
                    let series = out.series(subject, kind);
                    assert_eq!(series.len(), len, "{:?}/{:?} n={}", subject, kind, n);
                    assert_eq!(series.timestamps.len(), len);
                }
            }
        }
    }

    #[test]
    fn truncates_to_shortest_phase() {
        // 28 samples: red has 24 and 27, isosbestic and green only one sample each.
        let out = deinterleave(&ramp(28), &ChannelOrder::STANDARD).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.series(Subject::One, ChannelKind::Red).values,
            vec![3024.0]
        );
    }

    #[test]
    fn rejects_short_stream() {
        let err = deinterleave(&ramp(27), &ChannelOrder::STANDARD).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                len: 27,
                required: 28
            }
        );
    }

    #[test]
    fn custom_wiring_is_supported() {
        let order = ChannelOrder {
            red: 2,
            isosbestic: 0,
            green: 1,
        };
        let out = deinterleave(&ramp(9), &order).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            out.series(Subject::One, ChannelKind::Isosbestic).values,
            vec![1000.0, 1003.0, 1006.0]
        );
        assert_eq!(
            out.series(Subject::One, ChannelKind::Red).values,
            vec![3002.0, 3005.0, 3008.0]
        );
    }

    #[test]
    fn rejects_colliding_phases() {
        let order = ChannelOrder {
            red: 24,
            isosbestic: 27,
            green: 26,
        };
        assert!(matches!(
            deinterleave(&ramp(40), &order),
            Err(AnalysisError::InvalidChannelOrder { .. })
        ));
    }
}
