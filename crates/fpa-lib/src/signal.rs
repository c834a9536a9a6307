use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Milliseconds per minute; raw timestamps are recorded in ms, channel time bases in minutes.
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Recorded animal. `One` is the subject, `Two` the partner or stranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    One,
    Two,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::One, Subject::Two];

    pub fn index(self) -> usize {
        match self {
            Subject::One => 0,
            Subject::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Subject::One),
            2 => Some(Subject::Two),
            _ => None,
        }
    }
}

/// Excitation channel multiplexed into the raw stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Red,
    Isosbestic,
    Green,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Red, ChannelKind::Isosbestic, ChannelKind::Green];

    pub fn index(self) -> usize {
        match self {
            ChannelKind::Red => 0,
            ChannelKind::Isosbestic => 1,
            ChannelKind::Green => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Red => "red",
            ChannelKind::Isosbestic => "isosbestic",
            ChannelKind::Green => "green",
        }
    }
}

/// One row of the raw recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp_ms: f64,
    /// Green detector reading, indexed by `Subject::index`.
    pub green: [f64; 2],
    /// Red detector reading, indexed by `Subject::index`.
    pub red: [f64; 2],
}

impl RawSample {
    /// Detector reading that carries `kind` for `subject`. Isosbestic excitation is read on the
    /// green detector.
    pub fn field(&self, subject: Subject, kind: ChannelKind) -> f64 {
        match kind {
            ChannelKind::Red => self.red[subject.index()],
            ChannelKind::Isosbestic | ChannelKind::Green => self.green[subject.index()],
        }
    }
}

/// De-interleaved fluorescence for one (subject, channel) pair. Timestamps are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub subject: Subject,
    pub kind: ChannelKind,
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

impl ChannelSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }
}

/// Unit of behavior event timestamps supplied by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTimeUnit {
    /// Same unit as the raw recording.
    #[default]
    Milliseconds,
    /// Same unit as the de-interleaved time series.
    Minutes,
}

impl EventTimeUnit {
    pub fn to_minutes(self, t: f64) -> f64 {
        match self {
            EventTimeUnit::Milliseconds => t / MS_PER_MINUTE,
            EventTimeUnit::Minutes => t,
        }
    }
}

/// One scored occurrence of a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub start: f64,
    pub stop: f64,
}

impl BehaviorEvent {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// Pair up parallel start/stop lists.
    pub fn zip(starts: &[f64], stops: &[f64]) -> Result<Vec<Self>> {
        if starts.len() != stops.len() {
            return Err(AnalysisError::MismatchedEventCount {
                starts: starts.len(),
                stops: stops.len(),
            });
        }
        Ok(starts
            .iter()
            .zip(stops)
            .map(|(&start, &stop)| Self { start, stop })
            .collect())
    }
}

/// A named behavior and its events in temporal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub name: String,
    pub events: Vec<BehaviorEvent>,
}

impl Behavior {
    pub fn new(name: impl Into<String>, events: Vec<BehaviorEvent>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

/// A behavior event resolved to sample indices of a reference series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedEvent {
    pub start_index: usize,
    pub stop_index: usize,
}
