use thiserror::Error;

/// Failures raised by the analysis core. Every variant is reported at the call that detects it;
/// nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("raw recording has {len} samples, at least {required} are needed to de-interleave")]
    InsufficientData { len: usize, required: usize },

    #[error("channel offsets red={red} isosbestic={isosbestic} green={green} must be distinct modulo 3")]
    InvalidChannelOrder {
        red: usize,
        isosbestic: usize,
        green: usize,
    },

    #[error("reference time series is empty")]
    EmptyReference,

    #[error("event count mismatch: {starts} start(s) vs {stops} stop(s)")]
    MismatchedEventCount { starts: usize, stops: usize },

    #[error("no events to aggregate")]
    NoEvents,

    #[error("window for event {event} is empty")]
    EmptyWindow { event: usize },

    #[error("all {events} event window(s) are empty")]
    AllWindowsEmpty { events: usize },

    #[error("standard deviation undefined: every baseline window holds a single sample")]
    UndefinedDeviation,

    #[error("baseline standard deviation is zero")]
    DivisionByZero,

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("signal has {signal} samples but the reference time series has {reference}")]
    SignalLengthMismatch { reference: usize, signal: usize },

    #[error("signal value at index {index} is not positive; exponential fit needs positive samples")]
    NonPositiveSignal { index: usize },

    #[error("exponential fit needs at least two distinct time points")]
    InsufficientFitPoints,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
