//! Photobleaching correction: fit `y = a * exp(b * t)` and divide the signal by the fit.
//!
//! The fit is an ordinary least-squares line through `(t, ln y)`, so every sample must be
//! positive.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    pub amplitude: f64,
    pub rate: f64,
}

impl ExponentialFit {
    pub fn eval(&self, t: f64) -> f64 {
        self.amplitude * (self.rate * t).exp()
    }
}

pub fn fit_exponential(time: &[f64], signal: &[f64]) -> Result<ExponentialFit> {
    if time.len() != signal.len() {
        return Err(AnalysisError::SignalLengthMismatch {
            reference: time.len(),
            signal: signal.len(),
        });
    }
    if let Some(index) = signal.iter().position(|&y| !(y.is_finite() && y > 0.0)) {
        return Err(AnalysisError::NonPositiveSignal { index });
    }
    if time.len() < 2 {
        return Err(AnalysisError::InsufficientFitPoints);
    }

    let n = time.len() as f64;
    let t_mean = time.iter().sum::<f64>() / n;
    let log_mean = signal.iter().map(|y| y.ln()).sum::<f64>() / n;
    let (sxy, sxx) = time
        .iter()
        .zip(signal)
        .fold((0.0, 0.0), |(sxy, sxx), (&t, &y)| {
            let dt = t - t_mean;
            (sxy + dt * (y.ln() - log_mean), sxx + dt * dt)
        });
    if sxx == 0.0 {
        return Err(AnalysisError::InsufficientFitPoints);
    }

    let rate = sxy / sxx;
    Ok(ExponentialFit {
        amplitude: (log_mean - rate * t_mean).exp(),
        rate,
    })
}

/// Signal divided by its fitted exponential decay, sample for sample.
pub fn normalize_by_exponential(time: &[f64], signal: &[f64]) -> Result<Vec<f64>> {
    let fit = fit_exponential(time, signal)?;
    Ok(time
        .iter()
        .zip(signal)
        .map(|(&t, &y)| y / fit.eval(t))
        .collect())
}
