use log::debug;

use crate::error::{AnalysisError, Result};

/// Mean of each baseline window's own mean; every event weighs the same regardless of length.
pub fn pooled_mean<W: AsRef<[f64]>>(windows: &[W]) -> Result<f64> {
    check_windows(windows)?;
    let total: f64 = windows.iter().map(|w| mean(w.as_ref())).sum();
    Ok(total / windows.len() as f64)
}

/// Mean of each baseline window's sample standard deviation (n - 1 denominator).
///
/// Single-sample windows carry no deviation and are left out of the average.
pub fn pooled_std<W: AsRef<[f64]>>(windows: &[W]) -> Result<f64> {
    check_windows(windows)?;
    let deviations: Vec<f64> = windows
        .iter()
        .enumerate()
        .filter_map(|(event, w)| {
            let sd = sample_std(w.as_ref());
            if sd.is_none() {
                debug!("baseline window {} has a single sample; skipped for deviation", event);
            }
            sd
        })
        .collect();
    if deviations.is_empty() {
        return Err(AnalysisError::UndefinedDeviation);
    }
    Ok(deviations.iter().sum::<f64>() / deviations.len() as f64)
}

fn check_windows<W: AsRef<[f64]>>(windows: &[W]) -> Result<()> {
    if windows.is_empty() {
        return Err(AnalysisError::NoEvents);
    }
    if let Some(event) = windows.iter().position(|w| w.as_ref().is_empty()) {
        return Err(AnalysisError::EmptyWindow { event });
    }
    Ok(())
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

pub(crate) fn sample_std(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let m = mean(data);
    Some((data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_windows_pool_to_constant() {
        let windows = vec![vec![2.5; 4], vec![2.5; 4], vec![2.5; 4]];
        assert!((pooled_mean(&windows).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(pooled_std(&windows).unwrap(), 0.0);
    }

    #[test]
    fn each_event_weighs_equally() {
        // Per-window means 1.0 and 10.0; a sample-weighted mean would be 8.2.
        let windows: Vec<&[f64]> = vec![&[1.0][..], &[10.0, 10.0, 10.0, 10.0][..]];
        assert!((pooled_mean(&windows).unwrap() - 5.5).abs() < 1e-12);
    }

    #[test]
    fn std_averages_per_window_deviation() {
        // Sample deviations: [1, 3] -> sqrt(2), [2, 4, 6] -> 2.
        let windows: Vec<&[f64]> = vec![&[1.0, 3.0][..], &[2.0, 4.0, 6.0][..]];
        let expected = (2f64.sqrt() + 2.0) / 2.0;
        assert!((pooled_std(&windows).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn single_sample_windows_are_skipped_for_std() {
        let windows: Vec<&[f64]> = vec![&[100.0][..], &[2.0, 4.0, 6.0][..]];
        assert!((pooled_std(&windows).unwrap() - 2.0).abs() < 1e-12);

        let singles: Vec<&[f64]> = vec![&[1.0][..], &[2.0][..]];
        assert_eq!(pooled_std(&singles), Err(AnalysisError::UndefinedDeviation));
    }

    #[test]
    fn empty_input_is_rejected() {
        let none: Vec<Vec<f64>> = Vec::new();
        assert_eq!(pooled_mean(&none), Err(AnalysisError::NoEvents));
        assert_eq!(pooled_std(&none), Err(AnalysisError::NoEvents));

        let windows: Vec<&[f64]> = vec![&[1.0, 2.0][..], &[][..], &[3.0][..]];
        assert_eq!(
            pooled_mean(&windows),
            Err(AnalysisError::EmptyWindow { event: 1 })
        );
        assert_eq!(
            pooled_std(&windows),
            Err(AnalysisError::EmptyWindow { event: 1 })
        );
    }
}
