use anyhow::{Context, Result};
use std::path::Path;

use crate::signal::BehaviorEvent;

/// Parse a numeric series: values separated by newlines, commas or whitespace.
/// Blank lines and `#` comments are ignored.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for field in trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
        {
            let val: f64 = field
                .parse()
                .with_context(|| format!("line {} is not f64: {}", idx + 1, field))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a numeric series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Pair a start-time file with its stop-time file.
pub fn read_behavior_events(start: &Path, stop: &Path) -> Result<Vec<BehaviorEvent>> {
    let starts = read_f64_series(start)?;
    let stops = read_f64_series(stop)?;
    BehaviorEvent::zip(&starts, &stops).with_context(|| {
        format!(
            "{} has {} start time(s) but {} has {} stop time(s)",
            start.display(),
            starts.len(),
            stop.display(),
            stops.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::io::Write;

    #[test]
    fn parses_lines_and_separators() {
        let text = "# starts (ms)\n1.5\n\n2, 3\n4 5.25\n";
        assert_eq!(
            parse_f64_series(text).unwrap(),
            vec![1.5, 2.0, 3.0, 4.0, 5.25]
        );
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_f64_series("1\n2\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
        assert!(parse_f64_series("# nothing\n\n").is_err());
    }

    #[test]
    fn pairs_start_and_stop_files() {
        let mut start = tempfile::NamedTempFile::new().unwrap();
        writeln!(start, "100\n400").unwrap();
        let mut stop = tempfile::NamedTempFile::new().unwrap();
        writeln!(stop, "250\n900").unwrap();
        let events = read_behavior_events(start.path(), stop.path()).unwrap();
        assert_eq!(
            events,
            vec![BehaviorEvent::new(100.0, 250.0), BehaviorEvent::new(400.0, 900.0)]
        );

        let mut short = tempfile::NamedTempFile::new().unwrap();
        writeln!(short, "250").unwrap();
        let err = read_behavior_events(start.path(), short.path()).unwrap_err();
        assert!(err.to_string().contains("2 start time(s)"));
        assert_eq!(
            err.downcast_ref::<AnalysisError>(),
            Some(&AnalysisError::MismatchedEventCount {
                starts: 2,
                stops: 1
            })
        );
    }
}
