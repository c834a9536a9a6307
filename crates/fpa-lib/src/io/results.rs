use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One line of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub behavior: String,
    pub auc: f64,
    pub max_zscore: f64,
    /// Seconds after event start.
    pub max_zscore_location: f64,
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "behavior:{} auc:{} zscore:{} max_zscore_location:{}",
            self.behavior, self.auc, self.max_zscore, self.max_zscore_location
        )
    }
}

/// Append one line per record, creating the file if needed.
pub fn append_results(path: &Path, records: &[ResultRecord]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for record in records {
        writeln!(file, "{}", record).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
