use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::data::loader::{LoadOptions, DEFAULT_DATE_COLUMN};

// ---------------------------------------------------------------------------
// Dashboard configuration (optional JSON file)
// ---------------------------------------------------------------------------

/// Settings normally supplied through a JSON file. Every field has a
/// default, so `{}` is a valid configuration.
///
/// ```json
/// {
///   "input": "data/Superstore.csv",
///   "delimiter": ";",
///   "facets": ["Region", "State", "City"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Dataset used when no file is given on the command line.
    pub input: Option<PathBuf>,
    /// Field separator for delimited text.
    pub delimiter: char,
    pub date_column: String,
    /// Column summed by every view.
    pub measure: String,
    /// Columns offered as filters, in display order.
    pub facets: Vec<String>,
    /// Where download files are written.
    pub out_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            input: None,
            delimiter: ',',
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            measure: "Sales".to_string(),
            facets: vec!["Region".into(), "State".into(), "City".into()],
            out_dir: None,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        delimiter_byte(self.delimiter)?;
        if self.date_column.is_empty() {
            bail!("date_column must not be empty");
        }
        if self.measure.is_empty() {
            bail!("measure must not be empty");
        }
        Ok(())
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            delimiter: delimiter_byte(self.delimiter)?,
            date_column: self.date_column.clone(),
        })
    }
}

/// The CSV reader splits on a single byte.
pub fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() && c != '\n' && c != '\r' && c != '"' {
        Ok(c as u8)
    } else {
        bail!("delimiter must be a single ASCII character other than a quote or newline, got {c:?}")
    }
}
