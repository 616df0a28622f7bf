use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::debug;

use super::error::{PipelineError, Result};
use super::model::{Dataset, Value};

/// Date-only layouts tried in order. Month-first wins for `a/b/yyyy`.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y", "%m-%d-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Two-digit-year layouts, only tried after the four-digit ones.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

/// Best-effort date parse. Returns `None` for anything unrecognised.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // chrono's `%Y` happily reads "23" as year 23; reject such readings so
    // the short-year layouts get a chance.
    let plausible = |d: &NaiveDate| (1000..=9999).contains(&d.year());

    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(plausible)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|ts| ts.date())
                .find(plausible)
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.date_naive()))
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

fn coerce(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Convert `date_column` to [`Value::Date`], dropping rows whose value
/// cannot be read as a date.
///
/// Normalizing an already normalized dataset returns an equal dataset.
pub fn normalize(dataset: &Dataset, date_column: &str) -> Result<Dataset> {
    let idx = dataset
        .column_index(date_column)
        .ok_or_else(|| PipelineError::UnknownColumn(date_column.to_string()))?;

    let mut out = Dataset::new(dataset.columns().to_vec());
    out.set_date_column(date_column);

    for row in dataset.rows() {
        let Some(date) = coerce(&row[idx]) else {
            continue;
        };
        let mut row = row.clone();
        row[idx] = Value::Date(date);
        out.push_row(row);
    }

    let dropped = dataset.len() - out.len();
    if dropped > 0 {
        debug!("dropped {dropped} row(s) with unparseable '{date_column}'");
    }

    if out.is_empty() {
        return Err(PipelineError::EmptyDataset(date_column.to_string()));
    }
    Ok(out)
}

/// `(min, max)` of the normalized date column. `None` when the dataset has
/// not been normalized or holds no dates.
pub fn date_bounds(dataset: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
    let idx = dataset.column_index(dataset.date_column()?)?;
    let mut dates = dataset.rows().iter().filter_map(|r| r[idx].as_date());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}
