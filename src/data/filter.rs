use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::dates::date_bounds;
use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Filter predicate: date interval + selected values per facet column
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` date range. An inverted range matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The interval covering every row of a normalized dataset.
    pub fn spanning(dataset: &Dataset) -> Option<Self> {
        date_bounds(dataset).map(|(start, end)| Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Per-column selection state: maps column_name → set of allowed values.
/// If a column is absent or its set is empty, it means "no filter".
///
/// Values are matched against each cell's display text, so `"10024"`
/// selects an integer postal code as well as a string one.
pub type FacetSelection = BTreeMap<String, BTreeSet<String>>;

fn cell_selected(cell: &Value, selected: &BTreeSet<String>) -> bool {
    match cell {
        Value::String(s) => selected.contains(s),
        other => selected.contains(&other.to_string()),
    }
}

/// Return indices of rows that pass the date interval and all active facets.
///
/// A row passes a facet when:
/// * The facet set is empty → passes (no constraint)
/// * The dataset has no such column → fails
/// * The row's value for that column is in the selected set → passes
///
/// A dataset without a normalized date column is filtered by facets only.
pub fn filtered_indices(
    dataset: &Dataset,
    interval: &DateInterval,
    facets: &FacetSelection,
) -> Vec<usize> {
    let date_idx = dataset.date_column().and_then(|c| dataset.column_index(c));

    // Resolve facet columns once; `None` means the column does not exist.
    let active: Vec<(Option<usize>, &BTreeSet<String>)> = facets
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .map(|(col, selected)| (dataset.column_index(col), selected))
        .collect();

    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            if let Some(idx) = date_idx {
                match row[idx].as_date() {
                    Some(date) if interval.contains(date) => {}
                    _ => return false,
                }
            }
            active.iter().all(|(idx, selected)| match idx {
                Some(idx) => cell_selected(&row[*idx], selected),
                None => false,
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Restrict `dataset` to the rows passing `interval` and `facets`,
/// preserving row order. Never fails; out-of-domain inputs give an
/// empty or smaller result.
pub fn filter(dataset: &Dataset, interval: &DateInterval, facets: &FacetSelection) -> Dataset {
    dataset.take(&filtered_indices(dataset, interval, facets))
}
