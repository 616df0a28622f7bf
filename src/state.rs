use std::collections::BTreeSet;

use crate::data::filter::{filter, DateInterval, FacetSelection};
use crate::data::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One analysis session: a normalized dataset plus the current filter
/// selections. The filtered views are recomputed after every change.
pub struct Session {
    /// Normalized dataset, never modified.
    dataset: Dataset,

    /// Full date range of `dataset`.
    bounds: DateInterval,

    /// Current date interval.
    interval: DateInterval,

    /// Per-column facet selections.
    facets: FacetSelection,

    /// `dataset` restricted to `interval` only (cached).
    date_filtered: Dataset,

    /// `dataset` restricted to `interval` and `facets` (cached).
    filtered: Dataset,
}

impl Session {
    /// Start a session over a normalized dataset with everything selected.
    /// Returns `None` when the dataset has no dates to span.
    pub fn new(dataset: Dataset) -> Option<Self> {
        let bounds = DateInterval::spanning(&dataset)?;
        let mut session = Session {
            date_filtered: Dataset::default(),
            filtered: Dataset::default(),
            dataset,
            bounds,
            interval: bounds,
            facets: FacetSelection::new(),
        };
        session.refilter();
        Some(session)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn bounds(&self) -> DateInterval {
        self.bounds
    }

    pub fn interval(&self) -> DateInterval {
        self.interval
    }

    pub fn facets(&self) -> &FacetSelection {
        &self.facets
    }

    /// Rows inside the current interval, ignoring facets.
    pub fn date_filtered(&self) -> &Dataset {
        &self.date_filtered
    }

    /// Rows passing the interval and every facet.
    pub fn filtered(&self) -> &Dataset {
        &self.filtered
    }

    /// Recompute both cached views after a selection change.
    fn refilter(&mut self) {
        self.date_filtered = filter(&self.dataset, &self.interval, &FacetSelection::new());
        self.filtered = filter(&self.date_filtered, &self.interval, &self.facets);
        log::debug!(
            "{} of {} rows in range, {} after facets",
            self.date_filtered.len(),
            self.dataset.len(),
            self.filtered.len()
        );
    }

    pub fn set_interval(&mut self, interval: DateInterval) {
        self.interval = interval;
        self.refilter();
    }

    /// Values offered for a facet: those present in the date range.
    pub fn facet_options(&self, column: &str) -> Vec<Value> {
        self.date_filtered.unique_values(column)
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_facet_value(&mut self, column: &str, value: &str) {
        let selected = self.facets.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Replace a column's selection.
    pub fn select_values<I, S>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.facets.insert(column.to_string(), values);
        self.refilter();
    }

    /// Drop a column's selection; the column no longer filters.
    pub fn clear_facet(&mut self, column: &str) {
        self.facets.remove(column);
        self.refilter();
    }
}
