use serde::Serialize;

use crate::data::aggregate::{
    aggregate, aggregate_by, pivot, AggregateTable, Dimension, PivotTable,
};
use crate::data::error::{PipelineError, Result};
use crate::data::model::Dataset;

/// Columns of the sample table, in display order.
pub const SAMPLE_COLUMNS: &[&str] = &[
    "Region", "State", "City", "Category", "Sales", "Profit", "Quantity",
];

const SAMPLE_ROWS: usize = 5;

/// Row cap of the raw-data view.
pub const PREVIEW_ROWS: usize = 500;

/// Which columns feed the dashboard.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub date_column: String,
    pub measure: String,
}

/// One point of the sales / profit scatter; `size` is the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// Every derived view the dashboard shows, built from one filter state.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardViews {
    pub category: AggregateTable,
    pub region: AggregateTable,
    pub segment: AggregateTable,
    pub time_series: AggregateTable,
    /// Region › Category › Sub-Category.
    pub hierarchy: AggregateTable,
    /// Sub-Category × month name.
    pub sub_category_by_month: PivotTable,
    /// First rows of [`SAMPLE_COLUMNS`] from the date-filtered data.
    pub sample: Dataset,
    /// Raw filtered rows: every second column from position 1 up to 19.
    pub preview: Dataset,
    pub scatter: Vec<ScatterPoint>,
}

impl DashboardViews {
    /// `date_filtered` is restricted by the date interval only; `filtered`
    /// additionally by the facets.
    pub fn build(date_filtered: &Dataset, filtered: &Dataset, config: &ViewConfig) -> Result<Self> {
        let measure = config.measure.as_str();
        Ok(DashboardViews {
            category: aggregate(filtered, &["Category"], measure)?,
            region: aggregate(filtered, &["Region"], measure)?,
            segment: aggregate(filtered, &["Segment"], measure)?,
            time_series: aggregate_by(
                filtered,
                &[Dimension::MonthLabel(config.date_column.clone())],
                measure,
            )?,
            hierarchy: aggregate(filtered, &["Region", "Category", "Sub-Category"], measure)?,
            sub_category_by_month: pivot(
                filtered,
                "Sub-Category",
                Dimension::MonthName(config.date_column.clone()),
                measure,
            )?,
            sample: select(date_filtered, SAMPLE_COLUMNS)?.head(SAMPLE_ROWS),
            preview: column_slice(&filtered.head(PREVIEW_ROWS), 1, 20, 2),
            scatter: scatter(filtered, "Sales", "Profit", "Quantity")?,
        })
    }
}

/// Project `dataset` onto `columns`, in the order given.
pub fn select(dataset: &Dataset, columns: &[&str]) -> Result<Dataset> {
    let idx = columns
        .iter()
        .map(|c| {
            dataset
                .column_index(c)
                .ok_or_else(|| PipelineError::UnknownColumn(c.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut out = Dataset::new(columns.iter().map(|c| c.to_string()).collect());
    for row in dataset.rows() {
        out.push_row(idx.iter().map(|&i| row[i].clone()).collect());
    }
    Ok(out)
}

/// Keep the columns at positions `start, start + step, ...` below `end`.
/// Positions past the last column are ignored, so this never fails.
pub fn column_slice(dataset: &Dataset, start: usize, end: usize, step: usize) -> Dataset {
    let end = end.min(dataset.columns().len());
    let idx: Vec<usize> = (start..end).step_by(step.max(1)).collect();

    let mut out = Dataset::new(idx.iter().map(|&i| dataset.columns()[i].clone()).collect());
    for row in dataset.rows() {
        out.push_row(idx.iter().map(|&i| row[i].clone()).collect());
    }
    out
}

/// Points for rows where all three columns are numeric.
pub fn scatter(dataset: &Dataset, x: &str, y: &str, size: &str) -> Result<Vec<ScatterPoint>> {
    let projected = select(dataset, &[x, y, size])?;
    Ok(projected
        .rows()
        .iter()
        .filter_map(|r| {
            Some(ScatterPoint {
                x: r[0].as_f64()?,
                y: r[1].as_f64()?,
                size: r[2].as_f64()?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dates::normalize;
    use crate::data::loader::{load, FileKind, LoadOptions};
    use crate::data::model::Value;
    use pretty_assertions::assert_eq;

    const SUPERSTORE: &str = "\
Order Date,Region,State,City,Segment,Category,Sub-Category,Sales,Profit,Quantity
2016-11-08,South,Kentucky,Henderson,Consumer,Furniture,Bookcases,261.96,41.91,2
2016-11-08,South,Kentucky,Henderson,Consumer,Furniture,Chairs,731.94,219.58,3
2016-06-12,West,California,Los Angeles,Corporate,Office Supplies,Labels,14.62,6.87,2
2015-10-11,South,Florida,Fort Lauderdale,Consumer,Furniture,Tables,957.5775,-383.031,5
";

    fn superstore() -> Dataset {
        let bytes = SUPERSTORE.as_bytes();
        let ds = load(bytes, FileKind::Delimited, &LoadOptions::default()).unwrap();
        normalize(&ds, "Order Date").unwrap()
    }

    fn config() -> ViewConfig {
        ViewConfig {
            date_column: "Order Date".into(),
            measure: "Sales".into(),
        }
    }

    #[test]
    fn builds_every_view() {
        let ds = superstore();
        let views = DashboardViews::build(&ds, &ds, &config()).unwrap();

        assert_eq!(views.category.len(), 2);
        assert_eq!(views.region.rows[0].key, vec![Value::from("South")]);
        assert_eq!(views.segment.len(), 2);
        assert_eq!(
            views.time_series.rows.iter().map(|r| r.key[0].to_string()).collect::<Vec<_>>(),
            vec!["2016-Nov", "2016-Jun", "2015-Oct"]
        );
        assert_eq!(views.hierarchy.len(), 4);
        assert_eq!(views.sub_category_by_month.row_keys.len(), 4);
        assert_eq!(views.sample.columns(), SAMPLE_COLUMNS);
        assert_eq!(views.sample.len(), 4);
        assert_eq!(
            views.preview.columns(),
            ["Region", "City", "Category", "Sales", "Quantity"]
        );
        assert_eq!(views.preview.len(), 4);
        assert_eq!(views.scatter.len(), 4);
        assert_eq!(views.scatter[3], ScatterPoint { x: 957.5775, y: -383.031, size: 5.0 });
    }

    #[test]
    fn missing_view_column_is_reported() {
        let ds = superstore();
        let no_segment = select(&ds, &["Order Date", "Region", "Category", "Sales"]).unwrap();
        let err = DashboardViews::build(&no_segment, &no_segment, &config()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(c) if c == "Segment"));
    }

    #[test]
    fn select_reorders_columns() {
        let ds = superstore();
        let out = select(&ds, &["Sales", "Region"]).unwrap();
        assert_eq!(out.columns(), ["Sales", "Region"]);
        assert_eq!(out.value(0, "Sales"), Some(&Value::Float(261.96)));
    }

    #[test]
    fn column_slice_steps_and_clamps() {
        let ds = superstore();
        let out = column_slice(&ds, 1, 20, 2);
        assert_eq!(out.columns(), ["Region", "City", "Category", "Sales", "Quantity"]);
        assert_eq!(out.value(1, "Sales"), Some(&Value::Float(731.94)));

        assert!(column_slice(&ds, 12, 20, 2).columns().is_empty());
        assert_eq!(column_slice(&ds, 0, 3, 1).columns(), ["Order Date", "Region", "State"]);
    }
}
