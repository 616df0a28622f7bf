use std::collections::HashMap;

use serde::Serialize;

use super::error::{PipelineError, Result};
use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Something rows can be grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// The raw value of a column.
    Column(String),
    /// `YYYY-Mon` label (e.g. `2023-Jan`) of a date column.
    MonthLabel(String),
    /// Full month name (e.g. `January`) of a date column; years collapse.
    MonthName(String),
}

impl Dimension {
    /// Header used for this dimension in output tables.
    pub fn label(&self) -> &str {
        match self {
            Dimension::Column(c) => c,
            Dimension::MonthLabel(_) => "month_year",
            Dimension::MonthName(_) => "month",
        }
    }

    fn source(&self) -> &str {
        match self {
            Dimension::Column(c) | Dimension::MonthLabel(c) | Dimension::MonthName(c) => c,
        }
    }

    /// Group key for one cell. Non-date cells have no month.
    fn key(&self, cell: &Value) -> Value {
        match self {
            Dimension::Column(_) => cell.clone(),
            Dimension::MonthLabel(_) => cell
                .as_date()
                .map(|d| Value::String(d.format("%Y-%b").to_string()))
                .unwrap_or(Value::Null),
            Dimension::MonthName(_) => cell
                .as_date()
                .map(|d| Value::String(d.format("%B").to_string()))
                .unwrap_or(Value::Null),
        }
    }
}

impl From<&str> for Dimension {
    fn from(column: &str) -> Self {
        Dimension::Column(column.to_string())
    }
}

fn column(dataset: &Dataset, name: &str) -> Result<usize> {
    dataset
        .column_index(name)
        .ok_or_else(|| PipelineError::UnknownColumn(name.to_string()))
}

fn is_float_column(dataset: &Dataset, idx: usize) -> bool {
    dataset.rows().iter().any(|r| matches!(r[idx], Value::Float(_)))
}

// ---------------------------------------------------------------------------
// Running sum
// ---------------------------------------------------------------------------

/// Integer measures stay integers; one float contribution makes the sum a
/// float. Non-numeric cells are ignored.
///
/// A group with no float contribution of its own is still reported as a
/// float when the measure column holds floats elsewhere, so an all-null group
/// in a float column sums to `0.0`.
#[derive(Debug, Clone, Copy, Default)]
struct Sum {
    int: i64,
    float: f64,
    is_float: bool,
}

impl Sum {
    fn add(&mut self, cell: &Value) {
        match cell {
            Value::Integer(i) => match self.int.checked_add(*i) {
                Some(total) => self.int = total,
                None => {
                    self.float += *i as f64;
                    self.is_float = true;
                }
            },
            Value::Float(v) => {
                self.float += v;
                self.is_float = true;
            }
            _ => {}
        }
    }

    fn value(&self, float_column: bool) -> Value {
        if self.is_float || float_column {
            Value::Float(self.float + self.int as f64)
        } else {
            Value::Integer(self.int)
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Vec<Value>,
    pub value: Value,
}

/// Grouped-and-summed view, one row per distinct key in first-occurrence
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Output header for each key component.
    pub dimensions: Vec<String>,
    pub measure: String,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum for one key, if the key is present.
    pub fn get(&self, key: &[Value]) -> Option<&Value> {
        self.rows.iter().find(|r| r.key == key).map(|r| &r.value)
    }

    /// Group sums as floats.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(|r| r.value.as_f64())
    }

    pub fn total(&self) -> f64 {
        self.values().sum()
    }
}

/// Group `dataset` by the given columns and sum `measure` per group.
pub fn aggregate(
    dataset: &Dataset,
    group_columns: &[&str],
    measure: &str,
) -> Result<AggregateTable> {
    let dims: Vec<Dimension> = group_columns.iter().map(|c| Dimension::from(*c)).collect();
    aggregate_by(dataset, &dims, measure)
}

/// Group by arbitrary [`Dimension`]s. Rows with a null key component are
/// left out, as are their measures.
pub fn aggregate_by(
    dataset: &Dataset,
    dims: &[Dimension],
    measure: &str,
) -> Result<AggregateTable> {
    let dim_idx = dims
        .iter()
        .map(|d| column(dataset, d.source()))
        .collect::<Result<Vec<_>>>()?;
    let measure_idx = column(dataset, measure)?;

    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Sum)> = Vec::new();

    for row in dataset.rows() {
        let key: Vec<Value> = dims
            .iter()
            .zip(&dim_idx)
            .map(|(dim, &i)| dim.key(&row[i]))
            .collect();
        if key.iter().any(Value::is_null) {
            continue;
        }
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Sum::default()));
            groups.len() - 1
        });
        groups[slot].1.add(&row[measure_idx]);
    }

    let float_column = is_float_column(dataset, measure_idx);
    Ok(AggregateTable {
        dimensions: dims.iter().map(|d| d.label().to_string()).collect(),
        measure: measure.to_string(),
        rows: groups
            .into_iter()
            .map(|(key, sum)| AggregateRow {
                key,
                value: sum.value(float_column),
            })
            .collect(),
    })
}

/// Sum of `measure` over every row of `dataset`.
pub fn sum_column(dataset: &Dataset, measure: &str) -> Result<f64> {
    let idx = column(dataset, measure)?;
    Ok(dataset.rows().iter().filter_map(|r| r[idx].as_f64()).sum())
}

// ---------------------------------------------------------------------------
// Pivot table
// ---------------------------------------------------------------------------

/// Two-dimensional aggregate. `cells[r][c]` is `None` when no row carries
/// the `(row_keys[r], column_keys[c])` combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dimension: String,
    pub column_dimension: String,
    pub measure: String,
    pub row_keys: Vec<Value>,
    pub column_keys: Vec<Value>,
    pub cells: Vec<Vec<Option<Value>>>,
}

impl PivotTable {
    pub fn get(&self, row: &Value, column: &Value) -> Option<&Value> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        let c = self.column_keys.iter().position(|k| k == column)?;
        self.cells[r][c].as_ref()
    }
}

/// Cross-tabulate `measure` by two dimensions. Both axes list keys in
/// first-occurrence order.
pub fn pivot(
    dataset: &Dataset,
    row_dim: impl Into<Dimension>,
    col_dim: impl Into<Dimension>,
    measure: &str,
) -> Result<PivotTable> {
    let row_dim = row_dim.into();
    let col_dim = col_dim.into();
    let row_idx = column(dataset, row_dim.source())?;
    let col_idx = column(dataset, col_dim.source())?;
    let measure_idx = column(dataset, measure)?;

    let mut row_keys: Vec<Value> = Vec::new();
    let mut column_keys: Vec<Value> = Vec::new();
    let mut row_pos: HashMap<Value, usize> = HashMap::new();
    let mut col_pos: HashMap<Value, usize> = HashMap::new();
    let mut sums: Vec<Vec<Option<Sum>>> = Vec::new();

    for row in dataset.rows() {
        let rk = row_dim.key(&row[row_idx]);
        let ck = col_dim.key(&row[col_idx]);
        if rk.is_null() || ck.is_null() {
            continue;
        }

        let r = *row_pos.entry(rk.clone()).or_insert_with(|| {
            row_keys.push(rk);
            sums.push(vec![None; column_keys.len()]);
            row_keys.len() - 1
        });
        let c = match col_pos.get(&ck) {
            Some(&c) => c,
            None => {
                col_pos.insert(ck.clone(), column_keys.len());
                column_keys.push(ck);
                for cells in &mut sums {
                    cells.push(None);
                }
                column_keys.len() - 1
            }
        };

        sums[r][c].get_or_insert_with(Sum::default).add(&row[measure_idx]);
    }

    let float_column = is_float_column(dataset, measure_idx);
    Ok(PivotTable {
        row_dimension: row_dim.label().to_string(),
        column_dimension: col_dim.label().to_string(),
        measure: measure.to_string(),
        row_keys,
        column_keys,
        cells: sums
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|s| s.map(|s| s.value(float_column)))
                    .collect()
            })
            .collect(),
    })
}
