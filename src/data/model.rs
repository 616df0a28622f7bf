use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Value – a single cell of the dataset
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
///
/// Group-by keys are built from values, so `Value` is `Eq + Ord + Hash`.
/// Floats compare by [`f64::total_cmp`].
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Calendar date (day precision).
    Date(NaiveDate),
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

/// Natural string representation, used both for display and for CSV export.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write_float(f, *v),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => Ok(()),
        }
    }
}

/// Floats print like Python's `repr`: `130.0` for integral values, and an
/// exponent with an explicit sign and at least two digits (`1e+16`, `1e-05`)
/// outside `1e-4 <= |v| < 1e16`.
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    let magnitude = v.abs();
    if !v.is_finite() || v == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if v.is_finite() && v.fract() == 0.0 {
            write!(f, "{v:.1}")
        } else {
            write!(f, "{v}")
        };
    }

    let sci = format!("{v:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            write!(f, "{mantissa}e{sign}{digits:0>2}")
        }
        None => write!(f, "{sci}"),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    /// Guess the type of a raw text cell.
    pub fn infer(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// One record: a value per column, in column order.
pub type Row = Vec<Value>;

/// An ordered table of rows sharing one column set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Column names in file order.
    columns: Vec<String>,
    /// Rows; every row has `columns.len()` values.
    rows: Vec<Row>,
    /// Set once the date column has been normalized.
    date_column: Option<String>,
}

impl Dataset {
    /// Create an empty dataset with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Dataset {
            columns,
            rows: Vec::new(),
            date_column: None,
        }
    }

    /// Build a dataset from rows, dropping any whose width does not match
    /// the header. Returns the dataset and the number of rows dropped.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> (Self, usize) {
        let mut dataset = Dataset::new(columns);
        let mut dropped = 0;
        for row in rows {
            if !dataset.push_row(row) {
                dropped += 1;
            }
        }
        (dataset, dropped)
    }

    /// Append a row. Rejects (returns `false`) rows of the wrong width.
    pub fn push_row(&mut self, row: Row) -> bool {
        if row.len() != self.columns.len() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Name of the normalized date column, if [`normalize`](crate::data::dates::normalize)
    /// has been applied.
    pub fn date_column(&self) -> Option<&str> {
        self.date_column.as_deref()
    }

    pub(crate) fn set_date_column(&mut self, column: &str) {
        self.date_column = Some(column.to_string());
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, column)`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Distinct values of a column in first-occurrence order.
    /// Unknown columns yield an empty list.
    pub fn unique_values(&self, column: &str) -> Vec<Value> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| &r[idx])
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect()
    }

    /// A dataset with the same header (and date column) holding the rows at
    /// `indices`, in the order given.
    pub fn take(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            date_column: self.date_column.clone(),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Dataset {
        let n = n.min(self.rows.len());
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows[..n].to_vec(),
            date_column: self.date_column.clone(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
