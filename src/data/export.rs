//! Comma-separated export of datasets and derived tables.
//!
//! Output is byte-for-byte reproducible: header row first, `\n` record
//! terminator, every value in its [`Display`](std::fmt::Display) form and
//! nulls / absent pivot cells as empty fields.

use csv::{Terminator, Writer, WriterBuilder};

use super::aggregate::{AggregateTable, PivotTable};
use super::error::{PipelineError, Result};
use super::model::{Dataset, Value};

fn writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?;
    // Every field written came from a `&str`.
    String::from_utf8(bytes).map_err(|e| {
        PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn fields<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<String> {
    values.into_iter().map(Value::to_string).collect()
}

pub fn dataset_to_csv(dataset: &Dataset) -> Result<String> {
    let mut w = writer();
    w.write_record(dataset.columns())?;
    for row in dataset.rows() {
        w.write_record(fields(row))?;
    }
    finish(w)
}

/// Key columns followed by the measure column.
pub fn table_to_csv(table: &AggregateTable) -> Result<String> {
    let mut w = writer();
    let header = table.dimensions.iter().chain(std::iter::once(&table.measure));
    w.write_record(header)?;
    for row in &table.rows {
        w.write_record(fields(row.key.iter().chain(std::iter::once(&row.value))))?;
    }
    finish(w)
}

/// Row dimension header, then one column per column key.
pub fn pivot_to_csv(table: &PivotTable) -> Result<String> {
    let mut w = writer();
    let mut header = vec![table.row_dimension.clone()];
    header.extend(table.column_keys.iter().map(Value::to_string));
    w.write_record(&header)?;

    for (key, cells) in table.row_keys.iter().zip(&table.cells) {
        let mut record = vec![key.to_string()];
        record.extend(
            cells
                .iter()
                .map(|c| c.as_ref().map(Value::to_string).unwrap_or_default()),
        );
        w.write_record(&record)?;
    }
    finish(w)
}
