use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;
use log::{debug, warn};

use super::dates::parse_date;
use super::error::{PipelineError, Result};
use super::model::{Dataset, Row, Value};

/// Column every dataset must carry unless the caller names another one.
pub const DEFAULT_DATE_COLUMN: &str = "Order Date";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// The two supported input layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Delimited text (`.csv`, `.txt`).
    Delimited,
    /// Excel workbook (`.xlsx`, `.xls`); only the first sheet is read.
    Spreadsheet,
}

impl FileKind {
    /// Map a file extension (case-insensitive, without the dot) to a kind.
    pub fn from_extension(ext: &str) -> Result<FileKind> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Ok(FileKind::Delimited),
            "xlsx" | "xls" => Ok(FileKind::Spreadsheet),
            other => Err(PipelineError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    pub fn from_path(path: &Path) -> Result<FileKind> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        FileKind::from_extension(ext)
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field separator for delimited text. Ignored for spreadsheets.
    pub delimiter: u8,
    /// Column that must be present in the header.
    pub date_column: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_column: DEFAULT_DATE_COLUMN.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset from a file. Dispatch by extension.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let kind = FileKind::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load(&bytes, kind, options)
}

/// Parse an in-memory upload into a [`Dataset`].
///
/// Fails with [`PipelineError::MissingColumn`] when the header lacks
/// `options.date_column`.
pub fn load(bytes: &[u8], kind: FileKind, options: &LoadOptions) -> Result<Dataset> {
    let dataset = match kind {
        FileKind::Delimited => load_delimited(bytes, options.delimiter),
        FileKind::Spreadsheet => load_spreadsheet(bytes)?,
    };

    if dataset.column_index(&options.date_column).is_none() {
        return Err(PipelineError::MissingColumn(options.date_column.clone()));
    }

    debug!(
        "loaded {} rows x {} columns ({kind:?})",
        dataset.len(),
        dataset.columns().len()
    );
    Ok(dataset)
}

/// First `n` lines of a delimited upload, decoded the same way the loader
/// decodes fields.
pub fn preview_lines(bytes: &[u8], n: usize) -> Vec<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.lines().take(n).map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// First record is the header. Records whose width differs from the header,
/// or that the reader cannot parse, are skipped.
fn load_delimited(bytes: &[u8], delimiter: u8) -> Dataset {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        // Header handled manually so a bad header row is not fatal.
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.byte_records();

    let columns: Vec<String> = match records.next() {
        Some(Ok(header)) => decode_record(&header).map(Cow::into_owned).collect(),
        Some(Err(e)) => {
            warn!("unreadable header row: {e}");
            Vec::new()
        }
        None => Vec::new(),
    };

    let mut dataset = Dataset::new(columns);
    let mut skipped = 0usize;

    for (row_no, result) in records.enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping row {}: {e}", row_no + 2);
                skipped += 1;
                continue;
            }
        };

        let row: Row = decode_record(&record).map(|s| Value::infer(&s)).collect();
        if !dataset.push_row(row) {
            debug!(
                "skipping row {}: expected {} fields, found {}",
                row_no + 2,
                dataset.columns().len(),
                record.len()
            );
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} malformed row(s)");
    }
    dataset
}

/// Latin-1 family decoding accepts every byte, so this never fails. No BOM
/// sniffing: a field starting with `FF FE` is `ÿþ`, not UTF-16.
fn decode_record(record: &ByteRecord) -> impl Iterator<Item = Cow<'_, str>> {
    record.iter().map(|field| {
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(field);
        text
    })
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

fn load_spreadsheet(bytes: &[u8]) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => {
            warn!("workbook has no sheets");
            return Ok(Dataset::default());
        }
    };

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(header_name).collect(),
        None => Vec::new(),
    };

    let mut dataset = Dataset::new(columns);
    for row in rows {
        // `Range` is rectangular, so widths always agree with the header.
        dataset.push_row(row.iter().map(cell_value).collect());
    }
    Ok(dataset)
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Value::Date(ts.date()),
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_date(s)
            .map(Value::Date)
            .unwrap_or_else(|| Value::String(s.clone())),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Order Date,Region,City,Sales
11/8/2016,South,Henderson,261.96
11/8/2016,South,Henderson,731.94
6/12/2016,West,Los Angeles,14.62
";

    #[test]
    fn extension_dispatch() {
        assert_eq!(FileKind::from_extension("CSV").unwrap(), FileKind::Delimited);
        assert_eq!(FileKind::from_extension("txt").unwrap(), FileKind::Delimited);
        assert_eq!(FileKind::from_extension("xlsx").unwrap(), FileKind::Spreadsheet);
        assert!(matches!(
            FileKind::from_extension("parquet"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            FileKind::from_path(Path::new("data")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn loads_delimited_text_with_types() {
        let ds = load(SAMPLE.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap();
        assert_eq!(ds.columns(), ["Order Date", "Region", "City", "Sales"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.value(0, "Sales"), Some(&Value::Float(261.96)));
        assert_eq!(ds.value(2, "City"), Some(&Value::from("Los Angeles")));
        // Dates stay text until normalized.
        assert_eq!(ds.value(0, "Order Date"), Some(&Value::from("11/8/2016")));
    }

    #[test]
    fn skips_rows_with_wrong_field_count() {
        let text = "\
Order Date,Region,Sales
2023-01-05,East,100
2023-01-06,East
2023-01-07,West,5,extra
2023-01-08,West,7
";
        let ds = load(text.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, "Sales"), Some(&Value::Integer(7)));
    }

    #[test]
    fn honours_custom_delimiter() {
        let text = "Order Date;Region;Sales\n2023-01-05;East;100,5\n";
        let options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        let ds = load(text.as_bytes(), FileKind::Delimited, &options).unwrap();
        assert_eq!(ds.value(0, "Sales"), Some(&Value::from("100,5")));
    }

    #[test]
    fn decodes_latin1_bytes() {
        let mut bytes = b"Order Date,City\n2023-01-05,".to_vec();
        bytes.extend_from_slice(&[b'M', 0xE9, b'r', b'i', b'd', b'a']);
        bytes.push(b'\n');
        let ds = load(&bytes, FileKind::Delimited, &LoadOptions::default()).unwrap();
        assert_eq!(ds.value(0, "City"), Some(&Value::from("Mérida")));
    }

    #[test]
    fn utf16_byte_order_mark_in_a_field_is_latin1_text() {
        let mut bytes = b"Order Date,City\n2023-01-05,".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE, b'a', b'b']);
        bytes.push(b'\n');
        let ds = load(&bytes, FileKind::Delimited, &LoadOptions::default()).unwrap();
        assert_eq!(ds.value(0, "City"), Some(&Value::from("ÿþab")));
    }

    #[test]
    fn strips_byte_order_mark() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Order Date,Sales\n2023-01-05,1\n");
        let ds = load(&bytes, FileKind::Delimited, &LoadOptions::default()).unwrap();
        assert_eq!(ds.columns()[0], "Order Date");
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let text = "Ship Date,Sales\n2023-01-05,1\n";
        let err = load(text.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "Order Date"));
    }

    #[test]
    fn empty_input_is_missing_the_date_column() {
        let err = load(b"", FileKind::Delimited, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(_)));
    }

    #[test]
    fn garbage_spreadsheet_is_a_reader_error() {
        let err = load(b"not a workbook", FileKind::Spreadsheet, &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spreadsheet(_)));
    }

    #[test]
    fn preview_returns_leading_lines() {
        let lines = preview_lines(SAMPLE.as_bytes(), 2);
        assert_eq!(
            lines,
            vec!["Order Date,Region,City,Sales", "11/8/2016,South,Henderson,261.96"]
        );
    }

    #[test]
    fn preview_does_not_sniff_utf16() {
        let bytes = [0xFE, 0xFF, b'O', b'r', b'd', b'\n', b'x', b'\n'];
        assert_eq!(preview_lines(&bytes, 2), vec!["þÿOrd", "x"]);
    }

    fn sales_workbook() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for (col, name) in ["Order Date", "Region", "Sales"].into_iter().enumerate() {
            sheet.write_string(0, col as u16, name).unwrap();
        }
        let orders = [
            ((2023, 1, 5), "East", 100.0),
            ((2023, 1, 20), "East", 30.0),
            ((2023, 2, 10), "West", 50.0),
        ];
        for (i, ((y, m, d), region, sales)) in orders.into_iter().enumerate() {
            let row = i as u32 + 1;
            let date = ExcelDateTime::from_ymd(y, m, d).unwrap();
            sheet.write_datetime_with_format(row, 0, &date, &date_format).unwrap();
            sheet.write_string(row, 1, region).unwrap();
            sheet.write_number(row, 2, sales).unwrap();
        }
        // Undated row: dropped by normalization.
        sheet.write_string(4, 1, "West").unwrap();
        sheet.write_number(4, 2, 7.0).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn loads_first_sheet_of_a_workbook() {
        use crate::data::{aggregate, normalize};

        let bytes = sales_workbook();
        let ds = load(&bytes, FileKind::Spreadsheet, &LoadOptions::default()).unwrap();
        assert_eq!(ds.columns(), ["Order Date", "Region", "Sales"]);
        assert_eq!(ds.len(), 4);
        let first: Vec<Value> = ds.rows()[0].to_vec();
        assert_eq!(
            first,
            vec![
                Value::Date(chrono::NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()),
                Value::from("East"),
                Value::Float(100.0),
            ]
        );
        assert_eq!(ds.value(3, "Order Date"), Some(&Value::Null));

        let ds = normalize(&ds, "Order Date").unwrap();
        assert_eq!(ds.len(), 3);
        let table = aggregate(&ds, &["Region"], "Sales").unwrap();
        assert_eq!(table.get(&[Value::from("East")]), Some(&Value::Float(130.0)));
        assert_eq!(table.get(&[Value::from("West")]), Some(&Value::Float(50.0)));
    }
}
