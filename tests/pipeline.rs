use std::io::Write;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use sales_lens::data::aggregate::{aggregate_by, sum_column, AggregateRow};
use sales_lens::data::export::table_to_csv;
use sales_lens::data::{
    aggregate, filter, load, load_file, normalize, DateInterval, Dimension, FacetSelection,
    FileKind, LoadOptions, PipelineError, Value,
};

const ORDERS: &str = "\
Order Date,Region,State,City,Category,Sales
2023-01-05,East,New York,New York City,Furniture,100
2023-02-10,West,California,Los Angeles,Technology,50
2023-01-20,East,Ohio,Columbus,Furniture,30
";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn january() -> DateInterval {
    DateInterval::new(ymd(2023, 1, 1), ymd(2023, 1, 31))
}

fn orders() -> sales_lens::data::Dataset {
    let ds = load(ORDERS.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap();
    normalize(&ds, "Order Date").unwrap()
}

#[test]
fn january_east_scenario() {
    let filtered = filter(&orders(), &january(), &FacetSelection::new());
    assert_eq!(filtered.len(), 2);

    let table = aggregate(&filtered, &["Region"], "Sales").unwrap();
    assert_eq!(
        table.rows,
        vec![AggregateRow {
            key: vec![Value::from("East")],
            value: Value::Integer(130),
        }]
    );
}

#[test]
fn month_label_scenario() {
    let table = aggregate_by(
        &orders(),
        &[Dimension::MonthLabel("Order Date".into())],
        "Sales",
    )
    .unwrap();
    assert_eq!(
        table_to_csv(&table).unwrap(),
        "month_year,Sales\n2023-Jan,130\n2023-Feb,50\n"
    );
}

#[test]
fn filter_is_idempotent() {
    let ds = orders();
    let mut facets = FacetSelection::new();
    facets.insert("Region".into(), ["East".to_string()].into());
    let once = filter(&ds, &january(), &facets);
    assert_eq!(filter(&once, &january(), &facets), once);
}

#[test]
fn empty_selections_filter_by_date_only() {
    let ds = orders();
    let mut empty = FacetSelection::new();
    for col in ["Region", "State", "City"] {
        empty.insert(col.into(), Default::default());
    }
    assert_eq!(
        filter(&ds, &january(), &empty),
        filter(&ds, &january(), &FacetSelection::new())
    );
}

#[test]
fn grouping_conserves_the_measure() {
    let ds = orders();
    for group in [&["Region"][..], &["Category", "State"][..], &["City"][..]] {
        let table = aggregate(&ds, group, "Sales").unwrap();
        assert_eq!(table.total(), sum_column(&ds, "Sales").unwrap());
    }
}

#[test]
fn malformed_row_is_skipped_silently() {
    let text = "\
Order Date,Region,Sales
2023-01-05,East,100
2023-01-06,\"East\",1,2,3
2023-02-10,West,50
";
    let ds = load(text.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.value(1, "Region"), Some(&Value::from("West")));
}

#[test]
fn missing_date_column_produces_no_dataset() {
    let text = "Ship Date,Region,Sales\n2023-01-05,East,100\n";
    let err = load(text.as_bytes(), FileKind::Delimited, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(_)));
}

#[test]
fn load_file_dispatches_on_extension() {
    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    csv.write_all(ORDERS.as_bytes()).unwrap();
    let ds = load_file(csv.path(), &LoadOptions::default()).unwrap();
    assert_eq!(ds.len(), 3);

    let mut tsv = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    tsv.write_all(ORDERS.replace(',', "\t").as_bytes()).unwrap();
    let options = LoadOptions {
        delimiter: b'\t',
        ..LoadOptions::default()
    };
    assert_eq!(load_file(tsv.path(), &options).unwrap().len(), 3);

    let json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    assert!(matches!(
        load_file(json.path(), &LoadOptions::default()),
        Err(PipelineError::UnsupportedFormat(_))
    ));
}
