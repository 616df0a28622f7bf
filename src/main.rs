use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use sales_lens::config::DashboardConfig;
use sales_lens::data::export::{dataset_to_csv, pivot_to_csv, table_to_csv};
use sales_lens::data::loader::{self, FileKind};
use sales_lens::data::{normalize, AggregateTable, DateInterval};
use sales_lens::state::Session;
use sales_lens::views::{DashboardViews, ViewConfig};

const PREVIEW_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Filter a sales export by date and geography and summarise it.
#[derive(Debug, Parser)]
#[command(name = "sales-lens", version)]
struct Cli {
    /// Dataset to load (.csv, .txt, .xlsx, .xls). Defaults to `input` from the config file.
    input: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field delimiter for .csv/.txt input.
    #[arg(long)]
    delimiter: Option<char>,

    #[arg(long)]
    date_column: Option<String>,

    /// Column summed in every view.
    #[arg(long)]
    measure: Option<String>,

    /// First order date to include (YYYY-MM-DD). Defaults to the earliest date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD). Defaults to the latest date.
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long = "region", value_name = "REGION")]
    regions: Vec<String>,

    #[arg(long = "state", value_name = "STATE")]
    states: Vec<String>,

    #[arg(long = "city", value_name = "CITY")]
    cities: Vec<String>,

    /// Any other facet, as COLUMN=VALUE. Repeatable.
    #[arg(long = "facet", value_name = "COLUMN=VALUE", value_parser = parse_facet)]
    facets: Vec<(String, String)>,

    /// Directory for the download files.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print the first lines of a delimited file before parsing it.
    #[arg(long)]
    preview: bool,
}

fn parse_facet(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((col, val)) if !col.is_empty() => Ok((col.to_string(), val.to_string())),
        _ => Err(format!("expected COLUMN=VALUE, got '{s}'")),
    }
}

impl Cli {
    /// Command-line values take precedence over the config file.
    fn resolve_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if let Some(d) = self.delimiter {
            config.delimiter = d;
        }
        if let Some(c) = &self.date_column {
            config.date_column = c.clone();
        }
        if let Some(m) = &self.measure {
            config.measure = m.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.out_dir = Some(dir.clone());
        }
        Ok(config)
    }

    /// Facet selections grouped by column, in first-mention order.
    fn selections(&self) -> Vec<(String, Vec<String>)> {
        let mut out: Vec<(String, Vec<String>)> = Vec::new();
        let named = [
            ("Region", &self.regions),
            ("State", &self.states),
            ("City", &self.cities),
        ];
        let pairs = named
            .iter()
            .flat_map(|(col, vals)| vals.iter().map(move |v| (col.to_string(), v.clone())))
            .chain(self.facets.iter().cloned());

        for (col, val) in pairs {
            match out.iter_mut().find(|(c, _)| *c == col) {
                Some((_, vals)) => vals.push(val),
                None => out.push((col, vec![val])),
            }
        }
        out
    }
}

#[derive(Serialize)]
struct Report<'a> {
    input: &'a Path,
    bounds: DateInterval,
    interval: DateInterval,
    rows: usize,
    filtered_rows: usize,
    views: &'a DashboardViews,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    let Some(input) = config.input.clone() else {
        bail!("no input file given and no `input` in the configuration");
    };

    let kind = FileKind::from_path(&input)?;
    let bytes = std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;

    if cli.preview && kind == FileKind::Delimited {
        println!("Preview ({} lines):", PREVIEW_LINES);
        for line in loader::preview_lines(&bytes, PREVIEW_LINES) {
            println!("  {line}");
        }
        println!();
    }

    let dataset = loader::load(&bytes, kind, &config.load_options()?)
        .with_context(|| format!("loading {}", input.display()))?;
    let dataset = normalize(&dataset, &config.date_column)?;
    info!("{} dated rows in {}", dataset.len(), input.display());

    let mut session = Session::new(dataset).context("dataset has no order dates")?;
    let bounds = session.bounds();
    session.set_interval(DateInterval::new(
        cli.start.unwrap_or(bounds.start),
        cli.end.unwrap_or(bounds.end),
    ));

    for (column, values) in cli.selections() {
        if !config.facets.contains(&column) {
            warn!("'{column}' is not a configured facet; filtering on it anyway");
        }
        session.select_values(&column, values);
    }

    let view_config = ViewConfig {
        date_column: config.date_column.clone(),
        measure: config.measure.clone(),
    };
    let views = DashboardViews::build(session.date_filtered(), session.filtered(), &view_config)?;

    match cli.format {
        Format::Text => print_summary(&config, &session, &views),
        Format::Json => {
            let report = Report {
                input: &input,
                bounds,
                interval: session.interval(),
                rows: session.dataset().len(),
                filtered_rows: session.filtered().len(),
                views: &views,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if let Some(dir) = &config.out_dir {
        write_downloads(dir, &session, &views)?;
    }
    Ok(())
}

fn print_summary(config: &DashboardConfig, session: &Session, views: &DashboardViews) {
    let interval = session.interval();
    println!(
        "{} of {} rows between {} and {}",
        session.filtered().len(),
        session.dataset().len(),
        interval.start,
        interval.end
    );

    for facet in &config.facets {
        let options = session.facet_options(facet);
        let selected = session.facets().get(facet).map_or(0, |s| s.len());
        println!("  {facet}: {} option(s), {selected} selected", options.len());
    }

    if session.filtered().is_empty() {
        println!("\nNo data for the current selection.");
        return;
    }

    print_table("Category wise", &views.category);
    print_table("Region wise", &views.region);
    print_table("Segment wise", &views.segment);
    print_table("Time series", &views.time_series);
    print_table("Region / Category / Sub-Category", &views.hierarchy);
}

fn print_table(title: &str, table: &AggregateTable) {
    println!("\n{title} {}:", table.measure);
    for row in &table.rows {
        let key: Vec<String> = row.key.iter().map(ToString::to_string).collect();
        println!("  {:<40} {}", key.join(" / "), row.value);
    }
}

fn write_downloads(dir: &Path, session: &Session, views: &DashboardViews) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let files = [
        ("Category.csv", table_to_csv(&views.category)?),
        ("Region.csv", table_to_csv(&views.region)?),
        ("TimeSeries.csv", table_to_csv(&views.time_series)?),
        ("SubCategoryMonth.csv", pivot_to_csv(&views.sub_category_by_month)?),
        ("FullData.csv", dataset_to_csv(session.date_filtered())?),
    ];

    for (name, contents) in files {
        let path = dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
