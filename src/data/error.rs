use thiserror::Error;

/// Errors raised by the load → normalize → filter → aggregate pipeline.
///
/// Each one aborts the operation that raised it; none of them is meant to
/// bring the host process down.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required column '{0}' is missing from the dataset")]
    MissingColumn(String),

    #[error("unsupported file type: {0} (expected csv, txt, xlsx or xls)")]
    UnsupportedFormat(String),

    #[error("no rows left after parsing the '{0}' column")]
    EmptyDataset(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("reading spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
