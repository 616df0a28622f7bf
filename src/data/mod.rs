//! Data layer: core types, loading, date normalization, filtering,
//! aggregation and export.
//!
//! Architecture:
//! ```text
//!  .csv / .txt / .xlsx / .xls
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse bytes → Dataset (header + typed rows)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  dates   │  coerce date column, drop undated rows, bounds
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  date interval + facet selections → filtered Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate │  group-by sums, month labels, pivots
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export  │  comma-separated text for download
//!   └──────────┘
//! ```
//!
//! Every stage borrows its input and returns a new value; nothing is cached
//! here.

pub mod aggregate;
pub mod dates;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;

pub use aggregate::{aggregate, aggregate_by, pivot, AggregateTable, Dimension, PivotTable};
pub use dates::{date_bounds, normalize};
pub use error::PipelineError;
pub use filter::{filter, DateInterval, FacetSelection};
pub use loader::{load, load_file, FileKind, LoadOptions};
pub use model::{Dataset, Value};
