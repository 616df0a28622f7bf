//! Sales dataset explorer.
//!
//! Load a delimited or spreadsheet sales export, narrow it by order date and
//! geography, and derive the grouped summaries a dashboard draws and offers
//! for download.

pub mod config;
pub mod data;
pub mod state;
pub mod views;
