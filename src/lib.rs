//! Inventory coverage analysis for a multi-store retail export.
//!
//! The pipeline runs strictly downstream:
//! raw table -> [`schema::validate`] -> [`loader::normalize`] ->
//! [`coverage::enrich`] -> [`aggregate`] -> [`reports`] / [`html`] ->
//! [`output`] and [`mail`].

pub mod aggregate;
pub mod config;
pub mod coverage;
pub mod error;
pub mod html;
pub mod loader;
pub mod mail;
pub mod output;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use config::{Args, ReportSettings};
pub use error::{ConfigError, ExportError, LoadError, SchemaError, TransportError};
pub use loader::{load_and_process, load_and_process_file, NormalizeReport};
pub use types::{AggregateRow, InventoryRecord, RawTable, Status};
