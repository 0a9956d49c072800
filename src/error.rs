//! Error types for each boundary of the analyzer.
//!
//! Row-level rejections are not errors; they are counted in
//! [`crate::loader::NormalizeReport`].

use thiserror::Error;

/// The uploaded table cannot be analyzed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required columns: {}", .missing.join(", "))]
    MissingColumns {
        /// Absent columns, in required-column order.
        missing: Vec<String>,
        /// Trimmed headers that were present, for diagnosis.
        present: Vec<String>,
    },
}

impl SchemaError {
    pub fn missing(&self) -> &[String] {
        match self {
            SchemaError::MissingColumns { missing, .. } => missing,
        }
    }

    pub fn present(&self) -> &[String] {
        match self {
            SchemaError::MissingColumns { present, .. } => present,
        }
    }
}

/// Failure while reading an input file into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure while writing a report or export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while loading report settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure handing a report to the mail transport.
///
/// The analyzed dataset is never touched by a transport failure; callers can
/// retry or export instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("required field is empty: {0}")]
    MissingField(&'static str),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("mail relay rejected the message: {0}")]
    Rejected(String),

    #[error("mail transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
