//! Run configuration: command-line arguments and optional report settings.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Command-line arguments for the interactive report tool.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "coverage-report",
    about = "Inventory coverage analysis from a store sales/stock export"
)]
pub struct Args {
    /// CSV export with one header row.
    #[arg(long, default_value = "inventory.csv")]
    pub input: PathBuf,

    /// Directory for generated reports and the mail outbox.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// JSON file overriding report settings.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `coverage_report=trace`. Falls back to RUST_LOG.
    #[arg(long)]
    pub log: Option<String>,
}

/// Tunables for grouping and delivery. Coverage thresholds are fixed and
/// deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Store name of the e-commerce channel, excluded from store views.
    pub online_store: String,
    /// Business units listed first, in this order; others follow sorted.
    pub biz_order: Vec<String>,
    /// Mail relay the outbound report is addressed to.
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            online_store: "온라인".to_string(),
            biz_order: vec!["AP".to_string(), "FW".to_string(), "EQ".to_string()],
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
        }
    }
}

impl ReportSettings {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Settings from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn is_online(&self, store_name: &str) -> bool {
        store_name == self.online_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s = ReportSettings::from_json(r#"{"online_store": "ONLINE"}"#).expect("parse");
        assert_eq!(s.online_store, "ONLINE");
        assert_eq!(s.biz_order, ["AP", "FW", "EQ"]);
        assert_eq!(s.smtp_port, 587);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            ReportSettings::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::parse_from(["coverage-report", "--input", "stock.csv"]);
        assert_eq!(args.input, PathBuf::from("stock.csv"));
        assert_eq!(args.out, PathBuf::from("."));
        assert!(args.settings.is_none());
    }
}
