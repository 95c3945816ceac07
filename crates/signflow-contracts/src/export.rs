//! Audit trail export formats.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SignflowError;

/// The projections `AuditLedger::export` can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array of entries.
    Json,
    /// One row per entry: event type, timestamp, IP, JSON-encoded data.
    Csv,
}

impl FromStr for ExportFormat {
    type Err = SignflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(SignflowError::UnsupportedExportFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}
