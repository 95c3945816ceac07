//! Export projections of an audit trail.
//!
//! Pure functions over an already-ordered slice of entries; they add no
//! semantics of their own.

use signflow_contracts::{
    entry::AuditEntry,
    error::{SignflowError, SignflowResult},
};

use crate::chain::canonical_timestamp;

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 4] = ["Event Type", "Created At", "IP Address", "Event Data"];

/// Pretty-printed JSON array of the entries.
pub fn to_json(entries: &[AuditEntry]) -> SignflowResult<String> {
    serde_json::to_string_pretty(entries).map_err(|e| SignflowError::StorageError {
        reason: format!("failed to serialize audit trail as JSON: {}", e),
    })
}

/// CSV with one row per entry: event type, timestamp, IP, JSON event data.
///
/// The header row is written bare; every data cell is quoted. Cells that a
/// spreadsheet would evaluate as a formula are prefixed with `'`.
pub fn to_csv(entries: &[AuditEntry]) -> SignflowResult<String> {
    let csv_err = |e: csv::Error| SignflowError::StorageError {
        reason: format!("failed to write audit trail CSV: {}", e),
    };
    let flush_err = |e: csv::IntoInnerError<csv::Writer<Vec<u8>>>| SignflowError::StorageError {
        reason: format!("failed to flush audit trail CSV: {}", e),
    };

    let mut header = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    header.write_record(CSV_HEADER).map_err(csv_err)?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(header.into_inner().map_err(flush_err)?);

    for entry in entries {
        let event_data =
            serde_json::to_string(&entry.event_data).map_err(|e| SignflowError::StorageError {
                reason: format!("failed to encode event data of entry {}: {}", entry.id, e),
            })?;
        let cells = [
            guard_cell(&entry.event_type),
            guard_cell(&canonical_timestamp(&entry.created_at)),
            guard_cell(entry.client_ip.as_deref().unwrap_or("")),
            guard_cell(&event_data),
        ];
        writer.write_record(&cells).map_err(csv_err)?;
    }

    let bytes = writer.into_inner().map_err(flush_err)?;
    String::from_utf8(bytes).map_err(|e| SignflowError::StorageError {
        reason: format!("audit trail CSV is not UTF-8: {}", e),
    })
}

fn needs_formula_guard(cell: &str) -> bool {
    matches!(cell.chars().next(), Some('=' | '+' | '-' | '@'))
}

/// `client_ip` and `event_type` come from callers; neither may reach a
/// spreadsheet as a live formula.
fn guard_cell(cell: &str) -> String {
    if needs_formula_guard(cell) {
        format!("'{}", cell)
    } else {
        cell.to_string()
    }
}
