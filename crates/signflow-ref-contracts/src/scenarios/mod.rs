//! Runnable walkthroughs of the contract audit ledger.
//!
//! Each scenario builds its own ledger, contract directory and temporary
//! document root, then prints what the ledger and verifiers report.

pub mod retention;
pub mod signing_flow;
pub mod tamper_drill;

use signflow_contracts::error::{SignflowError, SignflowResult};
use tempfile::TempDir;

/// Temporary document root, removed when dropped.
pub(crate) fn document_root() -> SignflowResult<TempDir> {
    tempfile::Builder::new()
        .prefix("signflow-docs-")
        .tempdir()
        .map_err(|e| SignflowError::StorageError {
            reason: format!("failed to create document directory: {}", e),
        })
}
