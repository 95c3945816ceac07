//! Error types for the SignFlow ledger and its collaborators.
//!
//! All fallible ledger and lifecycle operations return `SignflowResult<T>`.
//! A broken hash chain is NOT an error: verification reports it as data in
//! `VerificationResult`.

use thiserror::Error;

/// The unified error type for the SignFlow crates.
#[derive(Debug, Error)]
pub enum SignflowError {
    /// The store could not durably record an audit entry.
    ///
    /// Fatal to the triggering operation: an event that cannot be recorded
    /// must not be dropped.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The event type or payload was rejected before anything was written.
    #[error("invalid audit event: {reason}")]
    InvalidEvent { reason: String },

    /// Another writer advanced the contract's chain between read and insert.
    #[error("chain conflict on contract {contract_id}: head moved past {expected_head:?}")]
    ChainConflict {
        contract_id: u64,
        expected_head: Option<u64>,
    },

    /// Reading from or opening the backing store failed.
    #[error("storage error: {reason}")]
    StorageError { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The referenced contract does not exist in the contract directory.
    #[error("contract {contract_id} not found")]
    ContractNotFound { contract_id: u64 },

    /// The contract is in a state that forbids the requested operation.
    #[error("contract state error: {reason}")]
    ContractState { reason: String },

    /// A signature submission failed validation or could not be embedded.
    #[error("signature rejected ({code}): {reason}")]
    SignatureRejected { code: String, reason: String },

    /// Export was requested in a format other than `json` or `csv`.
    #[error("unsupported export format '{format}'")]
    UnsupportedExportFormat { format: String },
}

/// Convenience alias used throughout the SignFlow crates.
pub type SignflowResult<T> = Result<T, SignflowError>;
