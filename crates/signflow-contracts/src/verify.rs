//! Verification outcome types.
//!
//! A broken chain or a modified document is a normal, reportable outcome.
//! These types carry the diagnostics an operator needs; they are never
//! turned into errors.

use serde::{Deserialize, Serialize};

use crate::{contract::ContractStatus, entry::ContractId};

/// Result of walking one contract's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,

    /// Id of the first entry whose link did not match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at_id: Option<u64>,

    /// Digest recomputed from the predecessor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,

    /// `previous_hash` actually stored in the failing entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,

    /// Number of entries checked, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_entries: Option<usize>,
}

impl VerificationResult {
    pub const NO_LOGS: &'static str = "No audit logs found";
    pub const VERIFIED: &'static str = "Audit trail integrity verified";
    pub const FIRST_ENTRY_LINKED: &'static str = "First log entry should not have a previous_hash";
    pub const CHAIN_BROKEN: &'static str = "Hash chain broken - log entry has been tampered";

    /// An empty ledger: nothing recorded is not evidence of tampering.
    pub fn empty() -> Self {
        Self {
            valid: true,
            message: Self::NO_LOGS.to_string(),
            failed_at_id: None,
            expected_hash: None,
            actual_hash: None,
            verified_entries: None,
        }
    }

    pub fn verified(count: usize) -> Self {
        Self {
            valid: true,
            message: Self::VERIFIED.to_string(),
            failed_at_id: None,
            expected_hash: None,
            actual_hash: None,
            verified_entries: Some(count),
        }
    }

    pub fn broken(
        message: &str,
        failed_at_id: u64,
        expected_hash: Option<String>,
        actual_hash: Option<String>,
    ) -> Self {
        Self {
            valid: false,
            message: message.to_string(),
            failed_at_id: Some(failed_at_id),
            expected_hash,
            actual_hash,
            verified_entries: None,
        }
    }
}

/// Chain and document verification for one contract, as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractIntegrityReport {
    pub contract_id: ContractId,

    /// `None` when the contract record no longer exists (e.g. deleted).
    pub status: Option<ContractStatus>,

    pub chain: VerificationResult,

    /// True only if the signed document on disk matches `signed_hash`.
    pub document_valid: bool,

    pub signed_hash: Option<String>,
}

impl ContractIntegrityReport {
    pub fn is_fully_valid(&self) -> bool {
        self.chain.valid && self.document_valid
    }
}
