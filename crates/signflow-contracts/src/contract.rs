//! Boundary view of a contract record.
//!
//! The contract store itself is an external collaborator. The ledger and
//! verifiers only need the document paths and hashes; the lifecycle fields
//! are used by the reference contract flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::ContractId;

/// Signing status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Signed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Signed => "signed",
        }
    }
}

/// The SHA-256 hashes recorded for a contract's documents.
///
/// `original_hash` is set once at generation, `signed_hash` once at signing.
/// Neither is ever rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHashRecord {
    pub original_hash: Option<String>,
    pub signed_hash: Option<String>,
}

/// A contract as seen through `ContractDirectory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub id: ContractId,

    /// Opaque token embedded in the signing URL.
    pub token: String,

    pub template_id: Option<u64>,

    pub status: ContractStatus,

    /// Path of the unsigned document, relative to the document root.
    pub original_document: Option<String>,

    /// Path of the signed document, relative to the document root.
    pub signed_document: Option<String>,

    pub hashes: DocumentHashRecord,

    pub signed_at: Option<DateTime<Utc>>,

    pub expires_at: Option<DateTime<Utc>>,
}

impl ContractRecord {
    pub fn is_signed(&self) -> bool {
        self.status == ContractStatus::Signed
    }

    /// True when the contract is still unsigned and its expiry is before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ContractStatus::Pending && self.expires_at.is_some_and(|at| at < now)
    }
}
