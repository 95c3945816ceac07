//! Trait definitions for the SignFlow audit ledger.
//!
//! - `LedgerStore`: trusted sink (durable, append-only entry storage)
//! - `ContractDirectory`: external collaborator (contract records and
//!   document locations)
//!
//! The ledger and the verifiers are constructed with `Arc<dyn ...>` handles
//! to these traits. Nothing in the workspace holds process-wide state.

use std::path::PathBuf;

use signflow_contracts::{
    contract::ContractRecord,
    entry::{AuditEntry, ContractId, PendingEntry},
    error::SignflowResult,
};

/// Durable storage for audit entries.
///
/// Implementations are append-only: entries are never updated or removed
/// through this trait. Reads must reflect every successful insert.
pub trait LedgerStore: Send + Sync {
    /// The entry with the highest id for `contract_id`, if any.
    fn latest(&self, contract_id: ContractId) -> SignflowResult<Option<AuditEntry>>;

    /// Number and timestamp `pending` and persist it.
    ///
    /// The store assigns `id` (strictly increasing across the whole store)
    /// and `created_at` (UTC, microsecond precision, never earlier than the
    /// contract's previous entry).
    ///
    /// The insert is conditional: if the id of the contract's latest entry
    /// is not `pending.expected_head`, the store must return
    /// `SignflowError::ChainConflict` and write nothing. Any other failure
    /// to persist is `SignflowError::AuditWriteFailed`.
    fn insert(&self, pending: PendingEntry) -> SignflowResult<AuditEntry>;

    /// All entries for `contract_id`, ordered by id ascending.
    fn entries(&self, contract_id: ContractId) -> SignflowResult<Vec<AuditEntry>>;

    /// The highest contract id with at least one entry, if any.
    ///
    /// Contract stores that share the ledger seed their id sequence from
    /// this so a new contract never continues an existing chain.
    fn max_contract_id(&self) -> SignflowResult<Option<ContractId>>;

    /// True if at least one entry exists for `contract_id`.
    fn has_entries(&self, contract_id: ContractId) -> SignflowResult<bool> {
        Ok(self.latest(contract_id)?.is_some())
    }
}

/// Read access to the contract store owned by the surrounding system.
///
/// The ledger never calls this; only document verification and the
/// reference lifecycle do.
pub trait ContractDirectory: Send + Sync {
    fn get_contract(&self, contract_id: ContractId) -> SignflowResult<Option<ContractRecord>>;

    fn contract_exists(&self, contract_id: ContractId) -> SignflowResult<bool> {
        Ok(self.get_contract(contract_id)?.is_some())
    }

    /// Turn a stored relative document path into an absolute file path.
    fn resolve_document_path(&self, relative: &str) -> PathBuf;
}
