//! Hash-chain verification.
//!
//! `ChainVerifier` replays a contract's entries from the first one and
//! recomputes every link. It reads the store in id order and never relies on
//! the display order returned by `AuditLedger::trail`.
//!
//! A break is reported, not repaired: the verifier is strictly read-only.

use std::sync::Arc;

use tracing::{info, warn};

use signflow_audit::entry_digest;
use signflow_contracts::{
    entry::{AuditEntry, ContractId},
    error::SignflowResult,
    verify::VerificationResult,
};
use signflow_core::traits::LedgerStore;

pub struct ChainVerifier {
    store: Arc<dyn LedgerStore>,
}

impl ChainVerifier {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Verify the full chain of `contract_id`.
    ///
    /// Read failures are errors. A broken chain is a normal `Ok` result with
    /// `valid == false`.
    pub fn verify_chain(&self, contract_id: ContractId) -> SignflowResult<VerificationResult> {
        let entries = self.store.entries(contract_id)?;
        let result = Self::verify_entries(&entries);

        if result.valid {
            info!(
                contract_id = %contract_id,
                entries = entries.len(),
                message = %result.message,
                "audit chain verified"
            );
        } else {
            warn!(
                contract_id = %contract_id,
                failed_at_id = ?result.failed_at_id,
                expected_hash = ?result.expected_hash,
                actual_hash = ?result.actual_hash,
                "audit chain broken"
            );
        }

        Ok(result)
    }

    /// Verify an already-loaded chain, for example one read back from a JSON
    /// export. `entries` must be one contract's entries in id order.
    ///
    /// Stops at the first bad link.
    pub fn verify_entries(entries: &[AuditEntry]) -> VerificationResult {
        let Some(first) = entries.first() else {
            return VerificationResult::empty();
        };

        if first.previous_hash.is_some() {
            return VerificationResult::broken(
                VerificationResult::FIRST_ENTRY_LINKED,
                first.id,
                None,
                first.previous_hash.clone(),
            );
        }

        for pair in entries.windows(2) {
            let (previous, entry) = (&pair[0], &pair[1]);
            let expected = entry_digest(previous);
            if entry.previous_hash.as_deref() != Some(expected.as_str()) {
                return VerificationResult::broken(
                    VerificationResult::CHAIN_BROKEN,
                    entry.id,
                    Some(expected),
                    entry.previous_hash.clone(),
                );
            }
        }

        VerificationResult::verified(entries.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
