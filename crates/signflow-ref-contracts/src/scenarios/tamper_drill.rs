//! Scenario 2: Tamper Drill
//!
//! Build a three-entry chain (generated, viewed, signed), then edit the
//! middle entry directly in the store, the way someone with database access
//! would. The chain verifier reports the break at the third entry. A second
//! drill flips one byte of the signed document.

use std::{fs, sync::Arc};

use signflow_audit::{AuditLedger, InMemoryLedgerStore};
use signflow_contracts::{
    client::ClientContext,
    entry::event_types,
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::{ContractDirectory, LedgerStore};

use crate::{
    directory::InMemoryContractDirectory,
    lifecycle::ContractLifecycle,
    mock_data::{
        render_document, replace_variables, sample_signer, sample_variables, SAMPLE_SIGNATURE,
        SERVICE_AGREEMENT_TEMPLATE, SERVICE_AGREEMENT_TEMPLATE_ID,
    },
};

/// Run Scenario 2: chain and document tampering.
pub fn run_scenario() -> SignflowResult<()> {
    println!("=== Scenario 2: Tamper Drill ===");
    println!();

    let docs = super::document_root()?;
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = Arc::new(AuditLedger::new(store.clone()));
    let contracts = Arc::new(InMemoryContractDirectory::new(docs.path()));
    let lifecycle = ContractLifecycle::new(ledger, contracts.clone());
    let verifier = lifecycle.verifier();
    let ctx = ClientContext::new("198.51.100.23", "Mozilla/5.0 (X11; Linux x86_64)");

    let variables = sample_variables();
    let rendered = render_document(&replace_variables(SERVICE_AGREEMENT_TEMPLATE, &variables));
    let contract = lifecycle.generate(SERVICE_AGREEMENT_TEMPLATE_ID, &variables, &rendered, &ctx)?;
    let viewed = lifecycle.record_view(contract.id, &ctx)?;
    let signed = lifecycle.sign(contract.id, SAMPLE_SIGNATURE, &sample_signer(), &ctx)?;

    // The entry after the page view is the one whose stored link breaks.
    let entries = store.entries(contract.id)?;
    let third = entries.get(2).cloned().ok_or_else(|| SignflowError::StorageError {
        reason: "expected at least three audit entries".to_string(),
    })?;

    println!("  Chain before tampering:");
    for entry in entries.iter().take(3) {
        println!("    #{:<3} {}", entry.id, entry.event_type);
    }
    let before = verifier.verify_contract(contract.id)?;
    println!("  Verification:           {}", before.chain.message);
    println!();

    // ── Drill A: rewrite the page view as a deletion ──────────────────────────

    let mut forged = viewed.clone();
    forged.event_type = event_types::CONTRACT_DELETED.to_string();
    store.overwrite_unchecked(forged);
    println!(
        "  Drill A: entry #{} rewritten from '{}' to '{}'",
        viewed.id,
        viewed.event_type,
        event_types::CONTRACT_DELETED
    );

    let after = verifier.verify_contract(contract.id)?;
    println!("  Verification:           {}", after.chain.message);
    println!(
        "  Failed at entry:        #{} (expected #{})",
        after.chain.failed_at_id.unwrap_or(0),
        third.id
    );
    println!("  Expected link:          {}", after.chain.expected_hash.as_deref().unwrap_or("-"));
    println!("  Stored link:            {}", after.chain.actual_hash.as_deref().unwrap_or("-"));
    println!();

    // ── Drill B: flip one byte of the signed document ─────────────────────────

    let relative = signed.signed_document.clone().unwrap_or_default();
    let path = contracts.resolve_document_path(&relative);
    let mut bytes = fs::read(&path).map_err(|e| SignflowError::StorageError {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;
    if let Some(byte) = bytes.get_mut(10) {
        *byte ^= 0x20;
    }
    fs::write(&path, &bytes).map_err(|e| SignflowError::StorageError {
        reason: format!("failed to write '{}': {}", path.display(), e),
    })?;
    println!("  Drill B: one byte of {} flipped", relative);

    let report = verifier.verify_contract(contract.id)?;
    println!(
        "  Signed document:        {}",
        if report.document_valid { "MATCHES (unexpected)" } else { "MISMATCH (expected)" }
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}
