//! Scenario 1: Signing Flow
//!
//! Generate a contract from a template, show the signing page, capture a
//! signature, copy the signed document to cloud storage, then verify the
//! chain and the signed document.

use std::sync::Arc;

use signflow_audit::{AuditLedger, InMemoryLedgerStore};
use signflow_contracts::{
    client::ClientContext, entry::ContractId, error::SignflowResult, export::ExportFormat,
};

use crate::{
    directory::InMemoryContractDirectory,
    lifecycle::ContractLifecycle,
    mock_data::{
        render_document, replace_variables, sample_signer, sample_variables, SAMPLE_SIGNATURE,
        SERVICE_AGREEMENT_TEMPLATE, SERVICE_AGREEMENT_TEMPLATE_ID,
    },
};

/// Run Scenario 1 against a throwaway in-memory ledger.
pub fn run_scenario() -> SignflowResult<()> {
    let docs = super::document_root()?;
    let ledger = Arc::new(AuditLedger::new(Arc::new(InMemoryLedgerStore::new())));
    let contracts = Arc::new(InMemoryContractDirectory::new(docs.path()));
    run_with(&ContractLifecycle::new(ledger, contracts))?;
    Ok(())
}

/// Run Scenario 1 on `lifecycle`: generate, view, sign, upload, verify.
///
/// Returns the id of the signed contract.
pub fn run_with(lifecycle: &ContractLifecycle) -> SignflowResult<ContractId> {
    println!("=== Scenario 1: Signing Flow ===");
    println!();

    let admin = ClientContext::new("10.0.0.5", "SignFlow Admin/1.0");
    let visitor = lifecycle.client_context(
        [
            ("X-Forwarded-For", "203.0.113.7"),
            ("User-Agent", "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4)"),
        ],
        Some("10.0.0.1"),
    );

    let variables = sample_variables();
    let rendered = render_document(&replace_variables(SERVICE_AGREEMENT_TEMPLATE, &variables));
    let contract = lifecycle.generate(SERVICE_AGREEMENT_TEMPLATE_ID, &variables, &rendered, &admin)?;
    println!("  Contract generated:     #{} (template {})", contract.id, SERVICE_AGREEMENT_TEMPLATE_ID);
    println!(
        "  Original hash:          {}",
        contract.hashes.original_hash.as_deref().unwrap_or("-")
    );

    lifecycle.record_view(contract.id, &visitor)?;
    println!("  Signing page viewed by: {}", visitor.ip.as_deref().unwrap_or("unknown"));

    let signed = lifecycle.sign(contract.id, SAMPLE_SIGNATURE, &sample_signer(), &visitor)?;
    println!(
        "  Signed hash:            {}",
        signed.hashes.signed_hash.as_deref().unwrap_or("-")
    );

    lifecycle.record_upload(
        contract.id,
        "gcs",
        &format!("contracts/{}/signed.pdf", contract.id),
        &ClientContext::system(),
    )?;
    println!("  Upload recorded:        gcs");
    println!();

    print_trail(lifecycle, contract.id)?;

    let report = lifecycle.verifier().verify_contract(contract.id)?;
    println!(
        "  Audit chain:            {} ({} entries)",
        if report.chain.valid { "VERIFIED" } else { "BROKEN" },
        report.chain.verified_entries.unwrap_or(0)
    );
    println!(
        "  Signed document:        {}",
        if report.document_valid { "MATCHES" } else { "MISMATCH" }
    );
    println!();

    let csv = lifecycle.ledger().export(contract.id, ExportFormat::Csv)?;
    println!("  CSV export:");
    for line in csv.lines() {
        println!("    {}", line);
    }
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(contract.id)
}

fn print_trail(lifecycle: &ContractLifecycle, contract_id: ContractId) -> SignflowResult<()> {
    println!("  Audit trail (newest first):");
    for entry in lifecycle.ledger().trail(contract_id)? {
        println!(
            "    #{:<3} {:<24} {:<15} {}",
            entry.id,
            entry.event_type,
            entry.client_ip.as_deref().unwrap_or("-"),
            entry.created_at.format("%Y-%m-%d %H:%M:%S%.6f")
        );
    }
    println!();
    Ok(())
}
