//! Scenario 3: Retention
//!
//! Manual deletion of a pending contract, refusal to delete a signed one,
//! and automatic cleanup of expired contracts. The ledger outlives every
//! deleted contract and its chain still verifies.

use std::sync::Arc;

use chrono::{Duration, Utc};

use signflow_audit::{AuditLedger, InMemoryLedgerStore};
use signflow_contracts::{client::ClientContext, error::{SignflowError, SignflowResult}};

use crate::{
    directory::InMemoryContractDirectory,
    lifecycle::ContractLifecycle,
    mock_data::{
        render_document, replace_variables, sample_signer, sample_variables, SAMPLE_SIGNATURE,
        SERVICE_AGREEMENT_TEMPLATE, SERVICE_AGREEMENT_TEMPLATE_ID,
    },
};

/// Run Scenario 3: deletion and expiry.
pub fn run_scenario() -> SignflowResult<()> {
    println!("=== Scenario 3: Retention ===");
    println!();

    let docs = super::document_root()?;
    let ledger = Arc::new(AuditLedger::new(Arc::new(InMemoryLedgerStore::new())));
    let contracts = Arc::new(InMemoryContractDirectory::new(docs.path()));
    let lifecycle = ContractLifecycle::new(ledger, contracts).with_expiration(Duration::days(7));
    let admin = ClientContext::new("10.0.0.5", "SignFlow Admin/1.0");
    let cron = ClientContext::system();

    let variables = sample_variables();
    let rendered = render_document(&replace_variables(SERVICE_AGREEMENT_TEMPLATE, &variables));
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(lifecycle.generate(SERVICE_AGREEMENT_TEMPLATE_ID, &variables, &rendered, &admin)?.id);
    }
    println!("  Generated contracts:    {:?}", ids.iter().map(|id| id.0).collect::<Vec<_>>());

    lifecycle.delete(ids[0], &admin)?;
    println!("  Manual deletion:        #{} deleted", ids[0]);

    lifecycle.sign(ids[1], SAMPLE_SIGNATURE, &sample_signer(), &admin)?;
    match lifecycle.delete(ids[1], &admin) {
        Err(SignflowError::ContractState { reason }) => {
            println!("  Signed contract #{}:    kept ({})", ids[1], reason);
        }
        Err(e) => return Err(e),
        Ok(()) => println!("  Signed contract #{}:    deleted (unexpected)", ids[1]),
    }

    let deleted = lifecycle.delete_expired(Utc::now() + Duration::days(8), &cron)?;
    println!("  Expiry cleanup:         {} contract(s) removed", deleted);
    println!("  Contracts remaining:    {}", lifecycle.contracts().list()?.len());
    println!();

    let verifier = lifecycle.verifier();
    for id in &ids {
        let report = verifier.verify_contract(*id)?;
        let status = report.status.map(|s| s.as_str()).unwrap_or("deleted");
        println!(
            "    #{:<3} {:<8} chain {} ({} entries)",
            id.0,
            status,
            if report.chain.valid { "VERIFIED" } else { "BROKEN" },
            report.chain.verified_entries.unwrap_or(0)
        );
    }
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}
