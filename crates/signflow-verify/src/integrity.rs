//! Combined chain and document report for a single contract.

use std::sync::Arc;

use tracing::info;

use signflow_contracts::{
    entry::ContractId, error::SignflowResult, verify::ContractIntegrityReport,
};
use signflow_core::traits::{ContractDirectory, LedgerStore};

use crate::{chain::ChainVerifier, document::DocumentVerifier};

/// Runs both checks and reports them side by side.
pub struct IntegrityVerifier {
    chain: ChainVerifier,
    documents: DocumentVerifier,
    contracts: Arc<dyn ContractDirectory>,
}

impl IntegrityVerifier {
    pub fn new(store: Arc<dyn LedgerStore>, contracts: Arc<dyn ContractDirectory>) -> Self {
        Self {
            chain: ChainVerifier::new(store),
            documents: DocumentVerifier::new(Arc::clone(&contracts)),
            contracts,
        }
    }

    /// Only ledger read failures are errors. A deleted contract still gets
    /// its chain checked; its status and hash are `None` and the document
    /// check is `false`.
    pub fn verify_contract(&self, contract_id: ContractId) -> SignflowResult<ContractIntegrityReport> {
        let chain = self.chain.verify_chain(contract_id)?;
        let document_valid = self.documents.verify_document(contract_id);
        let contract = self.contracts.get_contract(contract_id).ok().flatten();

        let report = ContractIntegrityReport {
            contract_id,
            status: contract.as_ref().map(|c| c.status),
            chain,
            document_valid,
            signed_hash: contract.and_then(|c| c.hashes.signed_hash),
        };

        info!(
            contract_id = %contract_id,
            chain_valid = report.chain.valid,
            document_valid = report.document_valid,
            "contract integrity checked"
        );

        Ok(report)
    }
}
