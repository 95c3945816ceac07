//! Document integrity: SHA-256 of a document's bytes against the hash
//! recorded when it was produced.

use std::{fs, path::Path, sync::Arc};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use signflow_contracts::{
    entry::ContractId,
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::ContractDirectory;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Lowercase hex SHA-256 of the file at `path`.
pub fn hash_file(path: &Path) -> SignflowResult<String> {
    let bytes = fs::read(path).map_err(|e| SignflowError::StorageError {
        reason: format!("failed to read document '{}': {}", path.display(), e),
    })?;
    Ok(sha256_hex(&bytes))
}

/// Checks a contract's signed document against its recorded `signed_hash`.
pub struct DocumentVerifier {
    contracts: Arc<dyn ContractDirectory>,
}

impl DocumentVerifier {
    pub fn new(contracts: Arc<dyn ContractDirectory>) -> Self {
        Self { contracts }
    }

    /// True only when the contract exists, has both a signed document and a
    /// signed hash, and the file on disk hashes to that value.
    ///
    /// Every other outcome is `false`. Nothing here returns an error; the
    /// reason is logged.
    pub fn verify_document(&self, contract_id: ContractId) -> bool {
        let contract = match self.contracts.get_contract(contract_id) {
            Ok(Some(contract)) => contract,
            Ok(None) => {
                warn!(contract_id = %contract_id, "document check: contract not found");
                return false;
            }
            Err(e) => {
                warn!(contract_id = %contract_id, error = %e, "document check: contract lookup failed");
                return false;
            }
        };

        let (Some(relative), Some(recorded)) =
            (contract.signed_document.as_deref(), contract.hashes.signed_hash.as_deref())
        else {
            warn!(contract_id = %contract_id, "document check: no signed document or hash recorded");
            return false;
        };

        let path = self.contracts.resolve_document_path(relative);
        let actual = match hash_file(&path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(contract_id = %contract_id, error = %e, "document check: signed document unreadable");
                return false;
            }
        };

        if actual != recorded {
            warn!(
                contract_id = %contract_id,
                path = %path.display(),
                recorded_hash = %recorded,
                actual_hash = %actual,
                "signed document does not match recorded hash"
            );
            return false;
        }

        debug!(contract_id = %contract_id, path = %path.display(), "signed document verified");
        true
    }
}
