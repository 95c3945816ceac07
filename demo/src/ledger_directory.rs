//! Contract records rebuilt from the ledger itself.
//!
//! The CLI has no access to the contract store, but the lifecycle events
//! carry the document names and hashes. Replaying them gives verification
//! what it needs.

use std::{path::PathBuf, sync::Arc};

use signflow_contracts::{
    contract::{ContractRecord, ContractStatus, DocumentHashRecord},
    entry::{event_types, AuditEntry, ContractId},
    error::SignflowResult,
};
use signflow_core::traits::{ContractDirectory, LedgerStore};

pub struct LedgerDirectory {
    store: Arc<dyn LedgerStore>,
    root: PathBuf,
}

impl LedgerDirectory {
    pub fn new(store: Arc<dyn LedgerStore>, root: PathBuf) -> Self {
        Self { store, root }
    }
}

fn text(entry: &AuditEntry, key: &str) -> Option<String> {
    entry.event_data.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Fold a contract's entries (id order) into the record they describe.
///
/// `None` if the contract was never generated or has since been deleted.
pub fn replay(contract_id: ContractId, entries: &[AuditEntry]) -> Option<ContractRecord> {
    let mut record: Option<ContractRecord> = None;

    for entry in entries {
        match entry.event_type.as_str() {
            event_types::CONTRACT_GENERATED => {
                record = Some(ContractRecord {
                    id: contract_id,
                    token: String::new(),
                    template_id: entry.event_data.get("template_id").and_then(|v| v.as_u64()),
                    status: ContractStatus::Pending,
                    original_document: text(entry, "pdf_file"),
                    signed_document: None,
                    hashes: DocumentHashRecord {
                        original_hash: text(entry, "original_hash"),
                        signed_hash: None,
                    },
                    signed_at: None,
                    expires_at: None,
                });
            }
            event_types::CONTRACT_SIGNED => {
                if let Some(record) = record.as_mut() {
                    record.status = ContractStatus::Signed;
                    record.signed_document = text(entry, "pdf_file");
                    record.hashes.signed_hash = text(entry, "signed_hash");
                    record.signed_at = Some(entry.created_at);
                }
            }
            event_types::CONTRACT_DELETED | event_types::CONTRACT_EXPIRED_DELETED => record = None,
            _ => {}
        }
    }

    record
}

impl ContractDirectory for LedgerDirectory {
    fn get_contract(&self, contract_id: ContractId) -> SignflowResult<Option<ContractRecord>> {
        Ok(replay(contract_id, &self.store.entries(contract_id)?))
    }

    fn resolve_document_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use signflow_contracts::{
        contract::ContractStatus,
        entry::{event_types, AuditEntry, ContractId},
    };

    use super::replay;

    fn entry(id: u64, event_type: &str, data: serde_json::Value) -> AuditEntry {
        AuditEntry {
            id,
            contract_id: ContractId(1),
            event_type: event_type.to_string(),
            event_data: signflow_contracts::entry::event_data_from(&data).unwrap(),
            previous_hash: None,
            client_ip: None,
            client_user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_replay_signed_contract() {
        let entries = vec![
            entry(1, event_types::CONTRACT_GENERATED, json!({ "template_id": 12, "pdf_file": "c.pdf", "original_hash": "aa" })),
            entry(2, event_types::SIGNATURE_PAGE_VIEWED, json!({ "token": "t" })),
            entry(3, event_types::CONTRACT_SIGNED, json!({ "pdf_file": "c-signed.pdf", "signed_hash": "bb" })),
        ];

        let record = replay(ContractId(1), &entries).unwrap();
        assert_eq!(record.status, ContractStatus::Signed);
        assert_eq!(record.template_id, Some(12));
        assert_eq!(record.original_document.as_deref(), Some("c.pdf"));
        assert_eq!(record.signed_document.as_deref(), Some("c-signed.pdf"));
        assert_eq!(record.hashes.original_hash.as_deref(), Some("aa"));
        assert_eq!(record.hashes.signed_hash.as_deref(), Some("bb"));
    }

    #[test]
    fn test_replay_deleted_or_unknown() {
        let deleted = vec![
            entry(1, event_types::CONTRACT_GENERATED, json!({ "pdf_file": "c.pdf" })),
            entry(2, event_types::CONTRACT_DELETED, json!({ "reason": "manual_deletion" })),
        ];
        assert!(replay(ContractId(1), &deleted).is_none());
        assert!(replay(ContractId(1), &[]).is_none());
    }
}
