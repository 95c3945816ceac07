//! # signflow-ref-contracts
//!
//! Reference contract lifecycle for the SignFlow audit ledger.
//!
//! Stands in for the contract system around the ledger: contracts are kept
//! in memory, documents on local disk, and every lifecycle action is
//! recorded through `AuditLedger`.
//!
//! Three scenarios exercise it end to end:
//!
//! 1. **Signing Flow**: generate, view, sign, upload, verify.
//! 2. **Tamper Drill**: edit a stored entry and a signed document, watch
//!    both verifiers catch it.
//! 3. **Retention**: manual deletion, signed-contract protection, expiry
//!    cleanup.
//!
//! Templates and signers are fictional. Nothing leaves the machine.

pub mod directory;
pub mod embedder;
pub mod lifecycle;
pub mod mock_data;
pub mod scenarios;

pub use directory::InMemoryContractDirectory;
pub use embedder::{SignatureEmbedder, Signer, StampEmbedder};
pub use lifecycle::ContractLifecycle;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    use signflow_audit::{AuditLedger, InMemoryLedgerStore};
    use signflow_config::LedgerConfig;
    use signflow_contracts::{
        client::ClientContext,
        contract::ContractStatus,
        entry::{event_types, AuditEntry, ContractId, PendingEntry},
        error::{SignflowError, SignflowResult},
    };
    use signflow_core::traits::{ContractDirectory, LedgerStore};
    use signflow_verify::{hash_file, ChainVerifier};

    use crate::{
        mock_data::{
            render_document, replace_variables, sample_signer, sample_variables, SAMPLE_SIGNATURE,
            SERVICE_AGREEMENT_TEMPLATE,
        },
        scenarios, ContractLifecycle, InMemoryContractDirectory, SignatureEmbedder, Signer,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    struct Fixture {
        _docs: TempDir,
        store: Arc<InMemoryLedgerStore>,
        lifecycle: ContractLifecycle,
    }

    fn fixture() -> Fixture {
        let docs = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Arc::new(AuditLedger::new(store.clone()));
        let contracts = Arc::new(InMemoryContractDirectory::new(docs.path()));
        Fixture {
            _docs: docs,
            store,
            lifecycle: ContractLifecycle::new(ledger, contracts),
        }
    }

    fn ctx() -> ClientContext {
        ClientContext::new("203.0.113.7", "Mozilla/5.0")
    }

    fn generate(lifecycle: &ContractLifecycle) -> ContractId {
        let variables = sample_variables();
        let rendered = render_document(&replace_variables(SERVICE_AGREEMENT_TEMPLATE, &variables));
        lifecycle.generate(12, &variables, &rendered, &ctx()).unwrap().id
    }

    fn event_types_of(store: &InMemoryLedgerStore, id: ContractId) -> Vec<String> {
        store.entries(id).unwrap().into_iter().map(|e| e.event_type).collect()
    }

    struct BrokenEmbedder;

    impl SignatureEmbedder for BrokenEmbedder {
        fn embed(&self, _unsigned: &[u8], _signature: &str, _signer: &Signer) -> SignflowResult<Vec<u8>> {
            Err(SignflowError::SignatureRejected {
                code: "pdf_render_failed".to_string(),
                reason: "font table missing".to_string(),
            })
        }
    }

    /// A store whose writes always fail.
    struct ReadOnlyStore;

    impl LedgerStore for ReadOnlyStore {
        fn latest(&self, _contract_id: ContractId) -> SignflowResult<Option<AuditEntry>> {
            Ok(None)
        }

        fn insert(&self, _pending: PendingEntry) -> SignflowResult<AuditEntry> {
            Err(SignflowError::AuditWriteFailed {
                reason: "disk full".to_string(),
            })
        }

        fn entries(&self, _contract_id: ContractId) -> SignflowResult<Vec<AuditEntry>> {
            Ok(Vec::new())
        }

        fn max_contract_id(&self) -> SignflowResult<Option<ContractId>> {
            Ok(None)
        }
    }

    fn config_in(dir: &std::path::Path) -> LedgerConfig {
        let config_path = dir.join("signflow.toml");
        std::fs::write(
            &config_path,
            "[client_ip]\nheaders = [\"x-real-ip\"]\n\n[storage]\nbackend = \"jsonl\"\npath = \"var/audit.jsonl\"\n\n[documents]\nroot = \"var/docs\"\n",
        )
        .unwrap();
        LedgerConfig::from_file(&config_path).unwrap()
    }

    // ── Templates ─────────────────────────────────────────────────────────────

    #[test]
    fn test_replace_variables_escapes_values() {
        let mut vars = BTreeMap::new();
        vars.insert("client_name".to_string(), "<b>Ada</b> & \"Co\"".to_string());

        let out = replace_variables("Client: {{client_name}} / {{fee}}", &vars);
        assert_eq!(out, "Client: &lt;b&gt;Ada&lt;/b&gt; &amp; &quot;Co&quot; / {{fee}}");
    }

    // ── Generation ────────────────────────────────────────────────────────────

    #[test]
    fn test_generate_records_document_hash() {
        let f = fixture();
        let id = generate(&f.lifecycle);

        let record = f.lifecycle.contracts().get_contract(id).unwrap().unwrap();
        assert_eq!(record.status, ContractStatus::Pending);
        assert!(record.expires_at.unwrap() > Utc::now() + Duration::days(29));
        assert_eq!(record.token.len(), 32);

        let path = f
            .lifecycle
            .contracts()
            .resolve_document_path(record.original_document.as_deref().unwrap());
        let on_disk = hash_file(&path).unwrap();
        assert_eq!(record.hashes.original_hash.as_deref(), Some(on_disk.as_str()));

        let entries = f.store.entries(id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, event_types::CONTRACT_GENERATED);
        assert_eq!(entries[0].event_data["template_id"], json!(12));
        assert_eq!(
            entries[0].event_data["variables"],
            json!(["client_name", "fee", "provider_name", "service_description", "start_date"])
        );
        assert_eq!(entries[0].event_data["original_hash"], json!(on_disk));
    }

    /// No ledger entry, no contract.
    #[test]
    fn test_generate_aborts_when_ledger_write_fails() {
        let docs = tempfile::tempdir().unwrap();
        let contracts = Arc::new(InMemoryContractDirectory::new(docs.path()));
        let lifecycle = ContractLifecycle::new(
            Arc::new(AuditLedger::new(Arc::new(ReadOnlyStore))),
            contracts.clone(),
        );

        let result = lifecycle.generate(1, &BTreeMap::new(), b"%PDF-1.7", &ctx());
        assert!(matches!(result, Err(SignflowError::AuditWriteFailed { .. })));
        assert!(contracts.list().unwrap().is_empty());
        assert!(!docs.path().join("contract-1.pdf").exists());
    }

    /// An id whose chain already exists in the ledger is never reused.
    #[test]
    fn test_generate_skips_ids_with_existing_chain() {
        let docs = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Arc::new(AuditLedger::new(store.clone()));
        ledger
            .append(ContractId(1), event_types::CONTRACT_SIGNED, &(), &ClientContext::system())
            .unwrap();
        let lifecycle = ContractLifecycle::new(
            ledger,
            Arc::new(InMemoryContractDirectory::new(docs.path())),
        );

        let variables = sample_variables();
        let rendered = render_document(&replace_variables(SERVICE_AGREEMENT_TEMPLATE, &variables));
        assert!(matches!(
            lifecycle.generate(12, &variables, &rendered, &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
        assert!(!docs.path().join("contract-1.pdf").exists());
        assert_eq!(event_types_of(&store, ContractId(1)), vec![event_types::CONTRACT_SIGNED]);

        assert_eq!(generate(&lifecycle), ContractId(2));
        assert_eq!(lifecycle.contracts().list().unwrap().len(), 1);
    }

    // ── Signing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_full_signing_flow_verifies() {
        let f = fixture();
        let id = generate(&f.lifecycle);
        f.lifecycle.record_view(id, &ctx()).unwrap();
        let signed = f.lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()).unwrap();
        f.lifecycle.record_upload(id, "gcs", "contracts/1/signed.pdf", &ClientContext::system()).unwrap();

        assert_eq!(signed.status, ContractStatus::Signed);
        assert!(signed.signed_at.is_some());
        assert_eq!(
            event_types_of(&f.store, id),
            vec![
                event_types::CONTRACT_GENERATED,
                event_types::SIGNATURE_PAGE_VIEWED,
                event_types::SIGNATURE_CAPTURED,
                event_types::CONTRACT_SIGNED,
                event_types::UPLOADED_TO_GCS,
            ]
        );

        let entries = f.store.entries(id).unwrap();
        assert_eq!(entries[2].event_data["consent_timestamp"], json!("2025-04-01T10:15:00Z"));
        assert_eq!(entries[3].event_data["signed_hash"], json!(signed.hashes.signed_hash));
        assert_eq!(entries[3].event_data["original_hash"], json!(signed.hashes.original_hash));
        assert_ne!(signed.hashes.signed_hash, signed.hashes.original_hash);

        let report = f.lifecycle.verifier().verify_contract(id).unwrap();
        assert!(report.is_fully_valid(), "{report:?}");
        assert_eq!(report.chain.verified_entries, Some(5));
    }

    #[test]
    fn test_sign_validation_records_nothing() {
        let f = fixture();
        let id = generate(&f.lifecycle);

        let no_consent = Signer {
            consent: false,
            ..sample_signer()
        };
        let cases: Vec<(ContractId, &str, Signer, &str)> = vec![
            (id, "", sample_signer(), "invalid_signature"),
            (id, SAMPLE_SIGNATURE, Signer::consenting("", "ada@example.com"), "missing_signer"),
            (id, SAMPLE_SIGNATURE, no_consent, "consent_required"),
        ];
        for (contract_id, signature, signer, expected) in cases {
            match f.lifecycle.sign(contract_id, signature, &signer, &ctx()) {
                Err(SignflowError::SignatureRejected { code, .. }) => assert_eq!(code, expected),
                other => panic!("expected {expected}, got {other:?}"),
            }
        }

        assert!(matches!(
            f.lifecycle.sign(ContractId(99), SAMPLE_SIGNATURE, &sample_signer(), &ctx()),
            Err(SignflowError::ContractNotFound { contract_id: 99 })
        ));
        assert_eq!(event_types_of(&f.store, id), vec![event_types::CONTRACT_GENERATED]);
    }

    #[test]
    fn test_sign_twice_is_rejected() {
        let f = fixture();
        let id = generate(&f.lifecycle);
        f.lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()).unwrap();

        assert!(matches!(
            f.lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
        assert!(matches!(
            f.lifecycle.record_view(id, &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
        assert_eq!(f.store.entries(id).unwrap().len(), 3);
    }

    #[test]
    fn test_embedding_failure_is_recorded() {
        let docs = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryLedgerStore::new());
        let lifecycle = ContractLifecycle::new(
            Arc::new(AuditLedger::new(store.clone())),
            Arc::new(InMemoryContractDirectory::new(docs.path())),
        )
        .with_embedder(Box::new(BrokenEmbedder));
        let id = generate(&lifecycle);

        let err = lifecycle
            .sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx())
            .unwrap_err();
        assert!(matches!(err, SignflowError::SignatureRejected { .. }));

        let entries = store.entries(id).unwrap();
        let last = entries.last().unwrap();
        assert_eq!(last.event_type, event_types::SIGNATURE_PROCESSING_ERROR);
        assert_eq!(last.event_data["error_code"], json!("pdf_render_failed"));
        assert_eq!(last.event_data["error_message"], json!("font table missing"));
        assert_eq!(last.event_data["signer_email"], json!("ada@example.com"));

        let record = lifecycle.contracts().get_contract(id).unwrap().unwrap();
        assert_eq!(record.status, ContractStatus::Pending);
        assert!(ChainVerifier::new(store).verify_chain(id).unwrap().valid);
    }

    #[test]
    fn test_stamp_embedder_rejects_non_png_signature() {
        let f = fixture();
        let id = generate(&f.lifecycle);

        match f.lifecycle.sign(id, "not-a-data-url", &sample_signer(), &ctx()) {
            Err(SignflowError::SignatureRejected { code, .. }) => {
                assert_eq!(code, "invalid_signature_format")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(
            event_types_of(&f.store, id).last().map(String::as_str),
            Some(event_types::SIGNATURE_PROCESSING_ERROR)
        );
    }

    #[test]
    fn test_view_of_expired_contract_is_rejected() {
        let docs = tempfile::tempdir().unwrap();
        let lifecycle = ContractLifecycle::new(
            Arc::new(AuditLedger::new(Arc::new(InMemoryLedgerStore::new()))),
            Arc::new(InMemoryContractDirectory::new(docs.path())),
        )
        .with_expiration(Duration::seconds(-1));
        let id = generate(&lifecycle);

        assert!(matches!(
            lifecycle.record_view(id, &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
    }

    /// Racing submissions for one contract produce one signature.
    #[test]
    fn test_concurrent_sign_records_one_signature() {
        let f = fixture();
        let id = generate(&f.lifecycle);

        let outcomes: Vec<SignflowResult<_>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let lifecycle = &f.lifecycle;
                    scope.spawn(move || lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for outcome in outcomes.iter().filter(|r| r.is_err()) {
            assert!(matches!(outcome, Err(SignflowError::ContractState { .. })), "{outcome:?}");
        }

        let types = event_types_of(&f.store, id);
        let count = |t: &str| types.iter().filter(|e| e.as_str() == t).count();
        assert_eq!(count(event_types::SIGNATURE_CAPTURED), 1);
        assert_eq!(count(event_types::CONTRACT_SIGNED), 1);
        assert!(f.lifecycle.verifier().verify_contract(id).unwrap().is_fully_valid());

        // The claim is released: a later submission sees the signed contract.
        assert!(matches!(
            f.lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
    }

    // ── Deletion ──────────────────────────────────────────────────────────────

    #[test]
    fn test_delete_pending_contract() {
        let f = fixture();
        let id = generate(&f.lifecycle);
        let path = f.lifecycle.contracts().resolve_document_path("contract-1.pdf");
        assert!(path.exists());

        f.lifecycle.delete(id, &ctx()).unwrap();

        assert!(!path.exists());
        assert!(!f.lifecycle.contracts().contract_exists(id).unwrap());
        let entries = f.store.entries(id).unwrap();
        assert_eq!(entries.last().unwrap().event_type, event_types::CONTRACT_DELETED);
        assert_eq!(entries.last().unwrap().event_data["reason"], json!("manual_deletion"));
        assert!(ChainVerifier::new(f.store.clone()).verify_chain(id).unwrap().valid);
    }

    #[test]
    fn test_signed_contract_cannot_be_deleted() {
        let f = fixture();
        let id = generate(&f.lifecycle);
        f.lifecycle.sign(id, SAMPLE_SIGNATURE, &sample_signer(), &ctx()).unwrap();
        let before = f.store.entries(id).unwrap().len();

        assert!(matches!(
            f.lifecycle.delete(id, &ctx()),
            Err(SignflowError::ContractState { .. })
        ));
        assert!(f.lifecycle.contracts().contract_exists(id).unwrap());
        assert_eq!(f.store.entries(id).unwrap().len(), before);
        assert!(matches!(
            f.lifecycle.delete(ContractId(42), &ctx()),
            Err(SignflowError::ContractNotFound { contract_id: 42 })
        ));
    }

    #[test]
    fn test_delete_expired_skips_signed_and_current() {
        let f = fixture();
        let stale = generate(&f.lifecycle);
        let signed = generate(&f.lifecycle);
        f.lifecycle.sign(signed, SAMPLE_SIGNATURE, &sample_signer(), &ctx()).unwrap();

        let now = Utc::now();
        assert_eq!(f.lifecycle.delete_expired(now, &ClientContext::system()).unwrap(), 0);

        let later = now + Duration::days(31);
        assert_eq!(f.lifecycle.delete_expired(later, &ClientContext::system()).unwrap(), 1);

        assert!(!f.lifecycle.contracts().contract_exists(stale).unwrap());
        assert!(f.lifecycle.contracts().contract_exists(signed).unwrap());

        let last = f.store.latest(stale).unwrap().unwrap();
        assert_eq!(last.event_type, event_types::CONTRACT_EXPIRED_DELETED);
        assert_eq!(last.event_data["reason"], json!("automatic_cleanup"));
        assert_eq!(last.client_ip, None);
    }

    // ── Storage ───────────────────────────────────────────────────────────────

    #[test]
    fn test_record_upload() {
        let f = fixture();
        let id = generate(&f.lifecycle);

        let entry = f.lifecycle.record_upload(id, "s3", "bucket/key.pdf", &ctx()).unwrap();
        assert_eq!(entry.event_type, "uploaded_to_s3");
        assert_eq!(entry.event_data["object"], json!("bucket/key.pdf"));

        assert!(matches!(
            f.lifecycle.record_upload(id, "  ", "x", &ctx()),
            Err(SignflowError::InvalidEvent { .. })
        ));
        assert!(matches!(
            f.lifecycle.record_upload(ContractId(77), "gcs", "x", &ctx()),
            Err(SignflowError::ContractNotFound { .. })
        ));
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn test_lifecycle_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let lifecycle = ContractLifecycle::from_config(&config).unwrap();
        assert_eq!(lifecycle.contracts().root(), dir.path().join("var/docs"));

        let visitor = lifecycle.client_context(
            [("X-Forwarded-For", "10.1.1.1"), ("X-Real-IP", "198.51.100.8")],
            Some("127.0.0.1"),
        );
        assert_eq!(visitor.ip.as_deref(), Some("198.51.100.8"));

        let id = generate(&lifecycle);
        assert!(dir.path().join("var/docs/contract-1.pdf").exists());
        assert!(dir.path().join("var/audit.jsonl").exists());
        assert!(lifecycle.verifier().verify_contract(id).unwrap().chain.valid);
    }

    /// Each run against a persistent ledger signs a new contract instead of
    /// continuing an earlier contract's chain.
    #[test]
    fn test_repeated_runs_against_one_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let first = ContractLifecycle::from_config(&config).unwrap();
        let first_id = scenarios::signing_flow::run_with(&first).unwrap();
        drop(first);

        let second = ContractLifecycle::from_config(&config).unwrap();
        let second_id = scenarios::signing_flow::run_with(&second).unwrap();

        assert_ne!(first_id, second_id);
        assert_eq!(second_id, ContractId(first_id.0 + 1));
        assert!(dir.path().join("var/docs/contract-1-signed.pdf").exists());
        assert!(dir.path().join("var/docs/contract-2-signed.pdf").exists());

        let store = second.ledger().store();
        for id in [first_id, second_id] {
            let entries = store.entries(id).unwrap();
            assert_eq!(entries.len(), 5);
            let generated = entries
                .iter()
                .filter(|e| e.event_type == event_types::CONTRACT_GENERATED)
                .count();
            assert_eq!(generated, 1);
            assert!(ChainVerifier::new(store.clone()).verify_chain(id).unwrap().valid);
        }
    }

    // ── Scenarios ─────────────────────────────────────────────────────────────

    #[test]
    fn test_scenarios_run() {
        scenarios::signing_flow::run_scenario().unwrap();
        scenarios::tamper_drill::run_scenario().unwrap();
        scenarios::retention::run_scenario().unwrap();
    }
}
