//! Reference contract lifecycle.
//!
//! `ContractLifecycle` plays the part of the surrounding contract system:
//! it owns contract records and documents and records every state change in
//! the audit ledger. An append that fails aborts the operation that
//! triggered it; where a change was already staged it is rolled back.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use signflow_audit::AuditLedger;
use signflow_config::LedgerConfig;
use signflow_contracts::{
    client::{default_ip_headers, ClientContext},
    contract::{ContractRecord, ContractStatus, DocumentHashRecord},
    entry::{event_types, AuditEntry, ContractId},
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::{ContractDirectory, LedgerStore};
use signflow_verify::{sha256_hex, IntegrityVerifier};

use crate::{
    directory::InMemoryContractDirectory,
    embedder::{SignatureEmbedder, Signer, StampEmbedder},
};

/// Unsigned contracts expire after this many days unless configured otherwise.
pub const DEFAULT_EXPIRATION_DAYS: i64 = 30;

pub struct ContractLifecycle {
    ledger: Arc<AuditLedger>,
    contracts: Arc<InMemoryContractDirectory>,
    embedder: Box<dyn SignatureEmbedder>,
    ip_headers: Vec<String>,
    expiration: Duration,
    /// Contracts with a signature submission in progress.
    signing: Mutex<HashSet<ContractId>>,
}

/// Releases a contract's signing claim when dropped.
struct SigningClaim<'a> {
    signing: &'a Mutex<HashSet<ContractId>>,
    contract_id: ContractId,
}

impl Drop for SigningClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut signing) = self.signing.lock() {
            signing.remove(&self.contract_id);
        }
    }
}

impl ContractLifecycle {
    pub fn new(ledger: Arc<AuditLedger>, contracts: Arc<InMemoryContractDirectory>) -> Self {
        Self {
            ledger,
            contracts,
            embedder: Box::new(StampEmbedder),
            ip_headers: default_ip_headers(),
            expiration: Duration::days(DEFAULT_EXPIRATION_DAYS),
            signing: Mutex::new(HashSet::new()),
        }
    }

    /// Ledger, document root and client IP headers taken from `config`.
    ///
    /// Contract ids continue after the highest id already in the ledger.
    pub fn from_config(config: &LedgerConfig) -> SignflowResult<Self> {
        let ledger = Arc::new(AuditLedger::from_config(config)?);
        let last = ledger.store().max_contract_id()?;
        let contracts = Arc::new(InMemoryContractDirectory::starting_after(
            config.documents.root.clone(),
            last,
        ));
        let mut lifecycle = Self::new(ledger, contracts);
        lifecycle.ip_headers = config.client_ip.headers.clone();
        Ok(lifecycle)
    }

    pub fn with_embedder(mut self, embedder: Box<dyn SignatureEmbedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    pub fn contracts(&self) -> &Arc<InMemoryContractDirectory> {
        &self.contracts
    }

    /// A verifier over this lifecycle's ledger and contracts.
    pub fn verifier(&self) -> IntegrityVerifier {
        IntegrityVerifier::new(self.ledger.store(), self.contracts.clone())
    }

    /// Client context for a request, using the configured IP header order.
    pub fn client_context<'a, I>(&self, headers: I, remote_addr: Option<&str>) -> ClientContext
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        ClientContext::from_request(headers, remote_addr, &self.ip_headers)
    }

    // ── Generation ────────────────────────────────────────────────────────────

    /// Store a freshly rendered contract and record `contract_generated`.
    ///
    /// The event carries the template id, the variable names (sorted, values
    /// omitted), the document file name and its SHA-256.
    ///
    /// Fails with `ContractState` if the allocated id already has ledger
    /// entries; the id is then skipped.
    pub fn generate(
        &self,
        template_id: u64,
        variables: &BTreeMap<String, String>,
        rendered: &[u8],
        ctx: &ClientContext,
    ) -> SignflowResult<ContractRecord> {
        let original_hash = sha256_hex(rendered);
        let now = Utc::now();

        let record = self.contracts.create(|id| ContractRecord {
            id,
            token: Uuid::new_v4().simple().to_string(),
            template_id: Some(template_id),
            status: ContractStatus::Pending,
            original_document: Some(original_file_name(id)),
            signed_document: None,
            hashes: DocumentHashRecord {
                original_hash: Some(original_hash.clone()),
                signed_hash: None,
            },
            signed_at: None,
            expires_at: Some(now + self.expiration),
        })?;
        let file_name = original_file_name(record.id);

        if let Err(e) = self.ensure_fresh_chain(record.id) {
            self.contracts.remove(record.id)?;
            return Err(e);
        }

        let staged = self.write_document(&file_name, rendered).and_then(|_| {
            self.ledger.append(
                record.id,
                event_types::CONTRACT_GENERATED,
                &json!({
                    "template_id": template_id,
                    "variables": variables.keys().collect::<Vec<_>>(),
                    "pdf_file": file_name,
                    "original_hash": original_hash,
                }),
                ctx,
            )
        });
        if let Err(e) = staged {
            self.discard_document(&file_name);
            self.contracts.remove(record.id)?;
            return Err(e);
        }

        info!(
            contract_id = %record.id,
            template_id,
            original_hash = %original_hash,
            "contract generated"
        );
        Ok(record)
    }

    // ── Signing ───────────────────────────────────────────────────────────────

    /// Record that the signing page was shown.
    ///
    /// Signed and expired contracts have no signing page, so nothing is
    /// recorded for them.
    pub fn record_view(&self, contract_id: ContractId, ctx: &ClientContext) -> SignflowResult<AuditEntry> {
        let contract = self.require(contract_id)?;
        if contract.is_signed() {
            return Err(SignflowError::ContractState {
                reason: format!("contract {} is already signed", contract_id),
            });
        }
        if contract.is_expired(Utc::now()) {
            return Err(SignflowError::ContractState {
                reason: format!("contract {} has expired", contract_id),
            });
        }

        self.ledger.append(
            contract_id,
            event_types::SIGNATURE_PAGE_VIEWED,
            &json!({ "token": contract.token }),
            ctx,
        )
    }

    /// Capture `signature` for `contract_id` and produce the signed document.
    ///
    /// Validation failures are returned before anything is recorded. Once
    /// `signature_captured` is recorded, an embedding failure is recorded as
    /// `signature_processing_error` and returned. On success the signed
    /// document is hashed, `contract_signed` is recorded with both hashes,
    /// and only then is the contract marked signed.
    ///
    /// A submission for a contract that is already being signed fails with
    /// `ContractState` without recording anything.
    pub fn sign(
        &self,
        contract_id: ContractId,
        signature: &str,
        signer: &Signer,
        ctx: &ClientContext,
    ) -> SignflowResult<ContractRecord> {
        let _claim = self.claim_signing(contract_id)?;
        let contract = self.require(contract_id)?;
        validate_submission(&contract, signature, signer)?;

        let mut captured = BTreeMap::new();
        captured.insert("signer_name", json!(signer.name));
        captured.insert("signer_email", json!(signer.email));
        if let Some(at) = signer.consent_timestamp.as_deref().filter(|s| !s.is_empty()) {
            captured.insert("consent_timestamp", json!(at));
        }
        self.ledger
            .append(contract_id, event_types::SIGNATURE_CAPTURED, &captured, ctx)?;

        let signed = self
            .read_original(&contract)
            .and_then(|unsigned| self.embedder.embed(&unsigned, signature, signer));
        let signed = match signed {
            Ok(bytes) => bytes,
            Err(e) => {
                let (code, message) = match &e {
                    SignflowError::SignatureRejected { code, reason } => (code.clone(), reason.clone()),
                    other => ("embed_failed".to_string(), other.to_string()),
                };
                warn!(contract_id = %contract_id, error_code = %code, "signature processing failed");
                self.ledger.append(
                    contract_id,
                    event_types::SIGNATURE_PROCESSING_ERROR,
                    &json!({
                        "error_code": code,
                        "error_message": message,
                        "signer_name": signer.name,
                        "signer_email": signer.email,
                    }),
                    ctx,
                )?;
                return Err(e);
            }
        };

        let file_name = signed_file_name(contract_id);
        self.write_document(&file_name, &signed)?;
        let signed_hash = sha256_hex(&signed);

        let recorded = self.ledger.append(
            contract_id,
            event_types::CONTRACT_SIGNED,
            &json!({
                "original_hash": contract.hashes.original_hash,
                "signed_hash": signed_hash,
                "pdf_file": file_name,
            }),
            ctx,
        );
        if let Err(e) = recorded {
            self.discard_document(&file_name);
            return Err(e);
        }

        let record = self.contracts.update(contract_id, |c| {
            c.status = ContractStatus::Signed;
            c.signed_document = Some(file_name.clone());
            c.hashes.signed_hash = Some(signed_hash.clone());
            c.signed_at = Some(Utc::now());
        })?;

        info!(contract_id = %contract_id, signed_hash = %signed_hash, "contract signed");
        Ok(record)
    }

    // ── Deletion ──────────────────────────────────────────────────────────────

    /// Delete an unsigned contract and its document. Signed contracts are
    /// kept.
    pub fn delete(&self, contract_id: ContractId, ctx: &ClientContext) -> SignflowResult<()> {
        let contract = self.require(contract_id)?;
        if contract.is_signed() {
            return Err(SignflowError::ContractState {
                reason: format!("contract {} is signed and cannot be deleted", contract_id),
            });
        }

        self.ledger.append(
            contract_id,
            event_types::CONTRACT_DELETED,
            &json!({ "reason": "manual_deletion" }),
            ctx,
        )?;
        self.remove_contract(&contract)?;

        info!(contract_id = %contract_id, "contract deleted");
        Ok(())
    }

    /// Delete every unsigned contract whose expiry is before `now`.
    ///
    /// Returns how many were deleted. Stops at the first failed append; the
    /// contracts already processed stay deleted.
    pub fn delete_expired(&self, now: DateTime<Utc>, ctx: &ClientContext) -> SignflowResult<usize> {
        let expired: Vec<ContractRecord> = self
            .contracts
            .list()?
            .into_iter()
            .filter(|c| c.is_expired(now))
            .collect();

        for contract in &expired {
            self.ledger.append(
                contract.id,
                event_types::CONTRACT_EXPIRED_DELETED,
                &json!({ "reason": "automatic_cleanup" }),
                ctx,
            )?;
            self.remove_contract(contract)?;
        }

        if !expired.is_empty() {
            info!(deleted = expired.len(), "expired contracts cleaned up");
        }
        Ok(expired.len())
    }

    // ── Storage ───────────────────────────────────────────────────────────────

    /// Record that the signed document was copied to `backend` as
    /// `object_name`. The event type is `uploaded_to_<backend>`.
    pub fn record_upload(
        &self,
        contract_id: ContractId,
        backend: &str,
        object_name: &str,
        ctx: &ClientContext,
    ) -> SignflowResult<AuditEntry> {
        self.require(contract_id)?;
        let backend = backend.trim();
        if backend.is_empty() {
            return Err(SignflowError::InvalidEvent {
                reason: "storage backend name must not be empty".to_string(),
            });
        }

        self.ledger.append(
            contract_id,
            &event_types::uploaded_to(backend),
            &json!({ "object": object_name }),
            ctx,
        )
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn claim_signing(&self, contract_id: ContractId) -> SignflowResult<SigningClaim<'_>> {
        let mut signing = self.signing.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("signing state lock poisoned: {}", e),
        })?;
        if !signing.insert(contract_id) {
            warn!(contract_id = %contract_id, "concurrent signature submission refused");
            return Err(SignflowError::ContractState {
                reason: format!("a signature for contract {} is already being processed", contract_id),
            });
        }
        Ok(SigningClaim {
            signing: &self.signing,
            contract_id,
        })
    }

    fn ensure_fresh_chain(&self, contract_id: ContractId) -> SignflowResult<()> {
        if self.ledger.store().has_entries(contract_id)? {
            warn!(contract_id = %contract_id, "allocated contract id already has audit entries");
            return Err(SignflowError::ContractState {
                reason: format!("contract {} already has audit entries", contract_id),
            });
        }
        Ok(())
    }

    fn require(&self, contract_id: ContractId) -> SignflowResult<ContractRecord> {
        self.contracts
            .get_contract(contract_id)?
            .ok_or(SignflowError::ContractNotFound {
                contract_id: contract_id.0,
            })
    }

    fn read_original(&self, contract: &ContractRecord) -> SignflowResult<Vec<u8>> {
        let relative = contract.original_document.as_deref().ok_or_else(|| {
            SignflowError::ContractState {
                reason: format!("contract {} has no document", contract.id),
            }
        })?;
        let path = self.contracts.resolve_document_path(relative);
        fs::read(&path).map_err(|e| SignflowError::StorageError {
            reason: format!("failed to read document '{}': {}", path.display(), e),
        })
    }

    fn write_document(&self, file_name: &str, bytes: &[u8]) -> SignflowResult<()> {
        let path = self.contracts.resolve_document_path(file_name);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)
        };
        write().map_err(|e| SignflowError::StorageError {
            reason: format!("failed to write document '{}': {}", path.display(), e),
        })
    }

    fn discard_document(&self, file_name: &str) {
        let path = self.contracts.resolve_document_path(file_name);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove document");
            }
        }
    }

    fn remove_contract(&self, contract: &ContractRecord) -> SignflowResult<()> {
        for file in [&contract.original_document, &contract.signed_document]
            .into_iter()
            .flatten()
        {
            self.discard_document(file);
        }
        self.contracts.remove(contract.id)?;
        Ok(())
    }
}

fn validate_submission(contract: &ContractRecord, signature: &str, signer: &Signer) -> SignflowResult<()> {
    let rejected = |code: &str, reason: &str| SignflowError::SignatureRejected {
        code: code.to_string(),
        reason: reason.to_string(),
    };

    if contract.is_signed() {
        return Err(SignflowError::ContractState {
            reason: format!("contract {} is already signed", contract.id),
        });
    }
    if signature.trim().is_empty() {
        return Err(rejected("invalid_signature", "signature data is required"));
    }
    if signer.name.trim().is_empty() || signer.email.trim().is_empty() {
        return Err(rejected("missing_signer", "signer name and email are required"));
    }
    if !signer.consent {
        return Err(rejected("consent_required", "consent is required"));
    }
    Ok(())
}

fn original_file_name(id: ContractId) -> String {
    format!("contract-{}.pdf", id)
}

fn signed_file_name(id: ContractId) -> String {
    format!("contract-{}-signed.pdf", id)
}
