//! The contract audit ledger.
//!
//! `AuditLedger` is the only writer of audit entries. Every append for a
//! contract runs "read latest, digest, insert" under that contract's mutex,
//! so two concurrent appends can never both link to the same predecessor.
//! The store's conditional insert backs this up when several ledgers share
//! one store: a lost race surfaces as `ChainConflict` and is retried.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::Serialize;
use tracing::{debug, warn};

use signflow_config::{LedgerConfig, LedgerSettings};
use signflow_contracts::{
    client::ClientContext,
    entry::{event_data_from, AuditEntry, ContractId, EventData, PendingEntry},
    error::{SignflowError, SignflowResult},
    export::ExportFormat,
};
use signflow_core::traits::LedgerStore;

use crate::{chain::entry_digest, export, store::open_store};

/// Append-only, hash-chained audit log keyed by contract.
///
/// # Thread safety
///
/// `append` may be called from any number of threads. Appends to the same
/// contract are serialized; appends to different contracts only contend on
/// the short lookup of their per-contract lock.
pub struct AuditLedger {
    store: Arc<dyn LedgerStore>,
    settings: LedgerSettings,
    pub(crate) locks: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

impl AuditLedger {
    /// A ledger over `store` with default settings.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_settings(store, LedgerSettings::default())
    }

    pub fn with_settings(store: Arc<dyn LedgerStore>, settings: LedgerSettings) -> Self {
        Self {
            store,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// A ledger over the store and with the settings named in `config`.
    pub fn from_config(config: &LedgerConfig) -> SignflowResult<Self> {
        Ok(Self::with_settings(open_store(&config.storage)?, config.ledger.clone()))
    }

    /// The backing store, for read-only collaborators such as verifiers.
    pub fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(&self.store)
    }

    /// Record `event_type` for `contract_id`.
    ///
    /// The contract's existence is not checked. `event_data` must serialize
    /// to a JSON object (or unit / `None` for an empty payload); anything else
    /// is rejected with `InvalidEvent` before the store is touched.
    ///
    /// Store failures are returned unchanged. A caller that cannot record
    /// its event must fail the operation that produced it.
    pub fn append<T>(
        &self,
        contract_id: ContractId,
        event_type: &str,
        event_data: &T,
        ctx: &ClientContext,
    ) -> SignflowResult<AuditEntry>
    where
        T: Serialize + ?Sized,
    {
        let event_type = event_type.trim();
        if event_type.is_empty() {
            return Err(SignflowError::InvalidEvent {
                reason: "event type must not be empty".to_string(),
            });
        }
        let event_data = event_data_from(event_data)?;

        let lock = self.contract_lock(contract_id)?;
        let result = match lock.lock() {
            Ok(_guard) => self.append_locked(contract_id, event_type, event_data, ctx),
            Err(e) => Err(SignflowError::AuditWriteFailed {
                reason: format!("contract {} append lock poisoned: {}", contract_id, e),
            }),
        };
        self.release_lock(contract_id, lock);

        result
    }

    /// All entries for `contract_id`, newest first.
    ///
    /// This is display order. Chain verification must not rely on it; the
    /// verifier re-reads the store in id order.
    pub fn trail(&self, contract_id: ContractId) -> SignflowResult<Vec<AuditEntry>> {
        let mut entries = self.store.entries(contract_id)?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        debug!(contract_id = %contract_id, entries = entries.len(), "audit trail read");
        Ok(entries)
    }

    /// Digest of the contract's latest entry: the `previous_hash` the next
    /// append will carry. `None` for a contract with no entries.
    ///
    /// Publishing this value somewhere the ledger's writers cannot reach is
    /// what turns tamper evidence into protection against a full rewrite.
    pub fn head(&self, contract_id: ContractId) -> SignflowResult<Option<String>> {
        Ok(self.store.latest(contract_id)?.as_ref().map(entry_digest))
    }

    /// Serialize the trail (newest first) as pretty JSON or CSV.
    pub fn export(&self, contract_id: ContractId, format: ExportFormat) -> SignflowResult<String> {
        let trail = self.trail(contract_id)?;
        match format {
            ExportFormat::Json => export::to_json(&trail),
            ExportFormat::Csv => export::to_csv(&trail),
        }
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn append_locked(
        &self,
        contract_id: ContractId,
        event_type: &str,
        event_data: EventData,
        ctx: &ClientContext,
    ) -> SignflowResult<AuditEntry> {
        let client_user_agent = ctx.truncated_user_agent(self.settings.user_agent_max_chars);
        let mut attempt = 0;

        loop {
            let latest = self.store.latest(contract_id)?;
            let pending = PendingEntry {
                contract_id,
                event_type: event_type.to_string(),
                event_data: event_data.clone(),
                previous_hash: latest.as_ref().map(entry_digest),
                client_ip: ctx.ip.clone(),
                client_user_agent: client_user_agent.clone(),
                expected_head: latest.as_ref().map(|e| e.id),
            };

            match self.store.insert(pending) {
                Ok(entry) => {
                    debug!(
                        contract_id = %contract_id,
                        entry_id = entry.id,
                        event_type = %entry.event_type,
                        linked = entry.previous_hash.is_some(),
                        "audit event appended"
                    );
                    return Ok(entry);
                }
                Err(SignflowError::ChainConflict { expected_head, .. })
                    if attempt < self.settings.append_retries =>
                {
                    attempt += 1;
                    warn!(
                        contract_id = %contract_id,
                        expected_head = ?expected_head,
                        attempt,
                        "chain head moved during append, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn contract_lock(&self, contract_id: ContractId) -> SignflowResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|e| SignflowError::AuditWriteFailed {
            reason: format!("ledger lock table poisoned: {}", e),
        })?;
        Ok(Arc::clone(locks.entry(contract_id).or_default()))
    }

    /// Drop the contract's lock from the table once nobody else holds it.
    fn release_lock(&self, contract_id: ContractId, lock: Arc<Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            // One reference in the table, one here: no other appender waits.
            if Arc::strong_count(&lock) == 2 {
                locks.remove(&contract_id);
            }
        }
    }
}
