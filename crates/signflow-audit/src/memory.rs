//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` keeps every entry in a `Vec` behind a `Mutex`. It is
//! the reference store for tests and demos; nothing survives the process.
//!
//! `overwrite_unchecked` and `insert_unchecked` bypass the chain entirely.
//! They stand in for someone with direct write access to the backing table
//! and exist so tamper drills can be run against a live ledger.

use std::{collections::HashMap, sync::Mutex};

use tracing::debug;

use signflow_contracts::{
    entry::{AuditEntry, ContractId, PendingEntry},
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::LedgerStore;

use crate::chain::next_created_at;

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All entries in insert order.
    pub(crate) entries: Vec<AuditEntry>,

    /// The id the next insert receives (starts at 1).
    pub(crate) next_id: u64,

    /// Index into `entries` of each contract's latest entry.
    pub(crate) heads: HashMap<ContractId, usize>,
}

impl InMemoryState {
    fn rebuild_heads(&mut self) {
        self.heads.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            let replace = match self.heads.get(&entry.contract_id) {
                Some(&current) => self.entries[current].id < entry.id,
                None => true,
            };
            if replace {
                self.heads.insert(entry.contract_id, idx);
            }
        }
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// A process-local, append-only ledger store.
pub struct InMemoryLedgerStore {
    pub(crate) state: Mutex<InMemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                entries: Vec::new(),
                next_id: 1,
                heads: HashMap::new(),
            }),
        }
    }

    /// Total number of entries across all contracts.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the stored entry that has `entry.id`, bypassing the ledger.
    ///
    /// Returns `false` if no entry with that id exists.
    pub fn overwrite_unchecked(&self, entry: AuditEntry) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let Some(slot) = state.entries.iter_mut().find(|e| e.id == entry.id) else {
            return false;
        };
        *slot = entry;
        state.rebuild_heads();
        true
    }

    /// Insert `entry` verbatim, bypassing id assignment and chain linkage.
    pub fn insert_unchecked(&self, entry: AuditEntry) {
        if let Ok(mut state) = self.state.lock() {
            state.next_id = state.next_id.max(entry.id + 1);
            state.entries.push(entry);
            state.rebuild_heads();
        }
    }

    /// Remove the entry with `id`, bypassing the ledger.
    pub fn remove_unchecked(&self, id: u64) -> Option<AuditEntry> {
        let mut state = self.state.lock().ok()?;
        let idx = state.entries.iter().position(|e| e.id == id)?;
        let removed = state.entries.remove(idx);
        state.rebuild_heads();
        Some(removed)
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── LedgerStore impl ──────────────────────────────────────────────────────────

impl LedgerStore for InMemoryLedgerStore {
    fn latest(&self, contract_id: ContractId) -> SignflowResult<Option<AuditEntry>> {
        let state = self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;
        Ok(state
            .heads
            .get(&contract_id)
            .map(|&idx| state.entries[idx].clone()))
    }

    fn insert(&self, pending: PendingEntry) -> SignflowResult<AuditEntry> {
        let mut state = self.state.lock().map_err(|e| SignflowError::AuditWriteFailed {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;

        let head = state
            .heads
            .get(&pending.contract_id)
            .map(|&idx| &state.entries[idx]);

        if head.map(|e| e.id) != pending.expected_head {
            return Err(SignflowError::ChainConflict {
                contract_id: pending.contract_id.0,
                expected_head: pending.expected_head,
            });
        }

        let created_at = next_created_at(head.map(|e| e.created_at));
        let id = state.next_id;
        let entry = pending.into_entry(id, created_at);

        state.entries.push(entry.clone());
        state.next_id += 1;
        let idx = state.entries.len() - 1;
        state.heads.insert(entry.contract_id, idx);

        debug!(
            contract_id = %entry.contract_id,
            entry_id = entry.id,
            "audit entry stored in memory"
        );

        Ok(entry)
    }

    fn max_contract_id(&self) -> SignflowResult<Option<ContractId>> {
        let state = self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;
        Ok(state.heads.keys().max().copied())
    }

    fn entries(&self, contract_id: ContractId) -> SignflowResult<Vec<AuditEntry>> {
        let state = self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;
        let mut entries: Vec<AuditEntry> = state
            .entries
            .iter()
            .filter(|e| e.contract_id == contract_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }
}
