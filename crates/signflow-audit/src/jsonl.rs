//! File-backed `LedgerStore`: one JSON-serialized `AuditEntry` per line.
//!
//! The file is only ever appended to. Every insert is flushed and synced
//! before it is acknowledged, so an acknowledged entry survives a crash.
//!
//! Reads re-parse the file rather than serving a cached copy. An operator
//! (or attacker) editing the file out-of-band is therefore visible to the
//! verifier, which is the point of keeping a tamper-evident log on disk.
//!
//! Cost: `latest` and `entries` parse the whole file while holding the
//! writer lock. An append is O(n) in the file size, a run of appends is
//! O(n²), and appends to different contracts serialize on that parse. This
//! suits the ledger of one deployment's contracts; larger volumes need a
//! store with an index on `(contract_id, id)`.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use signflow_contracts::{
    entry::{AuditEntry, ContractId, PendingEntry},
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::LedgerStore;

use crate::chain::next_created_at;

struct JsonlState {
    file: File,
    next_id: u64,
    /// Latest (id, created_at) per contract, as written by this process.
    heads: HashMap<ContractId, (u64, DateTime<Utc>)>,
}

/// An append-only JSON-lines ledger file.
pub struct JsonlLedgerStore {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlLedgerStore {
    /// Open (or create) the ledger file at `path`.
    ///
    /// Existing entries are replayed to recover the id counter and each
    /// contract's head. A line that does not parse is a `StorageError`; the
    /// store refuses to append behind a corrupt log.
    pub fn open(path: impl AsRef<Path>) -> SignflowResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SignflowError::StorageError {
                    reason: format!("failed to create ledger directory '{}': {}", parent.display(), e),
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SignflowError::StorageError {
                reason: format!("failed to open ledger file '{}': {}", path.display(), e),
            })?;

        let existing = read_entries(&path)?;
        let mut heads: HashMap<ContractId, (u64, DateTime<Utc>)> = HashMap::new();
        let mut max_id = 0;
        for entry in &existing {
            max_id = max_id.max(entry.id);
            let head = heads.entry(entry.contract_id).or_insert((entry.id, entry.created_at));
            if entry.id >= head.0 {
                *head = (entry.id, entry.created_at);
            }
        }

        info!(
            path = %path.display(),
            entries = existing.len(),
            contracts = heads.len(),
            "ledger file opened"
        );

        Ok(Self {
            path,
            state: Mutex::new(JsonlState {
                file,
                next_id: max_id + 1,
                heads,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_locked<T>(&self, f: impl FnOnce(Vec<AuditEntry>) -> T) -> SignflowResult<T> {
        // Hold the writer lock so a half-written line is never observed.
        let _state = self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;
        Ok(f(read_entries(&self.path)?))
    }
}

fn read_entries(path: &Path) -> SignflowResult<Vec<AuditEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(SignflowError::StorageError {
                reason: format!("failed to open ledger file '{}': {}", path.display(), e),
            })
        }
    };

    let mut entries = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SignflowError::StorageError {
            reason: format!("failed to read ledger line {}: {}", line_num + 1, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry =
            serde_json::from_str(&line).map_err(|e| SignflowError::StorageError {
                reason: format!("failed to parse ledger line {}: {}", line_num + 1, e),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

impl LedgerStore for JsonlLedgerStore {
    fn latest(&self, contract_id: ContractId) -> SignflowResult<Option<AuditEntry>> {
        self.read_locked(|entries| {
            entries
                .into_iter()
                .filter(|e| e.contract_id == contract_id)
                .max_by_key(|e| e.id)
        })
    }

    fn insert(&self, pending: PendingEntry) -> SignflowResult<AuditEntry> {
        let mut state = self.state.lock().map_err(|e| SignflowError::AuditWriteFailed {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;

        let head = state.heads.get(&pending.contract_id).copied();
        if head.map(|(id, _)| id) != pending.expected_head {
            return Err(SignflowError::ChainConflict {
                contract_id: pending.contract_id.0,
                expected_head: pending.expected_head,
            });
        }

        let created_at = next_created_at(head.map(|(_, at)| at));
        let entry = pending.into_entry(state.next_id, created_at);

        let line = serde_json::to_string(&entry).map_err(|e| SignflowError::AuditWriteFailed {
            reason: format!("failed to serialize audit entry: {}", e),
        })?;

        writeln!(state.file, "{}", line)
            .and_then(|_| state.file.flush())
            .and_then(|_| state.file.sync_data())
            .map_err(|e| SignflowError::AuditWriteFailed {
                reason: format!("failed to write ledger file '{}': {}", self.path.display(), e),
            })?;

        state.next_id += 1;
        state.heads.insert(entry.contract_id, (entry.id, entry.created_at));

        debug!(
            contract_id = %entry.contract_id,
            entry_id = entry.id,
            path = %self.path.display(),
            "audit entry appended to ledger file"
        );

        Ok(entry)
    }

    /// Served from the heads replayed at `open` plus this process's inserts.
    fn max_contract_id(&self) -> SignflowResult<Option<ContractId>> {
        let state = self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("ledger state lock poisoned: {}", e),
        })?;
        Ok(state.heads.keys().max().copied())
    }

    fn entries(&self, contract_id: ContractId) -> SignflowResult<Vec<AuditEntry>> {
        self.read_locked(|entries| {
            let mut entries: Vec<AuditEntry> = entries
                .into_iter()
                .filter(|e| e.contract_id == contract_id)
                .collect();
            entries.sort_by_key(|e| e.id);
            entries
        })
    }
}
