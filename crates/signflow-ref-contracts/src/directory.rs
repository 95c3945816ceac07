//! In-memory contract store with documents on local disk.
//!
//! Stands in for the surrounding system's contract table. Document paths in
//! records are relative; `resolve_document_path` anchors them at `root`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use signflow_contracts::{
    contract::ContractRecord,
    entry::ContractId,
    error::{SignflowError, SignflowResult},
};
use signflow_core::traits::ContractDirectory;

struct DirectoryState {
    next_id: u64,
    contracts: BTreeMap<ContractId, ContractRecord>,
}

pub struct InMemoryContractDirectory {
    root: PathBuf,
    state: Mutex<DirectoryState>,
}

impl InMemoryContractDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::starting_after(root, None)
    }

    /// An empty directory whose first allocated id follows `last`.
    pub fn starting_after(root: impl Into<PathBuf>, last: Option<ContractId>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(DirectoryState {
                next_id: last.map_or(1, |id| id.0 + 1),
                contracts: BTreeMap::new(),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a new record built by `build` from the freshly allocated id.
    pub fn create(&self, build: impl FnOnce(ContractId) -> ContractRecord) -> SignflowResult<ContractRecord> {
        let mut state = self.lock()?;
        let id = ContractId(state.next_id);
        state.next_id += 1;

        let record = build(id);
        state.contracts.insert(id, record.clone());
        Ok(record)
    }

    /// Apply `change` to the stored record and return the updated copy.
    pub fn update(
        &self,
        contract_id: ContractId,
        change: impl FnOnce(&mut ContractRecord),
    ) -> SignflowResult<ContractRecord> {
        let mut state = self.lock()?;
        let record = state
            .contracts
            .get_mut(&contract_id)
            .ok_or(SignflowError::ContractNotFound {
                contract_id: contract_id.0,
            })?;
        change(record);
        Ok(record.clone())
    }

    pub fn remove(&self, contract_id: ContractId) -> SignflowResult<Option<ContractRecord>> {
        Ok(self.lock()?.contracts.remove(&contract_id))
    }

    /// All records, ordered by id.
    pub fn list(&self) -> SignflowResult<Vec<ContractRecord>> {
        Ok(self.lock()?.contracts.values().cloned().collect())
    }

    fn lock(&self) -> SignflowResult<std::sync::MutexGuard<'_, DirectoryState>> {
        self.state.lock().map_err(|e| SignflowError::StorageError {
            reason: format!("contract directory lock poisoned: {}", e),
        })
    }
}

impl ContractDirectory for InMemoryContractDirectory {
    fn get_contract(&self, contract_id: ContractId) -> SignflowResult<Option<ContractRecord>> {
        Ok(self.lock()?.contracts.get(&contract_id).cloned())
    }

    fn resolve_document_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}
