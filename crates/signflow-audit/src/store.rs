//! Store selection from configuration.

use std::sync::Arc;

use tracing::debug;

use signflow_config::{StorageBackend, StorageSettings};
use signflow_contracts::error::{SignflowError, SignflowResult};
use signflow_core::traits::LedgerStore;

use crate::{jsonl::JsonlLedgerStore, memory::InMemoryLedgerStore};

/// Open the store named by `settings.backend`.
pub fn open_store(settings: &StorageSettings) -> SignflowResult<Arc<dyn LedgerStore>> {
    debug!(backend = ?settings.backend, "opening ledger store");
    match settings.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryLedgerStore::new())),
        StorageBackend::Jsonl => {
            let path = settings.path.as_ref().ok_or_else(|| SignflowError::ConfigError {
                reason: "storage.path is required for the jsonl backend".to_string(),
            })?;
            Ok(Arc::new(JsonlLedgerStore::open(path)?))
        }
    }
}
