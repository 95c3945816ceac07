//! Audit entry types.
//!
//! `AuditEntry` is one immutable row of a contract's ledger. `PendingEntry`
//! is what the ledger hands to a store; the store assigns `id` and
//! `created_at` and returns the finished `AuditEntry`.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SignflowError, SignflowResult};

/// Identifier of a contract in the external contract store.
///
/// The ledger never owns contracts; it only keys its entries by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub u64);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event payload: string keys to arbitrary JSON values.
///
/// A `BTreeMap` keeps keys sorted, so two payloads with the same pairs are
/// equal regardless of insertion order.
pub type EventData = BTreeMap<String, serde_json::Value>;

/// Well-known event type tags.
///
/// The vocabulary is open: the ledger accepts any non-empty string, these
/// are just the tags the contract lifecycle itself emits.
pub mod event_types {
    pub const CONTRACT_GENERATED: &str = "contract_generated";
    pub const SIGNATURE_PAGE_VIEWED: &str = "signature_page_viewed";
    pub const SIGNATURE_CAPTURED: &str = "signature_captured";
    pub const CONTRACT_SIGNED: &str = "contract_signed";
    pub const SIGNATURE_PROCESSING_ERROR: &str = "signature_processing_error";
    pub const CONTRACT_DELETED: &str = "contract_deleted";
    pub const CONTRACT_EXPIRED_DELETED: &str = "contract_expired_deleted";
    pub const UPLOADED_TO_GCS: &str = "uploaded_to_gcs";

    /// Tag for an upload to an arbitrary storage backend, e.g.
    /// `uploaded_to("gcs") == "uploaded_to_gcs"`.
    pub fn uploaded_to(backend: &str) -> String {
        format!("uploaded_to_{backend}")
    }
}

/// Convert any serializable payload into `EventData`.
///
/// Accepts JSON objects and `null` (empty payload). Anything else, or a value
/// serde cannot represent as JSON, is rejected with `InvalidEvent`.
pub fn event_data_from<T: Serialize + ?Sized>(payload: &T) -> SignflowResult<EventData> {
    let value = serde_json::to_value(payload).map_err(|e| SignflowError::InvalidEvent {
        reason: format!("event data is not serializable: {e}"),
    })?;

    match value {
        serde_json::Value::Null => Ok(EventData::new()),
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(SignflowError::InvalidEvent {
            reason: format!("event data must be a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// One immutable entry in a contract's hash-chained ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Store-assigned sequence number, unique across all contracts.
    pub id: u64,

    pub contract_id: ContractId,

    /// Tag from the open event vocabulary (see [`event_types`]).
    pub event_type: String,

    #[serde(default)]
    pub event_data: EventData,

    /// Digest of the previous entry of the same contract, `None` for the
    /// first entry.
    pub previous_hash: Option<String>,

    pub client_ip: Option<String>,

    pub client_user_agent: Option<String>,

    /// Insert time (UTC, microsecond precision), monotonic per contract.
    pub created_at: DateTime<Utc>,
}

/// An entry the ledger has prepared but the store has not yet numbered.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub contract_id: ContractId,
    pub event_type: String,
    pub event_data: EventData,
    pub previous_hash: Option<String>,
    pub client_ip: Option<String>,
    pub client_user_agent: Option<String>,

    /// The id of the entry `previous_hash` was computed from.
    ///
    /// Stores must refuse the insert with `ChainConflict` when the
    /// contract's current latest id differs from this value.
    pub expected_head: Option<u64>,
}

impl PendingEntry {
    /// Finish the entry with the store-assigned `id` and `created_at`.
    pub fn into_entry(self, id: u64, created_at: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id,
            contract_id: self.contract_id,
            event_type: self.event_type,
            event_data: self.event_data,
            previous_hash: self.previous_hash,
            client_ip: self.client_ip,
            client_user_agent: self.client_user_agent,
            created_at,
        }
    }
}
