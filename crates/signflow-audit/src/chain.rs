//! Hash-chain primitives: canonical serialization and entry digests.
//!
//! The digest of an entry is what the NEXT entry of the same contract stores
//! as its `previous_hash`. Changing any canonical field of a historical entry
//! changes its digest, which then no longer matches its successor's link.
//!
//! Digest input layout (bytes, in order):
//!   1. the version tag `signflow-audit-v1\n`
//!   2. canonical JSON of the field set below
//!
//! Canonical field set (a JSON object, keys sorted):
//!   client_ip          string or null
//!   client_user_agent  string or null
//!   contract_id        decimal string
//!   created_at         RFC 3339 UTC, microseconds, `Z` suffix
//!   event_data         canonical JSON of the payload, as a string
//!   event_type         string
//!   id                 decimal string
//!   previous_hash      string or null
//!
//! This layout is part of the persisted format. Historical chains can only
//! be verified while it stays byte-for-byte identical; any change needs a
//! new version tag.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use signflow_contracts::entry::{AuditEntry, EventData};

/// Domain separator and format version mixed into every digest.
pub const DIGEST_VERSION_TAG: &str = "signflow-audit-v1\n";

/// Serialize `value` as JSON with object keys sorted at every depth and no
/// insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Canonical JSON of an event payload.
pub fn canonical_event_data(data: &EventData) -> String {
    let object: Map<String, Value> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    canonical_json(&Value::Object(object))
}

/// The timestamp text used in the digest input.
pub fn canonical_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Canonical JSON of the entry's full field set.
pub fn canonical_fields(entry: &AuditEntry) -> String {
    let optional = |v: &Option<String>| match v {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    };

    let mut fields = Map::new();
    fields.insert("client_ip".into(), optional(&entry.client_ip));
    fields.insert("client_user_agent".into(), optional(&entry.client_user_agent));
    fields.insert("contract_id".into(), Value::String(entry.contract_id.0.to_string()));
    fields.insert("created_at".into(), Value::String(canonical_timestamp(&entry.created_at)));
    fields.insert(
        "event_data".into(),
        Value::String(canonical_event_data(&entry.event_data)),
    );
    fields.insert("event_type".into(), Value::String(entry.event_type.clone()));
    fields.insert("id".into(), Value::String(entry.id.to_string()));
    fields.insert("previous_hash".into(), optional(&entry.previous_hash));

    canonical_json(&Value::Object(fields))
}

/// Compute the chain-link digest of `entry`.
///
/// Returns a lowercase 64-character hex string.
pub fn entry_digest(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_VERSION_TAG.as_bytes());
    hasher.update(canonical_fields(entry).as_bytes());
    hex::encode(hasher.finalize())
}

/// The `created_at` a store should assign to a new entry.
///
/// Truncated to microseconds (the precision of the canonical form) and never
/// earlier than `previous`, the contract's latest `created_at`.
pub fn next_created_at(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}
