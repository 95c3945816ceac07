//! Configuration schema.
//!
//! Every section and field has a default, so an empty TOML document yields
//! a working in-memory configuration.
//!
//! Example:
//! ```toml
//! [ledger]
//! user_agent_max_chars = 500
//! append_retries = 3
//!
//! [client_ip]
//! headers = ["client-ip", "x-forwarded-for", "x-forwarded", "forwarded-for", "forwarded"]
//!
//! [storage]
//! backend = "jsonl"
//! path = "var/audit.jsonl"
//!
//! [documents]
//! root = "var/documents"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use signflow_contracts::client::{default_ip_headers, DEFAULT_USER_AGENT_MAX_CHARS};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub ledger: LedgerSettings,
    pub client_ip: ClientIpSettings,
    pub storage: StorageSettings,
    pub documents: DocumentSettings,
}

/// Append behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Stored user agents are cut to this many characters.
    pub user_agent_max_chars: usize,

    /// How many times an append is retried after a `ChainConflict`.
    pub append_retries: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            user_agent_max_chars: DEFAULT_USER_AGENT_MAX_CHARS,
            append_retries: 3,
        }
    }
}

/// Which request headers may carry the client IP, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientIpSettings {
    pub headers: Vec<String>,
}

impl Default for ClientIpSettings {
    fn default() -> Self {
        Self {
            headers: default_ip_headers(),
        }
    }
}

/// The ledger's backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Process-local, lost on exit. Tests and demos.
    #[default]
    Memory,
    /// Append-only JSON-lines file at `storage.path`.
    Jsonl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Required when `backend = "jsonl"`.
    pub path: Option<PathBuf>,
}

/// Where contract documents live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub root: PathBuf,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("var/documents"),
        }
    }
}
