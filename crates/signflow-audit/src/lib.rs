//! # signflow-audit
//!
//! Append-only, SHA-256 hash-chained audit ledger for contract lifecycles.
//!
//! ## Overview
//!
//! Every lifecycle action on a contract (generation, page view, signature,
//! errors, deletion, upload) is appended as an `AuditEntry`. Each entry's
//! `previous_hash` is the digest of the contract's preceding entry over its
//! full canonical field set, so editing any historical field breaks the
//! link held by its successor.
//!
//! The chain uses no secret. It detects tampering by anyone who cannot also
//! rewrite every later entry of the contract; someone with full write access
//! to the store can rewrite the tail consistently. Anchor `AuditLedger::head`
//! values outside the store if that matters.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use signflow_audit::{AuditLedger, InMemoryLedgerStore};
//! use signflow_contracts::{client::ClientContext, entry::ContractId};
//!
//! let ledger = AuditLedger::new(Arc::new(InMemoryLedgerStore::new()));
//! ledger.append(ContractId(1), "contract_generated", &serde_json::json!({}), &ClientContext::system())?;
//! let trail = ledger.trail(ContractId(1))?;
//! ```

pub mod chain;
pub mod export;
pub mod jsonl;
pub mod ledger;
pub mod memory;
pub mod store;

pub use chain::{canonical_fields, canonical_json, entry_digest};
pub use jsonl::JsonlLedgerStore;
pub use ledger::AuditLedger;
pub use memory::InMemoryLedgerStore;
pub use store::open_store;

// ── Tests ─────────────────────────────────────────────────────────────────────
