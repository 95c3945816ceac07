//! # signflow-verify
//!
//! Integrity checks over the SignFlow audit ledger.
//!
//! - [`chain::ChainVerifier`] walks a contract's entries in id order and
//!   reports the first link that does not match its predecessor's digest.
//! - [`document::DocumentVerifier`] re-hashes a signed document and compares
//!   it with the hash recorded at signing time.
//! - [`integrity::IntegrityVerifier`] combines both for one contract.
//!
//! Verification is read-only. A failed check is a result, not an error.

pub mod chain;
pub mod document;
pub mod integrity;

pub use chain::ChainVerifier;
pub use document::{hash_file, sha256_hex, DocumentVerifier};
pub use integrity::IntegrityVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
