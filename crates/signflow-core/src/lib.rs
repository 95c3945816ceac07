//! # signflow-core
//!
//! The seams of the SignFlow audit ledger.
//!
//! This crate provides the two traits every other crate is wired through:
//! - `LedgerStore`: durable, append-only persistence for audit entries
//! - `ContractDirectory`: read access to the external contract store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signflow_core::traits::{ContractDirectory, LedgerStore};
//! ```

pub mod traits;

pub use traits::{ContractDirectory, LedgerStore};
