//! # signflow-contracts
//!
//! Shared types and errors for the SignFlow audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, pure helpers and error types.

pub mod client;
pub mod contract;
pub mod entry;
pub mod error;
pub mod export;
pub mod verify;
