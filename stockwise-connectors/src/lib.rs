//! Stockwise Ledger Connectors
//!
//! Adapters for remote inventory ledgers.
//! Normalizes service-specific responses to domain types and ledger outcomes.

#![warn(clippy::all)]

// Public modules
pub mod http_ledger;

// Re-exports
pub use http_ledger::{HttpLedger, HttpLedgerError};
