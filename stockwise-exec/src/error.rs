//! Execution layer error types.

use stockwise_domain::DomainError;
use stockwise_engine::EngineError;
use stockwise_store::{CacheError, LedgerError};
use thiserror::Error;

/// Errors that can occur during session operations.
///
/// Per-line settlement failures are never reported here; they are data in
/// the `CheckoutReport`.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Add request failed the advisory catalog check
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] EngineError),

    /// Ledger unreachable before any line was attempted; the cart is untouched
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[source] LedgerError),

    /// Ledger call outside settlement failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Catalog refresh failed
    #[error("Catalog error: {0}")]
    Refresh(#[from] CacheError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
