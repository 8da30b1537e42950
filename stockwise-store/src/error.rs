//! Storage layer errors

use stockwise_domain::{Generation, ProductId};
use thiserror::Error;

/// Errors returned by an inventory ledger.
///
/// A conflicting conditional write is not an error; see `WriteOutcome`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No usable response (connection refused, reset, 5xx)
    #[error("Ledger transport error: {0}")]
    Transport(String),

    /// Request exceeded its time budget
    #[error("Ledger request timed out")]
    Timeout,

    /// Response arrived but could not be understood
    #[error("Malformed ledger response: {0}")]
    Malformed(String),

    /// Product does not exist in the ledger
    #[error("Product not found in ledger: {0}")]
    NotFound(ProductId),
}

impl LedgerError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, LedgerError::NotFound(_))
    }
}

/// Errors from the catalog cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Refresh failed; `generation` is still the installed snapshot
    #[error("Catalog refresh failed (still at {generation}): {source}")]
    RefreshFailed {
        /// Generation left in place
        generation: Generation,
        /// Underlying ledger failure
        #[source]
        source: LedgerError,
    },
}
