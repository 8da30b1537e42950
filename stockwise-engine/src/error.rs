//! Engine error types.

use stockwise_domain::{Generation, ProductId};
use thiserror::Error;

/// Add-time refusals. None of these touch the cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Product is not in the snapshot (possibly delisted since the page was rendered)
    #[error("Unknown product {product_id} at catalog {generation}")]
    UnknownProduct {
        product_id: ProductId,
        generation: Generation,
    },
}

/// Result type for engine decisions.
pub type EngineResult<T> = Result<T, EngineError>;
