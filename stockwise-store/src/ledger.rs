//! Inventory ledger trait definition (Port)
//!
//! The ledger is the authoritative store of per-product stock. This core only
//! reads from it and asks for conditional decrements.
//! Implementations can be HTTP, in-memory, or fault-injecting wrappers for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stockwise_domain::{NewProduct, Product, ProductId, StockLevel};

use crate::error::LedgerError;

/// Result of a conditional stock write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The stored value matched `expected_prior` and was replaced.
    Confirmed,
    /// The stored value had changed; nothing was written.
    ConflictRejected { current: StockLevel },
}

/// Result of listing a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CreateOutcome {
    Confirmed { product: Product },
    Rejected { reason: String },
}

/// Port to the authoritative inventory ledger.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Fetch every product. Used to rebuild the catalog snapshot.
    async fn list_all_products(&self) -> Result<Vec<Product>, LedgerError>;

    /// Point-in-time stock reading for one product.
    async fn get_current_quantity(&self, product_id: ProductId) -> Result<StockLevel, LedgerError>;

    /// Replace the stored stock with `new_value` only if it still equals `expected_prior`.
    async fn set_quantity(
        &self,
        product_id: ProductId,
        expected_prior: StockLevel,
        new_value: StockLevel,
    ) -> Result<WriteOutcome, LedgerError>;

    /// List a new product (seller-facing flow).
    ///
    /// The ledger assigns the item id; a confirmed outcome carries the stored record.
    async fn create_product(&self, product: NewProduct) -> Result<CreateOutcome, LedgerError>;

    /// Check that the ledger is reachable.
    async fn health_check(&self) -> Result<(), LedgerError>;
}
