//! In-memory ledger implementation
//!
//! Used for testing and development without a ledger service.
//! Thread-safe using RwLock; the conditional write compares and swaps
//! under a single write lock.

use crate::error::LedgerError;
use crate::ledger::{CreateOutcome, InventoryLedger, WriteOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use stockwise_domain::{ItemId, NewProduct, Product, ProductId, StockLevel};
use tracing::debug;

/// In-memory authoritative ledger
pub struct MemoryLedger {
    products: RwLock<HashMap<ProductId, Product>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Create a ledger seeded with products
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let ledger = Self::new();
        for product in products {
            ledger.insert(product);
        }
        ledger
    }

    /// Insert or replace a product record
    pub fn insert(&self, product: Product) {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        products.insert(product.id, product);
    }

    /// Remove a product (simulates delisting)
    pub fn remove(&self, product_id: ProductId) -> bool {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        products.remove(&product_id).is_some()
    }

    /// Overwrite stock unconditionally (simulates an out-of-band change)
    pub fn set_stock(&self, product_id: ProductId, level: StockLevel) -> bool {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        match products.get_mut(&product_id) {
            Some(product) => {
                product.available = level;
                true
            },
            None => false,
        }
    }

    /// Current stock, bypassing counters
    pub fn stock(&self, product_id: ProductId) -> Option<StockLevel> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        products.get(&product_id).map(|p| p.available)
    }

    /// Get the number of products
    pub fn product_count(&self) -> usize {
        self.products.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of `get_current_quantity` calls served
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set_quantity` calls received, accepted or not
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.products.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedger {
    async fn list_all_products(&self) -> Result<Vec<Product>, LedgerError> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn get_current_quantity(&self, product_id: ProductId) -> Result<StockLevel, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.stock(product_id).ok_or(LedgerError::NotFound(product_id))
    }

    async fn set_quantity(
        &self,
        product_id: ProductId,
        expected_prior: StockLevel,
        new_value: StockLevel,
    ) -> Result<WriteOutcome, LedgerError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        let product = products.get_mut(&product_id).ok_or(LedgerError::NotFound(product_id))?;

        if product.available != expected_prior {
            debug!(
                %product_id,
                expected = %expected_prior,
                current = %product.available,
                "Conditional write rejected"
            );
            return Ok(WriteOutcome::ConflictRejected {
                current: product.available,
            });
        }

        product.available = new_value;
        Ok(WriteOutcome::Confirmed)
    }

    async fn create_product(&self, product: NewProduct) -> Result<CreateOutcome, LedgerError> {
        if let Err(e) = product.validate() {
            return Ok(CreateOutcome::Rejected { reason: e.to_string() });
        }

        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        let seller_id = product.seller_id;
        let highest = products
            .keys()
            .filter(|id| id.seller_id == seller_id)
            .map(|id| id.item_id)
            .max();

        let product = product.into_product(ItemId::next_for(seller_id, highest));
        debug!(product_id = %product.id, "Item id assigned");

        products.insert(product.id, product.clone());
        Ok(CreateOutcome::Confirmed { product })
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockwise_domain::{Category, Price, SellerId};

    fn create_test_product(item: i64, available: u32) -> Product {
        Product {
            id: ProductId::new(1, item),
            name: format!("Product {}", item),
            category: Category::Kitchen,
            unit_price: Price::new(dec!(3.99)).unwrap(),
            available: StockLevel(available),
            description: String::new(),
            image: None,
        }
    }

    fn new_product(seller: i64, name: &str) -> NewProduct {
        NewProduct {
            seller_id: SellerId(seller),
            name: name.to_string(),
            category: Category::Kitchen,
            unit_price: Price::new(dec!(1)).unwrap(),
            initial_stock: StockLevel(4),
            description: String::new(),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let ledger = MemoryLedger::with_products(vec![
            create_test_product(3, 1),
            create_test_product(1, 1),
            create_test_product(2, 1),
        ]);

        let all = ledger.list_all_products().await.unwrap();
        let ids: Vec<i64> = all.iter().map(|p| p.id.item_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_read_unknown_product() {
        let ledger = MemoryLedger::new();
        let result = ledger.get_current_quantity(ProductId::new(1, 1)).await;
        assert_eq!(result, Err(LedgerError::NotFound(ProductId::new(1, 1))));
        assert_eq!(ledger.read_count(), 1);
    }

    #[tokio::test]
    async fn test_conditional_write_confirms_on_match() {
        let ledger = MemoryLedger::with_products(vec![create_test_product(1, 10)]);
        let id = ProductId::new(1, 1);

        let outcome = ledger.set_quantity(id, StockLevel(10), StockLevel(7)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Confirmed);
        assert_eq!(ledger.stock(id), Some(StockLevel(7)));
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn test_conditional_write_rejects_stale_prior() {
        let ledger = MemoryLedger::with_products(vec![create_test_product(1, 10)]);
        let id = ProductId::new(1, 1);

        ledger.set_stock(id, StockLevel(4));

        let outcome = ledger.set_quantity(id, StockLevel(10), StockLevel(7)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::ConflictRejected { current: StockLevel(4) });
        assert_eq!(ledger.stock(id), Some(StockLevel(4)));
    }

    #[tokio::test]
    async fn test_create_product() {
        let ledger = MemoryLedger::new();

        let outcome = ledger.create_product(new_product(5, "Kettle")).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Confirmed { ref product } if product.available == StockLevel(4)));
        assert_eq!(ledger.product_count(), 1);

        let nameless = ledger.create_product(new_product(5, "")).await.unwrap();
        assert!(matches!(nameless, CreateOutcome::Rejected { .. }));
        assert_eq!(ledger.product_count(), 1);
    }

    #[tokio::test]
    async fn test_first_listing_opens_seller_block() {
        let ledger = MemoryLedger::new();

        let outcome = ledger.create_product(new_product(5, "Kettle")).await.unwrap();
        match outcome {
            CreateOutcome::Confirmed { product } => assert_eq!(product.id, ProductId::new(5, 5001)),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(ledger.stock(ProductId::new(5, 5001)), Some(StockLevel(4)));
    }

    #[tokio::test]
    async fn test_next_listing_follows_seller_max() {
        // Seller 1 already has items 1 and 3; seller 2 has a higher id that must not count
        let mut other_seller = create_test_product(40, 1);
        other_seller.id = ProductId::new(2, 40);
        let ledger = MemoryLedger::with_products(vec![
            create_test_product(1, 1),
            create_test_product(3, 1),
            other_seller,
        ]);

        let first = ledger.create_product(new_product(1, "Kettle")).await.unwrap();
        let second = ledger.create_product(new_product(1, "Teapot")).await.unwrap();

        let ids: Vec<ProductId> = [first, second]
            .into_iter()
            .filter_map(|outcome| match outcome {
                CreateOutcome::Confirmed { product } => Some(product.id),
                CreateOutcome::Rejected { .. } => None,
            })
            .collect();
        assert_eq!(ids, vec![ProductId::new(1, 4), ProductId::new(1, 5)]);
    }

    #[tokio::test]
    async fn test_clear() {
        let ledger = MemoryLedger::with_products(vec![create_test_product(1, 1)]);
        ledger.get_current_quantity(ProductId::new(1, 1)).await.unwrap();

        ledger.clear();

        assert_eq!(ledger.product_count(), 0);
        assert_eq!(ledger.read_count(), 0);
    }
}
