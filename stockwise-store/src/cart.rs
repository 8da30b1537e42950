//! Per-session cart store.
//!
//! Lines are kept in insertion order and keyed by product id. Every
//! operation is local and synchronous; nothing here touches the ledger.

use rust_decimal::Decimal;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use stockwise_domain::{CartLine, Product, ProductId, Quantity};
use tracing::debug;

/// Mutable cart for one session.
#[derive(Debug, Default)]
pub struct CartStore {
    lines: RwLock<Vec<CartLine>>,
}

impl CartStore {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CartLine>> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CartLine>> {
        self.lines.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `quantity` units of `product`.
    ///
    /// Increments an existing line (refreshing its product snapshot) or
    /// appends a new one. Never fails; returns the line's new quantity.
    pub fn add_line(&self, product: Product, quantity: Quantity) -> Quantity {
        let mut lines = self.write();
        let product_id = product.id;

        let resulting = match lines.iter_mut().find(|l| l.product_id() == product_id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                line.product = product;
                line.quantity
            },
            None => {
                lines.push(CartLine::new(product, quantity));
                quantity
            },
        };

        debug!(%product_id, added = %quantity, %resulting, "Cart line added");
        resulting
    }

    /// Remove the line for `product_id`. Absent lines are a no-op.
    ///
    /// Returns whether a line was removed.
    pub fn remove_line(&self, product_id: ProductId) -> bool {
        let removed = self.take(product_id);
        if removed {
            debug!(%product_id, "Cart line removed");
        }
        removed
    }

    /// Take `settled` units off a line after their settlement was confirmed.
    ///
    /// The line is removed when nothing remains. Units added while the
    /// settlement was in flight stay on the line. Returns what is left.
    pub fn settle_line(&self, product_id: ProductId, settled: Quantity) -> Option<Quantity> {
        let mut lines = self.write();
        let index = lines.iter().position(|l| l.product_id() == product_id)?;

        match lines[index].quantity.checked_sub(settled) {
            Some(remaining) => {
                lines[index].quantity = remaining;
                debug!(%product_id, %settled, %remaining, "Cart line partly settled");
                Some(remaining)
            },
            None => {
                lines.remove(index);
                debug!(%product_id, %settled, "Cart line cleared after settlement");
                None
            },
        }
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn take(&self, product_id: ProductId) -> bool {
        let mut lines = self.write();
        let before = lines.len();
        lines.retain(|l| l.product_id() != product_id);
        lines.len() != before
    }

    /// Copy of the current lines, in insertion order.
    pub fn lines(&self) -> Vec<CartLine> {
        self.read().clone()
    }

    /// The line for one product, if present.
    pub fn get(&self, product_id: ProductId) -> Option<CartLine> {
        self.read().iter().find(|l| l.product_id() == product_id).cloned()
    }

    /// Requested quantity for one product, if present.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<Quantity> {
        self.read()
            .iter()
            .find(|l| l.product_id() == product_id)
            .map(|l| l.quantity)
    }

    /// Whether a line exists for `product_id`.
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.read().iter().any(|l| l.product_id() == product_id)
    }

    /// Sum of `unit_price × quantity`, recomputed on every call.
    pub fn total_value(&self) -> Decimal {
        self.read().iter().map(CartLine::line_value).sum()
    }

    /// Sum of requested quantities, recomputed on every call.
    pub fn total_units(&self) -> u64 {
        self.read().iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockwise_domain::{Category, Price, StockLevel};

    fn product(item: i64, price: Decimal) -> Product {
        Product {
            id: ProductId::new(7, item),
            name: format!("Item {}", item),
            category: Category::Plants,
            unit_price: Price::new(price).unwrap(),
            available: StockLevel(100),
            description: String::new(),
            image: None,
        }
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let cart = CartStore::new();

        assert_eq!(cart.add_line(product(1, dec!(2)), qty(1)), qty(1));
        assert_eq!(cart.add_line(product(1, dec!(2)), qty(2)), qty(3));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(7, 1)), Some(qty(3)));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let cart = CartStore::new();
        cart.add_line(product(3, dec!(1)), qty(1));
        cart.add_line(product(1, dec!(1)), qty(1));
        cart.add_line(product(3, dec!(1)), qty(1));
        cart.add_line(product(2, dec!(1)), qty(1));

        let order: Vec<i64> = cart.lines().iter().map(|l| l.product_id().item_id.0).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cart = CartStore::new();
        cart.add_line(product(1, dec!(1)), qty(1));

        assert!(!cart.remove_line(ProductId::new(7, 99)));
        assert_eq!(cart.len(), 1);

        assert!(cart.remove_line(ProductId::new(7, 1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_follow_mutations() {
        let cart = CartStore::new();
        cart.add_line(product(1, dec!(2.50)), qty(2));
        cart.add_line(product(2, dec!(10)), qty(1));

        assert_eq!(cart.total_value(), dec!(15.00));
        assert_eq!(cart.total_units(), 3);

        assert_eq!(cart.settle_line(ProductId::new(7, 1), qty(2)), None);
        assert_eq!(cart.total_value(), dec!(10));
        assert_eq!(cart.total_units(), 1);

        cart.clear();
        assert_eq!(cart.total_value(), Decimal::ZERO);
        assert_eq!(cart.total_units(), 0);
    }

    #[test]
    fn test_settle_keeps_units_added_meanwhile() {
        let cart = CartStore::new();
        let id = ProductId::new(7, 1);
        cart.add_line(product(1, dec!(1)), qty(3));
        cart.add_line(product(1, dec!(1)), qty(2));

        assert_eq!(cart.settle_line(id, qty(3)), Some(qty(2)));
        assert_eq!(cart.quantity_of(id), Some(qty(2)));

        assert_eq!(cart.settle_line(id, qty(2)), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_settle_absent_line_is_noop() {
        let cart = CartStore::new();
        cart.add_line(product(1, dec!(1)), qty(1));

        assert_eq!(cart.settle_line(ProductId::new(7, 2), qty(1)), None);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_quantity_tracks_adds_minus_removes() {
        let cart = CartStore::new();
        let id = ProductId::new(7, 1);
        let mut expected: u32 = 0;

        for step in 0..20u32 {
            if step % 7 == 6 {
                cart.remove_line(id);
                expected = 0;
            } else {
                let n = step % 3 + 1;
                cart.add_line(product(1, dec!(1)), qty(n));
                expected += n;
            }
            let actual = cart.quantity_of(id).map(|q| q.get()).unwrap_or(0);
            assert_eq!(actual, expected);
        }
    }
}
