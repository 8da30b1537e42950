//! Add-time validation against the last-known catalog snapshot.
//!
//! Only an unknown product refuses the add. Asking for more than the
//! snapshot shows is reported on the decision but accepted: the snapshot
//! can be arbitrarily stale, and the authoritative check happens again at
//! settlement.

use serde::Serialize;
use stockwise_domain::{CatalogSnapshot, Generation, Product, ProductId, Quantity, StockLevel};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// An accepted add request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddDecision {
    /// Product record from the snapshot, to be stored on the cart line
    pub product: Product,
    /// Line quantity after the add
    pub resulting_quantity: Quantity,
    /// Snapshot generation the decision was computed against
    pub generation: Generation,
    /// Stock the snapshot showed for the product
    pub observed: StockLevel,
    /// Whether the line now asks for more than `observed`
    pub exceeds_observed: bool,
}

/// Decide whether `quantity` more units of `product_id` may be added.
///
/// # Errors
/// Returns `EngineError::UnknownProduct` if the snapshot does not list the product
///
/// `current` is the quantity already on the cart line, if any.
pub fn validate_add(
    snapshot: &CatalogSnapshot,
    current: Option<Quantity>,
    product_id: ProductId,
    quantity: Quantity,
) -> EngineResult<AddDecision> {
    let generation = snapshot.generation();

    let product = snapshot
        .get(&product_id)
        .ok_or(EngineError::UnknownProduct { product_id, generation })?;

    let resulting_quantity = match current {
        Some(existing) => existing.saturating_add(quantity),
        None => quantity,
    };

    let observed = product.available;
    let exceeds_observed = !observed.covers(resulting_quantity);

    if exceeds_observed {
        warn!(
            %product_id,
            %generation,
            resulting = %resulting_quantity,
            %observed,
            "Add beyond observed stock; settlement decides"
        );
    } else {
        debug!(
            %product_id,
            %generation,
            resulting = %resulting_quantity,
            %observed,
            "Add accepted"
        );
    }

    Ok(AddDecision {
        product: product.clone(),
        resulting_quantity,
        generation,
        observed,
        exceeds_observed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockwise_domain::{Category, Price, StockLevel};

    fn snapshot_with(available: u32) -> CatalogSnapshot {
        CatalogSnapshot::new(
            Generation(2),
            vec![Product {
                id: ProductId::new(1, 10),
                name: "Oak chair".to_string(),
                category: Category::Furniture,
                unit_price: Price::new(dec!(80)).unwrap(),
                available: StockLevel(available),
                description: String::new(),
                image: None,
            }],
        )
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_unknown_product_names_generation() {
        let err = validate_add(&snapshot_with(5), None, ProductId::new(9, 9), qty(1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownProduct {
                product_id: ProductId::new(9, 9),
                generation: Generation(2),
            }
        );
    }

    #[test]
    fn test_new_line_within_observed_stock() {
        let decision = validate_add(&snapshot_with(5), None, ProductId::new(1, 10), qty(5)).unwrap();
        assert_eq!(decision.resulting_quantity, qty(5));
        assert_eq!(decision.generation, Generation(2));
        assert_eq!(decision.product.name, "Oak chair");
        assert!(!decision.exceeds_observed);
    }

    #[test]
    fn test_increment_counts_existing_quantity() {
        let snapshot = snapshot_with(5);
        let id = ProductId::new(1, 10);

        let within = validate_add(&snapshot, Some(qty(3)), id, qty(2)).unwrap();
        assert!(!within.exceeds_observed);

        let beyond = validate_add(&snapshot, Some(qty(3)), id, qty(3)).unwrap();
        assert_eq!(beyond.resulting_quantity, qty(6));
        assert_eq!(beyond.observed, StockLevel(5));
        assert!(beyond.exceeds_observed);
    }

    #[test]
    fn test_sold_out_product_is_still_accepted() {
        let decision = validate_add(&snapshot_with(0), None, ProductId::new(1, 10), qty(1)).unwrap();
        assert_eq!(decision.observed, StockLevel::ZERO);
        assert!(decision.exceeds_observed);
    }
}
