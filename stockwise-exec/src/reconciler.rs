//! Reconciler: mediates between the cart and the catalog snapshot.
//!
//! Cart mutations are validated against whatever snapshot is installed and
//! never wait on the network. Only `trigger_refresh` does I/O.

use std::sync::Arc;

use stockwise_domain::{Generation, ProductId, Quantity};
use stockwise_engine::{validate_add, AddDecision};
use stockwise_store::{CacheError, CartStore, CatalogCache, InventoryLedger};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ExecResult;

/// Validates cart mutations and drives catalog refreshes for one session.
pub struct Reconciler<L: InventoryLedger + ?Sized> {
    cart: Arc<CartStore>,
    catalog: Arc<CatalogCache<L>>,
}

impl<L: InventoryLedger + ?Sized> Reconciler<L> {
    /// Create a reconciler over a session's cart and catalog.
    pub fn new(cart: Arc<CartStore>, catalog: Arc<CatalogCache<L>>) -> Self {
        Self { cart, catalog }
    }

    /// The session cart.
    pub fn cart(&self) -> &Arc<CartStore> {
        &self.cart
    }

    /// The session catalog.
    pub fn catalog(&self) -> &Arc<CatalogCache<L>> {
        &self.catalog
    }

    /// Add `quantity` units of `product_id` if the installed snapshot knows it.
    ///
    /// On failure the cart is not touched. The returned decision names the
    /// generation it was computed against and flags a line that now asks for
    /// more than that snapshot showed.
    pub fn request_add(&self, product_id: ProductId, quantity: Quantity) -> ExecResult<AddDecision> {
        let snapshot = self.catalog.snapshot();
        let current = self.cart.quantity_of(product_id);

        let decision = validate_add(&snapshot, current, product_id, quantity).map_err(|e| {
            warn!(%product_id, %quantity, error = %e, "Add refused");
            e
        })?;

        self.cart.add_line(decision.product.clone(), quantity);
        Ok(decision)
    }

    /// Remove a line. Always succeeds.
    pub fn request_remove(&self, product_id: ProductId) {
        if !self.cart.remove_line(product_id) {
            debug!(%product_id, "Remove of absent line ignored");
        }
    }

    /// Refresh the catalog and return the new generation.
    pub async fn trigger_refresh(&self) -> Result<Generation, CacheError> {
        self.catalog.refresh().await
    }

    /// Be told of every generation installed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Generation> {
        self.catalog.subscribe()
    }
}
