//! Shopping session: the explicit context object for one shopper.
//!
//! Owns exactly one cart and one catalog cache. Nothing here is global;
//! two sessions only meet at the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use stockwise_domain::{
    CartLine, CatalogSnapshot, CheckoutReport, Generation, NewProduct, ProductId, Quantity,
};
use stockwise_engine::AddDecision;
use stockwise_store::{CartStore, CatalogCache, CreateOutcome, InventoryLedger, LedgerError};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ExecConfig;
use crate::coordinator::SettlementCoordinator;
use crate::error::{ExecError, ExecResult};
use crate::reconciler::Reconciler;

/// Read-only view of a cart for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total_units: u64,
    pub total_value: Decimal,
}

/// One shopper's cart, catalog and checkout machinery.
pub struct Session<L: InventoryLedger + ?Sized> {
    id: Uuid,
    created_at: DateTime<Utc>,
    ledger: Arc<L>,
    reconciler: Arc<Reconciler<L>>,
    coordinator: SettlementCoordinator<L>,
    config: ExecConfig,
}

impl<L: InventoryLedger + ?Sized> Session<L> {
    /// Create a session with an empty cart and a generation-0 catalog.
    pub fn new(ledger: Arc<L>, config: ExecConfig) -> Self {
        let cart = Arc::new(CartStore::new());
        let catalog = Arc::new(CatalogCache::new(ledger.clone(), config.refresh_timeout));
        let reconciler = Arc::new(Reconciler::new(cart, catalog));
        let coordinator = SettlementCoordinator::new(ledger.clone(), reconciler.clone(), config.clone());

        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            ledger,
            reconciler,
            coordinator,
            config,
        }
    }

    /// Create a session and load its first catalog generation.
    ///
    /// A failed initial refresh is logged, not fatal: the session starts at
    /// generation 0 and can refresh later.
    pub async fn open(ledger: Arc<L>, config: ExecConfig) -> Self {
        let session = Self::new(ledger, config);
        match session.refresh().await {
            Ok(generation) => info!(session_id = %session.id, %generation, "Session opened"),
            Err(e) => warn!(session_id = %session.id, error = %e, "Session opened without catalog"),
        }
        session
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The session's reconciler.
    pub fn reconciler(&self) -> &Arc<Reconciler<L>> {
        &self.reconciler
    }

    /// Current cart lines and totals.
    pub fn cart(&self) -> CartView {
        let cart = self.reconciler.cart();
        CartView {
            lines: cart.lines(),
            total_units: cart.total_units(),
            total_value: cart.total_value(),
        }
    }

    /// Add units of a product known to the installed catalog.
    pub fn add_line(&self, product_id: ProductId, quantity: Quantity) -> ExecResult<AddDecision> {
        self.reconciler.request_add(product_id, quantity)
    }

    /// Remove a product's line. Always succeeds.
    pub fn remove_line(&self, product_id: ProductId) {
        self.reconciler.request_remove(product_id);
    }

    /// Settle the cart against the ledger.
    pub async fn checkout(&self) -> ExecResult<CheckoutReport> {
        self.coordinator.checkout().await
    }

    /// The installed catalog snapshot.
    pub fn catalog(&self) -> Arc<CatalogSnapshot> {
        self.reconciler.catalog().snapshot()
    }

    /// Refresh the catalog from the ledger.
    pub async fn refresh(&self) -> ExecResult<Generation> {
        Ok(self.reconciler.trigger_refresh().await?)
    }

    /// Be told of every catalog generation this session installs.
    pub fn subscribe(&self) -> broadcast::Receiver<Generation> {
        self.reconciler.subscribe()
    }

    /// List a new product (seller flow) and refresh on success.
    ///
    /// A refresh failure after a confirmed listing is logged; the listing
    /// itself stands.
    pub async fn create_product(&self, product: NewProduct) -> ExecResult<CreateOutcome> {
        product.validate()?;

        let outcome = timeout(self.config.ledger_timeout, self.ledger.create_product(product))
            .await
            .map_err(|_| ExecError::Ledger(LedgerError::Timeout))??;

        match &outcome {
            CreateOutcome::Confirmed { product } => {
                info!(product_id = %product.id, "Product listed");
                if let Err(e) = self.reconciler.trigger_refresh().await {
                    warn!(product_id = %product.id, error = %e, "Refresh after listing failed");
                }
            },
            CreateOutcome::Rejected { reason } => {
                warn!(%reason, "Product listing rejected");
            },
        }

        Ok(outcome)
    }
}
