//! Product catalog cache.
//!
//! Holds the current `CatalogSnapshot` behind an `Arc` that is swapped in
//! whole on refresh. Readers clone the `Arc` and keep a consistent view even
//! while a refresh installs the next generation.
//!
//! Each refresh takes a ticket before fetching. A fetch that finishes after a
//! later-ticketed fetch was already installed is dropped, so a higher
//! generation never holds older ledger data.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use stockwise_domain::{
    CatalogSnapshot, CategoryFilter, Generation, Product, ProductId, SellerId,
};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{CacheError, LedgerError};
use crate::ledger::InventoryLedger;

/// Capacity of the generation notification channel.
const NOTIFY_CAPACITY: usize = 16;

/// The installed snapshot and the ticket of the fetch that produced it.
struct Installed {
    snapshot: Arc<CatalogSnapshot>,
    ticket: u64,
}

/// Read-mostly product snapshot refreshed from the ledger on demand.
pub struct CatalogCache<L: InventoryLedger + ?Sized> {
    ledger: Arc<L>,
    current: RwLock<Installed>,
    tickets: AtomicU64,
    refresh_timeout: Duration,
    notify: broadcast::Sender<Generation>,
}

impl<L: InventoryLedger + ?Sized> CatalogCache<L> {
    /// Create a cache at generation 0 (empty).
    pub fn new(ledger: Arc<L>, refresh_timeout: Duration) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            ledger,
            current: RwLock::new(Installed {
                snapshot: Arc::new(CatalogSnapshot::empty()),
                ticket: 0,
            }),
            tickets: AtomicU64::new(0),
            refresh_timeout,
            notify,
        }
    }

    /// Fetch the full product set and install it as the next generation.
    ///
    /// On any failure the installed snapshot is left untouched. If a refresh
    /// that started later has already installed its result, this one is
    /// discarded and the installed generation is returned.
    pub async fn refresh(&self) -> Result<Generation, CacheError> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = match timeout(self.refresh_timeout, self.ledger.list_all_products()).await {
            Ok(Ok(products)) => check_payload(products),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LedgerError::Timeout),
        };

        let products = match fetched {
            Ok(products) => products,
            Err(source) => {
                let generation = self.generation();
                warn!(%generation, error = %source, "Catalog refresh failed, keeping snapshot");
                return Err(CacheError::RefreshFailed { generation, source });
            },
        };

        let count = products.len();
        let generation = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if current.ticket > ticket {
                let generation = current.snapshot.generation();
                debug!(%generation, ticket, installed = current.ticket, "Superseded fetch dropped");
                return Ok(generation);
            }
            let next = current.snapshot.generation().next();
            *current = Installed {
                snapshot: Arc::new(CatalogSnapshot::new(next, products)),
                ticket,
            };
            next
        };

        info!(%generation, products = count, "Catalog refreshed");

        // No subscribers is fine
        let _ = self.notify.send(generation);

        Ok(generation)
    }

    /// The installed snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).snapshot.clone()
    }

    /// Generation of the installed snapshot.
    pub fn generation(&self) -> Generation {
        self.snapshot().generation()
    }

    /// Look up one product in the installed snapshot. Never calls the ledger.
    pub fn lookup(&self, product_id: ProductId) -> Option<Product> {
        self.snapshot().get(&product_id).cloned()
    }

    /// Products in a category (or all of them).
    pub fn filter_by_category(&self, filter: &CategoryFilter) -> Vec<Product> {
        self.snapshot().filter_by_category(filter)
    }

    /// Products listed by one seller.
    pub fn filter_by_seller(&self, seller_id: SellerId) -> Vec<Product> {
        self.snapshot().filter_by_seller(seller_id)
    }

    /// Receive every generation installed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Generation> {
        self.notify.subscribe()
    }
}

/// Reject payloads that list the same product twice.
fn check_payload(products: Vec<Product>) -> Result<Vec<Product>, LedgerError> {
    let mut seen = HashSet::with_capacity(products.len());
    for product in &products {
        if !seen.insert(product.id) {
            return Err(LedgerError::Malformed(format!(
                "Product {} listed more than once",
                product.id
            )));
        }
    }
    Ok(products)
}
