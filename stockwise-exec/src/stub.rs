//! Fault-injecting ledger wrapper for testing.
//!
//! Wraps any ledger and lets a test script transport failures, hangs,
//! out-of-band stock changes and read/write interleavings without a real
//! network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Barrier;

use stockwise_domain::{NewProduct, Product, ProductId, StockLevel};
use stockwise_store::{CreateOutcome, InventoryLedger, LedgerError, WriteOutcome};

/// Ledger wrapper with one-shot fault switches and an optional standing
/// write hook.
pub struct FlakyLedger<L: InventoryLedger + ?Sized> {
    inner: Arc<L>,
    fail_next_list: AtomicBool,
    fail_next_read: AtomicBool,
    fail_next_write: AtomicBool,
    reject_next_create: AtomicBool,
    fail_health: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
    gate_after_read: Mutex<Option<Arc<Barrier>>>,
    before_write: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    before_each_write: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl<L: InventoryLedger + ?Sized> FlakyLedger<L> {
    /// Wrap a ledger with every fault switched off.
    pub fn new(inner: Arc<L>) -> Self {
        Self {
            inner,
            fail_next_list: AtomicBool::new(false),
            fail_next_read: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
            reject_next_create: AtomicBool::new(false),
            fail_health: AtomicBool::new(false),
            read_delay: Mutex::new(None),
            write_delay: Mutex::new(None),
            gate_after_read: Mutex::new(None),
            before_write: Mutex::new(None),
            before_each_write: Mutex::new(None),
        }
    }

    /// The wrapped ledger.
    pub fn inner(&self) -> &Arc<L> {
        &self.inner
    }

    /// Make the next catalog listing fail with a transport error.
    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    /// Make the next quantity read fail with a transport error.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Make the next conditional write fail with a transport error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Make the ledger refuse the next product listing.
    pub fn reject_next_create(&self) {
        self.reject_next_create.store(true, Ordering::SeqCst);
    }

    /// Make health checks fail until switched back.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.fail_health.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every quantity read.
    pub fn delay_reads(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Delay every conditional write.
    pub fn delay_writes(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// After the next read returns, wait at `barrier` before answering.
    ///
    /// Used to line up two settlements so both read before either writes.
    pub fn gate_next_read(&self, barrier: Arc<Barrier>) {
        *self.gate_after_read.lock().unwrap_or_else(PoisonError::into_inner) = Some(barrier);
    }

    /// Run `hook` right before the next conditional write reaches the ledger.
    pub fn before_next_write(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_write.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// Run `hook` right before every conditional write until cleared.
    ///
    /// Runs after any one-shot hook from [`FlakyLedger::before_next_write`].
    pub fn before_each_write(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.before_each_write.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Stop running the standing write hook.
    pub fn clear_write_hook(&self) {
        *self.before_each_write.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn delay_of(slot: &Mutex<Option<Duration>>) -> Option<Duration> {
        *slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn simulated(what: &str) -> LedgerError {
    LedgerError::Transport(format!("Simulated {} failure", what))
}

#[async_trait]
impl<L: InventoryLedger + ?Sized> InventoryLedger for FlakyLedger<L> {
    async fn list_all_products(&self) -> Result<Vec<Product>, LedgerError> {
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(simulated("catalog"));
        }
        self.inner.list_all_products().await
    }

    async fn get_current_quantity(&self, product_id: ProductId) -> Result<StockLevel, LedgerError> {
        if let Some(delay) = Self::delay_of(&self.read_delay) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(simulated("read"));
        }

        let result = self.inner.get_current_quantity(product_id).await;

        let gate = self.gate_after_read.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(barrier) = gate {
            barrier.wait().await;
        }

        result
    }

    async fn set_quantity(
        &self,
        product_id: ProductId,
        expected_prior: StockLevel,
        new_value: StockLevel,
    ) -> Result<WriteOutcome, LedgerError> {
        if let Some(delay) = Self::delay_of(&self.write_delay) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(simulated("write"));
        }

        let hook = self.before_write.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(hook) = hook {
            hook();
        }

        let standing = self.before_each_write.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(hook) = standing {
            hook();
        }

        self.inner.set_quantity(product_id, expected_prior, new_value).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<CreateOutcome, LedgerError> {
        if self.reject_next_create.swap(false, Ordering::SeqCst) {
            return Ok(CreateOutcome::Rejected {
                reason: "Simulated listing refusal".to_string(),
            });
        }
        self.inner.create_product(product).await
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(simulated("health check"));
        }
        self.inner.health_check().await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockwise_domain::{Category, Price};
    use stockwise_store::MemoryLedger;

    fn ledger() -> Arc<MemoryLedger> {
        Arc::new(MemoryLedger::with_products(vec![Product {
            id: ProductId::new(1, 1),
            name: "Teapot".to_string(),
            category: Category::Kitchen,
            unit_price: Price::new(dec!(25)).unwrap(),
            available: StockLevel(5),
            description: String::new(),
            image: None,
        }]))
    }

    #[tokio::test]
    async fn test_fail_next_read_is_one_shot() {
        let flaky = FlakyLedger::new(ledger());
        flaky.fail_next_read();

        assert!(flaky.get_current_quantity(ProductId::new(1, 1)).await.is_err());
        assert_eq!(
            flaky.get_current_quantity(ProductId::new(1, 1)).await.unwrap(),
            StockLevel(5)
        );
    }

    #[tokio::test]
    async fn test_before_write_hook_runs_once() {
        let inner = ledger();
        let flaky = FlakyLedger::new(inner.clone());
        let id = ProductId::new(1, 1);

        let meddler = inner.clone();
        flaky.before_next_write(move || {
            meddler.set_stock(id, StockLevel(2));
        });

        let outcome = flaky.set_quantity(id, StockLevel(5), StockLevel(4)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::ConflictRejected { current: StockLevel(2) });

        let outcome = flaky.set_quantity(id, StockLevel(2), StockLevel(1)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_standing_write_hook_runs_until_cleared() {
        let inner = ledger();
        let flaky = FlakyLedger::new(inner.clone());
        let id = ProductId::new(1, 1);

        // Another buyer takes one unit ahead of every write
        let rival = inner.clone();
        flaky.before_each_write(move || {
            if let Some(level) = rival.stock(id) {
                rival.set_stock(id, StockLevel(level.get().saturating_sub(1)));
            }
        });

        let outcome = flaky.set_quantity(id, StockLevel(5), StockLevel(4)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::ConflictRejected { current: StockLevel(4) });
        let outcome = flaky.set_quantity(id, StockLevel(4), StockLevel(3)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::ConflictRejected { current: StockLevel(3) });

        flaky.clear_write_hook();
        let outcome = flaky.set_quantity(id, StockLevel(3), StockLevel(2)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_unreachable_until_reset() {
        let flaky = FlakyLedger::new(ledger());
        flaky.set_unreachable(true);
        assert!(flaky.health_check().await.is_err());
        assert!(flaky.health_check().await.is_err());
        flaky.set_unreachable(false);
        assert!(flaky.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_next_list() {
        let flaky = FlakyLedger::new(ledger());
        flaky.fail_next_list();
        assert!(matches!(flaky.list_all_products().await, Err(LedgerError::Transport(_))));
        assert_eq!(flaky.list_all_products().await.unwrap().len(), 1);
    }
}
