//! Settlement coordinator: turns cart lines into ledger decrements.
//!
//! # Flow (per line, in cart order, one at a time)
//!
//! ```text
//! read ledger → plan → conditional write → Confirmed  → settle cart line
//!                 │            │
//!                 │            └─ conflict → retry once → Rejected / Failed(Conflict)
//!                 └─ not enough stock → Rejected (no write)
//! ```
//!
//! Lines are independent: there is no all-or-nothing checkout. A dropped
//! checkout future leaves already confirmed lines cleared and the rest in the
//! cart.
//!
//! Checkouts of one session run one at a time. A second checkout waits for
//! the first and then only sees what the first left in the cart.

use std::future::Future;
use std::sync::Arc;

use stockwise_domain::{
    CartLine, CheckoutReport, FailureKind, LineAttempt, LineSettlement, ProductId, Quantity,
    RejectReason, SettlementOutcome,
};
use stockwise_engine::{plan_line, LinePlan};
use stockwise_store::{CartStore, InventoryLedger, LedgerError, WriteOutcome};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ExecConfig;
use crate::error::{ExecError, ExecResult};
use crate::reconciler::Reconciler;

/// Settles a session's cart against the inventory ledger.
pub struct SettlementCoordinator<L: InventoryLedger + ?Sized> {
    ledger: Arc<L>,
    reconciler: Arc<Reconciler<L>>,
    config: ExecConfig,
    in_progress: Mutex<()>,
}

impl<L: InventoryLedger + ?Sized> SettlementCoordinator<L> {
    /// Create a coordinator.
    pub fn new(ledger: Arc<L>, reconciler: Arc<Reconciler<L>>, config: ExecConfig) -> Self {
        Self {
            ledger,
            reconciler,
            config,
            in_progress: Mutex::new(()),
        }
    }

    fn cart(&self) -> &CartStore {
        self.reconciler.cart()
    }

    /// Settle every line currently in the cart.
    ///
    /// Returns one entry per attempted line. Fails as a whole only when the
    /// ledger cannot be reached before the first line, in which case the cart
    /// is left exactly as it was.
    pub async fn checkout(&self) -> ExecResult<CheckoutReport> {
        let _running = self.in_progress.lock().await;

        let lines = self.cart().lines();
        let computed_against = self.reconciler.catalog().generation();

        if lines.is_empty() {
            debug!("Checkout of empty cart");
            return Ok(CheckoutReport::empty(computed_against));
        }

        self.bounded(self.ledger.health_check()).await.map_err(|e| {
            error!(error = %e, lines = lines.len(), "Ledger unreachable, checkout aborted");
            ExecError::LedgerUnavailable(e)
        })?;

        info!(lines = lines.len(), generation = %computed_against, "Checkout started");

        let mut settled = Vec::with_capacity(lines.len());
        for line in &lines {
            let product_id = line.product_id();
            if !self.cart().contains(product_id) {
                debug!(%product_id, "Line left the cart before its turn, skipping");
                continue;
            }

            let settlement = match self.settle_line(line).await {
                Ok(settlement) => settlement,
                Err(e) => {
                    error!(%product_id, error = %e, "Line settlement aborted");
                    LineSettlement {
                        product_id,
                        requested: line.quantity,
                        outcome: SettlementOutcome::Failed(FailureKind::Transient(e.to_string())),
                        attempts: 1,
                        retried_after_conflict: false,
                    }
                },
            };
            settled.push(settlement);
        }

        let mut report = CheckoutReport {
            computed_against,
            lines: settled,
            refreshed_to: None,
            refresh_error: None,
        };

        // Once per checkout, whatever the line outcomes
        match self.reconciler.trigger_refresh().await {
            Ok(generation) => report.refreshed_to = Some(generation),
            Err(e) => report.refresh_error = Some(e.to_string()),
        }

        info!(
            confirmed = report.confirmed().count(),
            unsettled = report.unsettled().count(),
            refreshed_to = ?report.refreshed_to,
            "Checkout finished"
        );

        Ok(report)
    }

    /// Settle one line, retrying once after a write conflict.
    async fn settle_line(&self, line: &CartLine) -> ExecResult<LineSettlement> {
        let product_id = line.product_id();
        let requested = line.quantity;
        let mut attempt = LineAttempt::start();

        loop {
            let outcome = self.attempt_once(product_id, requested).await;
            let state = attempt.record(&outcome)?;

            let conflicted = matches!(outcome, SettlementOutcome::Failed(FailureKind::Conflict));
            if conflicted
                && state.can_retry()
                && u32::from(attempt.attempts()) <= self.config.max_conflict_retries
            {
                warn!(%product_id, attempt = attempt.attempts(), "Write conflict, retrying line");
                attempt.retry()?;
                continue;
            }

            match &outcome {
                SettlementOutcome::Confirmed { new_quantity } => {
                    // Only the settled units leave; later adds stay for the next checkout
                    let remaining = self.cart().settle_line(product_id, requested);
                    info!(%product_id, %requested, %new_quantity, ?remaining, "Line confirmed");
                },
                SettlementOutcome::Rejected(reason) => {
                    warn!(%product_id, %requested, ?reason, "Line rejected");
                },
                SettlementOutcome::Failed(kind) => {
                    warn!(%product_id, %requested, ?kind, "Line failed");
                },
            }

            return Ok(LineSettlement {
                product_id,
                requested,
                outcome,
                attempts: attempt.attempts(),
                retried_after_conflict: attempt.has_retried(),
            });
        }
    }

    /// One read-plan-write pass.
    async fn attempt_once(&self, product_id: ProductId, requested: Quantity) -> SettlementOutcome {
        // Fresh read; the catalog snapshot may be stale
        let authoritative = match self.bounded(self.ledger.get_current_quantity(product_id)).await {
            Ok(level) => level,
            Err(LedgerError::NotFound(_)) => return SettlementOutcome::Rejected(RejectReason::Delisted),
            Err(e) => return SettlementOutcome::Failed(FailureKind::Transient(e.to_string())),
        };

        let (expected_prior, new_value) = match plan_line(authoritative, requested) {
            LinePlan::Decrement {
                expected_prior,
                new_value,
            } => (expected_prior, new_value),
            LinePlan::Insufficient {
                requested,
                available,
            } => {
                return SettlementOutcome::Rejected(RejectReason::InsufficientStock {
                    requested,
                    available,
                })
            },
        };

        match self
            .bounded(self.ledger.set_quantity(product_id, expected_prior, new_value))
            .await
        {
            Ok(WriteOutcome::Confirmed) => SettlementOutcome::Confirmed {
                new_quantity: new_value,
            },
            Ok(WriteOutcome::ConflictRejected { current }) => {
                debug!(%product_id, expected = %expected_prior, %current, "Stock moved under us");
                SettlementOutcome::Failed(FailureKind::Conflict)
            },
            Err(LedgerError::NotFound(_)) => SettlementOutcome::Rejected(RejectReason::Delisted),
            Err(e) => SettlementOutcome::Failed(FailureKind::Transient(e.to_string())),
        }
    }

    /// Apply the ledger timeout. A timeout is a transport failure, never a rejection.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        timeout(self.config.ledger_timeout, call)
            .await
            .unwrap_or(Err(LedgerError::Timeout))
    }
}
