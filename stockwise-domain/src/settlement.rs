//! Settlement outcomes and the per-line state machine.
//!
//! ```text
//! Pending ──► Confirmed
//!    │  ├───► Rejected
//!    │  └───► Failed ──(once)──► Pending
//! ```

use crate::catalog::Generation;
use crate::value_objects::{DomainError, ProductId, Quantity, StockLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Outcomes
// =============================================================================

/// Why a line was refused without writing to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The ledger holds fewer units than the line requests.
    InsufficientStock {
        /// Units the line asked for
        requested: Quantity,
        /// Units the ledger held at the read
        available: StockLevel,
    },
    /// The product no longer exists in the ledger.
    Delisted,
}

/// Why a line did not settle, in a way that may succeed on a later attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// Another writer changed the stock between our read and our write.
    Conflict,
    /// No usable answer from the ledger (transport error, timeout, bad payload).
    Transient(String),
}

/// Final result for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Stock was decremented; `new_quantity` is what the ledger now holds.
    Confirmed {
        /// Stock left after the decrement
        new_quantity: StockLevel,
    },
    /// Refused; the ledger was not written.
    Rejected(RejectReason),
    /// Not settled; the cart line is kept for a later checkout.
    Failed(FailureKind),
}

impl SettlementOutcome {
    /// Whether the line was written to the ledger.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SettlementOutcome::Confirmed { .. })
    }

    /// The line state this outcome corresponds to.
    pub fn state(&self) -> LineState {
        match self {
            SettlementOutcome::Confirmed { .. } => LineState::Confirmed,
            SettlementOutcome::Rejected(_) => LineState::Rejected,
            SettlementOutcome::Failed(_) => LineState::Failed { retried: false },
        }
    }
}

impl fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementOutcome::Confirmed { new_quantity } => write!(f, "Confirmed({})", new_quantity),
            SettlementOutcome::Rejected(RejectReason::InsufficientStock { requested, available }) => {
                write!(f, "Rejected(InsufficientStock: requested {}, available {})", requested, available)
            },
            SettlementOutcome::Rejected(RejectReason::Delisted) => write!(f, "Rejected(Delisted)"),
            SettlementOutcome::Failed(FailureKind::Conflict) => write!(f, "Failed(Conflict)"),
            SettlementOutcome::Failed(FailureKind::Transient(msg)) => write!(f, "Failed(Transient: {})", msg),
        }
    }
}

// =============================================================================
// Line state machine
// =============================================================================

/// Settlement state of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    /// Not yet attempted, or sent back for its one retry
    Pending,
    /// Decrement accepted by the ledger
    Confirmed,
    /// Refused without a write
    Rejected,
    /// Failed, possibly eligible for one retry
    Failed {
        /// Set once the line has already been sent back to `Pending`
        retried: bool,
    },
}

impl LineState {
    /// Apply a transition.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` for anything other than
    /// `Pending → {Confirmed, Rejected, Failed}` or a first `Failed → Pending`.
    pub fn transition(self, next: LineState) -> Result<LineState, DomainError> {
        match (self, next) {
            (LineState::Pending, LineState::Confirmed) => Ok(LineState::Confirmed),
            (LineState::Pending, LineState::Rejected) => Ok(LineState::Rejected),
            // `retried` is carried by the machine, not the caller
            (LineState::Pending, LineState::Failed { .. }) => Ok(LineState::Failed { retried: false }),
            (LineState::Failed { retried: false }, LineState::Pending) => Ok(LineState::Pending),
            (from, to) => Err(DomainError::InvalidStateTransition(format!(
                "{:?} -> {:?}",
                from, to
            ))),
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        match self {
            LineState::Pending => false,
            LineState::Confirmed | LineState::Rejected => true,
            LineState::Failed { retried } => *retried,
        }
    }

    /// Whether a `Failed → Pending` retry is still available.
    pub fn can_retry(&self) -> bool {
        matches!(self, LineState::Failed { retried: false })
    }
}

/// Tracks one line through settlement, including the single retry.
#[derive(Debug, Clone)]
pub struct LineAttempt {
    state: LineState,
    attempts: u8,
    has_retried: bool,
}

impl LineAttempt {
    /// A line about to be attempted for the first time.
    pub fn start() -> Self {
        Self {
            state: LineState::Pending,
            attempts: 1,
            has_retried: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> LineState {
        self.state
    }

    /// Attempts made so far, including the current one.
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Whether this line was sent back to `Pending` after a failure.
    pub fn has_retried(&self) -> bool {
        self.has_retried
    }

    /// Record the outcome of the current attempt.
    ///
    /// A failure after a retry lands in the terminal `Failed { retried: true }`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` if the line is not `Pending`.
    pub fn record(&mut self, outcome: &SettlementOutcome) -> Result<LineState, DomainError> {
        let mut next = self.state.transition(outcome.state())?;
        if let LineState::Failed { .. } = next {
            next = LineState::Failed { retried: self.has_retried };
        }
        self.state = next;
        Ok(next)
    }

    /// Move a failed line back to `Pending` for its one retry.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` if the line is not in a
    /// retryable `Failed` state.
    pub fn retry(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition(LineState::Pending)?;
        self.attempts = self.attempts.saturating_add(1);
        self.has_retried = true;
        Ok(())
    }
}

// =============================================================================
// Checkout report
// =============================================================================

/// Report entry for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettlement {
    /// Line identity
    pub product_id: ProductId,
    /// Units the line asked for
    pub requested: Quantity,
    /// Final result for the line
    pub outcome: SettlementOutcome,
    /// Ledger attempts made for this line (1 or 2).
    pub attempts: u8,
    /// Whether the line hit a write conflict and was retried.
    pub retried_after_conflict: bool,
}

/// Everything one checkout did, line by line, in cart order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReport {
    /// Catalog generation the cart was built against when checkout began.
    pub computed_against: Generation,
    /// One entry per attempted line
    pub lines: Vec<LineSettlement>,
    /// Generation installed by the post-settlement refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_to: Option<Generation>,
    /// Why the post-settlement refresh failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

impl CheckoutReport {
    /// A report for a checkout that had nothing to settle.
    pub fn empty(computed_against: Generation) -> Self {
        Self {
            computed_against,
            lines: Vec::new(),
            refreshed_to: None,
            refresh_error: None,
        }
    }

    /// Lines that were written to the ledger.
    pub fn confirmed(&self) -> impl Iterator<Item = &LineSettlement> {
        self.lines.iter().filter(|l| l.outcome.is_confirmed())
    }

    /// Lines that were not written.
    pub fn unsettled(&self) -> impl Iterator<Item = &LineSettlement> {
        self.lines.iter().filter(|l| !l.outcome.is_confirmed())
    }

    /// Whether every attempted line was confirmed.
    pub fn is_fully_settled(&self) -> bool {
        self.lines.iter().all(|l| l.outcome.is_confirmed())
    }

    /// Outcome for one product, if it was attempted.
    pub fn outcome_for(&self, product_id: ProductId) -> Option<&SettlementOutcome> {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| &l.outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================
