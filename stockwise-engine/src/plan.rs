//! Per-line settlement planning.
//!
//! Given an authoritative stock reading, decide whether a line can be
//! decremented and what the conditional write must assert.

use serde::Serialize;
use stockwise_domain::{Quantity, RejectReason, StockLevel};

/// What to do with one cart line after reading the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinePlan {
    /// Issue a conditional write: `expected_prior` must still be stored.
    Decrement {
        expected_prior: StockLevel,
        new_value: StockLevel,
    },
    /// Not enough stock. No write may be issued.
    Insufficient {
        requested: Quantity,
        available: StockLevel,
    },
}

impl LinePlan {
    /// Rejection reason for an `Insufficient` plan.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match *self {
            LinePlan::Insufficient { requested, available } => {
                Some(RejectReason::InsufficientStock { requested, available })
            },
            LinePlan::Decrement { .. } => None,
        }
    }
}

/// Plan a line against the stock level just read from the ledger.
pub fn plan_line(authoritative: StockLevel, requested: Quantity) -> LinePlan {
    match authoritative.checked_sub(requested) {
        Some(new_value) => LinePlan::Decrement {
            expected_prior: authoritative,
            new_value,
        },
        None => LinePlan::Insufficient {
            requested,
            available: authoritative,
        },
    }
}
