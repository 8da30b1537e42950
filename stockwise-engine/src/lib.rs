//! Stockwise Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes a catalog snapshot or a ledger reading → returns a decision.

#![warn(clippy::all)]

pub mod error;
pub mod plan;
pub mod validate;

pub use error::{EngineError, EngineResult};
pub use plan::{plan_line, LinePlan};
pub use validate::{validate_add, AddDecision};
