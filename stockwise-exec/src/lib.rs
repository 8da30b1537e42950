//! Stockwise Execution Layer
//!
//! Cart reconciliation and checkout settlement against the inventory ledger.
//!
//! # Architecture
//!
//! ```text
//! Session → Reconciler → CartStore / CatalogCache
//!        └→ SettlementCoordinator → InventoryLedger (conditional writes)
//! ```
//!
//! # Components
//!
//! - **Reconciler**: Validates cart mutations against the catalog snapshot
//! - **Settlement Coordinator**: Per-line read, plan, conditional write, one retry
//! - **Session**: Explicit per-shopper context owning one cart and one catalog
//! - **Stub**: Fault-injecting ledger wrapper for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockwise_exec::{ExecConfig, Session};
//! use stockwise_store::MemoryLedger;
//!
//! let ledger = Arc::new(MemoryLedger::with_products(products));
//! let session = Session::open(ledger, ExecConfig::default()).await;
//!
//! session.add_line(product_id, Quantity::ONE)?;
//! let report = session.checkout().await?;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod stub;

// Re-exports for convenience
pub use config::ExecConfig;
pub use coordinator::SettlementCoordinator;
pub use error::{ExecError, ExecResult};
pub use reconciler::Reconciler;
pub use session::{CartView, Session};
pub use stub::FlakyLedger;
