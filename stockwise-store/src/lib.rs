//! Stockwise Storage Layer
//!
//! Local session state and the port to the authoritative inventory ledger.
//!
//! # Architecture
//!
//! - **Ledger trait**: The interface to the authoritative stock ledger (port)
//! - **In-memory ledger**: Conditional-write ledger for tests and development
//! - **Cart store**: Per-session cart, purely local
//! - **Catalog cache**: Copy-on-write product snapshot with a generation counter
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stockwise_store::{CatalogCache, MemoryLedger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let catalog = CatalogCache::new(ledger, Duration::from_secs(5));
//!
//!     let generation = catalog.refresh().await.unwrap();
//!     println!("Catalog at {}", generation);
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod cart;
mod catalog;
mod error;
mod ledger;
mod memory;

// Re-exports
pub use cart::CartStore;
pub use catalog::CatalogCache;
pub use error::{CacheError, LedgerError};
pub use ledger::{CreateOutcome, InventoryLedger, WriteOutcome};
pub use memory::MemoryLedger;
