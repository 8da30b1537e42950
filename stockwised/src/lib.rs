//! Stockwise Daemon Library
//!
//! Runtime host for shopping sessions over a shared inventory ledger.
//!
//! # Architecture
//!
//! ```text
//! HTTP API → Session Registry → Session (cart + catalog + coordinator) → Ledger
//!     │
//!     └──→ Event Bus (checkouts, refreshes) → main loop logging
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Session Registry**: Memory-resident sessions keyed by id
//! - **Event Bus**: Internal communication (API → main loop)
//! - **API**: HTTP endpoints for storefront clients
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use stockwised::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::from_config(config).expect("Failed to build daemon");
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event_bus;
pub mod sessions;

// Re-exports for convenience
pub use api::{create_router, ApiState};
pub use config::{ApiConfig, Config, Environment, LedgerConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use event_bus::{CheckoutSummary, DaemonEvent, EventBus, EventReceiver};
pub use sessions::{SessionRegistry, SharedSession};
