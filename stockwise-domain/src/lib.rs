//! Stockwise Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains products, cart lines, catalog snapshots and settlement outcomes.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod catalog;
pub mod entities;
pub mod settlement;
pub mod value_objects;

// Re-export commonly used types
pub use catalog::{CatalogSnapshot, Generation};
pub use entities::{CartLine, Category, CategoryFilter, ImageRef, NewProduct, Product};
pub use settlement::{
    CheckoutReport, FailureKind, LineAttempt, LineSettlement, LineState, RejectReason,
    SettlementOutcome,
};
pub use value_objects::{DomainError, ItemId, Price, ProductId, Quantity, SellerId, StockLevel};
