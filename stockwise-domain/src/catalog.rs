//! Catalog snapshots.
//!
//! A snapshot is an immutable, timestamped copy of the ledger's product set,
//! stamped with a monotonic generation so that any decision computed from it
//! can say how fresh its inputs were.

use crate::entities::{CategoryFilter, Product};
use crate::value_objects::{ProductId, SellerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Monotonic catalog version. Generation 0 is the empty catalog before any refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation before any successful refresh.
    pub const INITIAL: Generation = Generation(0);

    /// The generation that follows this one.
    pub fn next(self) -> Generation {
        Generation(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Immutable view of the product set at one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    generation: Generation,
    fetched_at: DateTime<Utc>,
    products: BTreeMap<ProductId, Product>,
}

impl CatalogSnapshot {
    /// The empty generation-0 snapshot a session starts with.
    pub fn empty() -> Self {
        Self {
            generation: Generation::INITIAL,
            fetched_at: Utc::now(),
            products: BTreeMap::new(),
        }
    }

    /// Build a snapshot from a freshly fetched product list.
    ///
    /// If the list holds duplicate ids the last record wins.
    pub fn new(generation: Generation, products: Vec<Product>) -> Self {
        Self {
            generation,
            fetched_at: Utc::now(),
            products: products.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Generation this snapshot was installed as.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// When the product list was fetched.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Look up one product.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the snapshot has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Products passing a category filter.
    pub fn filter_by_category(&self, filter: &CategoryFilter) -> Vec<Product> {
        self.products
            .values()
            .filter(|p| filter.matches(&p.category))
            .cloned()
            .collect()
    }

    /// Products listed by one seller.
    pub fn filter_by_seller(&self, seller_id: SellerId) -> Vec<Product> {
        self.products
            .values()
            .filter(|p| p.id.seller_id == seller_id)
            .cloned()
            .collect()
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
