//! Domain Entities for Stockwise
//!
//! Products as the ledger describes them, and the cart lines that
//! reference them.

use crate::value_objects::{DomainError, ItemId, Price, ProductId, Quantity, SellerId, StockLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Category
// =============================================================================

/// Product category.
///
/// The set is open: any unrecognised name is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Houseplants and garden stock
    Plants,
    /// Tables, chairs, lamps
    Furniture,
    /// Cookware and tableware
    Kitchen,
    /// Any other category name, lowercased
    Other(String),
}

impl Category {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Plants => "plants",
            Category::Furniture => "furniture",
            Category::Kitchen => "kitchen",
            Category::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "plants" => Category::Plants,
            "furniture" => Category::Furniture,
            "kitchen" => Category::Kitchen,
            other => Category::Other(other.to_string()),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category selector used by catalog views. `"all"` maps to [`CategoryFilter::All`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every category
    #[default]
    All,
    /// A single category
    Only(Category),
}

impl CategoryFilter {
    /// Parse a UI selector string.
    pub fn parse(selector: &str) -> Self {
        if selector.trim().eq_ignore_ascii_case("all") || selector.trim().is_empty() {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(Category::from(selector))
        }
    }

    /// Whether `category` passes this filter.
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

// =============================================================================
// Image reference
// =============================================================================

/// Where a product image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
    /// Publicly reachable URI
    Uri(String),
    /// Opaque handle into a blob store
    Blob(String),
}

// =============================================================================
// Product
// =============================================================================

/// A product record as owned by the inventory ledger.
///
/// The catalog cache holds immutable copies of these between refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// `(seller, item)` identity
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Category used by catalog views
    pub category: Category,
    /// Price of one unit
    pub unit_price: Price,
    /// Units in stock when this record was read
    pub available: StockLevel,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Optional product image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Seller-facing payload for listing a new product.
///
/// Carries no item id: the ledger assigns one when the listing is accepted
/// (see [`ItemId::next_for`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Seller listing the product
    pub seller_id: SellerId,
    /// Display name, must not be blank
    pub name: String,
    /// Category used by catalog views
    pub category: Category,
    /// Price of one unit
    pub unit_price: Price,
    /// Units in stock once listed
    pub initial_stock: StockLevel,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Optional product image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl NewProduct {
    /// Check the payload before it is sent to the ledger.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidProduct` if the name is blank
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidProduct(format!(
                "Listing for seller {} must have a name",
                self.seller_id
            )));
        }
        Ok(())
    }

    /// The product record this payload describes once listed as `item_id`.
    pub fn into_product(self, item_id: ItemId) -> Product {
        Product {
            id: ProductId {
                seller_id: self.seller_id,
                item_id,
            },
            name: self.name,
            category: self.category,
            unit_price: self.unit_price,
            available: self.initial_stock,
            description: self.description,
            image: self.image,
        }
    }
}

// =============================================================================
// CartLine
// =============================================================================

/// One product in a cart, with the requested unit count.
///
/// `product` is the snapshot observed when the line was last added to; its
/// `available` field is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product as last observed in the catalog
    pub product: Product,
    /// Units requested
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a line for `quantity` units of `product`.
    pub fn new(product: Product, quantity: Quantity) -> Self {
        Self { product, quantity }
    }

    /// Identity of this line.
    pub fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// `unit_price × quantity`.
    pub fn line_value(&self) -> Decimal {
        self.product.unit_price.times(self.quantity)
    }
}

// =============================================================================
// Tests
// =============================================================================
