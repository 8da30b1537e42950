//! Value Objects for the Stockwise Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be non-negative
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Requested quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Product identifier could not be parsed
    #[error("Invalid product id: {0}")]
    InvalidProductId(String),

    /// Product payload failed validation
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Illegal settlement line state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

// =============================================================================
// Identifiers
// =============================================================================

/// Seller identifier as issued by the inventory ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SellerId(pub i64);

impl fmt::Display for SellerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identifier, unique within one seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Items a new seller's listings are numbered from.
    pub const SELLER_BLOCK: i64 = 1000;

    /// Id the ledger assigns to a seller's next listing.
    ///
    /// One past the seller's highest item, or `seller × 1000 + 1` for a
    /// seller with no items yet.
    pub fn next_for(seller_id: SellerId, highest: Option<ItemId>) -> ItemId {
        match highest {
            Some(ItemId(max)) => ItemId(max.saturating_add(1)),
            None => ItemId(seller_id.0.saturating_mul(Self::SELLER_BLOCK).saturating_add(1)),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique product identity: the `(seller, item)` pair.
///
/// Displayed and parsed as `seller:item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId {
    /// Owning seller
    pub seller_id: SellerId,
    /// Item within that seller's listing
    pub item_id: ItemId,
}

impl ProductId {
    /// Build a product id from raw ledger integers.
    pub fn new(seller_id: i64, item_id: i64) -> Self {
        Self {
            seller_id: SellerId(seller_id),
            item_id: ItemId(item_id),
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seller_id, self.item_id)
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (seller, item) = s
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidProductId(format!("Expected seller:item, got {}", s)))?;

        let seller = seller
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidProductId(format!("Bad seller id in {}", s)))?;
        let item = item
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidProductId(format!("Bad item id in {}", s)))?;

        Ok(Self::new(seller, item))
    }
}

// =============================================================================
// Price
// =============================================================================

/// Unit price of a product
///
/// # Invariants
/// - Must be >= 0 (free items are allowed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value < 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO {
            return Err(DomainError::InvalidPrice("Price must not be negative".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Zero price
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Price of `quantity` units.
    pub fn times(&self, quantity: Quantity) -> Decimal {
        self.0 * Decimal::from(quantity.get())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Requested number of units on a cart line
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Quantity = Quantity(1);

    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value == 0
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidQuantity("Quantity must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying value
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Add two quantities, saturating at `u32::MAX`.
    ///
    /// Local cart growth is unbounded; the ledger enforces real limits.
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }

    /// Units left after taking `other`, or `None` if nothing would remain.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        match self.0.checked_sub(other.0) {
            Some(0) | None => None,
            Some(rest) => Some(Quantity(rest)),
        }
    }
}

impl TryFrom<u32> for Quantity {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// StockLevel
// =============================================================================

/// Units available in the ledger for one product.
///
/// Unsigned, so a negative stock level cannot be represented. The only way
/// to lower it is [`StockLevel::checked_sub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevel(pub u32);

impl StockLevel {
    /// Empty stock.
    pub const ZERO: StockLevel = StockLevel(0);

    /// Get the underlying value
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Stock left after taking `quantity` units, or `None` if that would go below zero.
    pub fn checked_sub(self, quantity: Quantity) -> Option<StockLevel> {
        self.0.checked_sub(quantity.get()).map(StockLevel)
    }

    /// Whether `quantity` units can be taken from this level.
    pub fn covers(&self, quantity: Quantity) -> bool {
        self.0 >= quantity.get()
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_allows_zero_rejects_negative() {
        assert!(Price::new(dec!(0)).is_ok());
        assert!(Price::new(dec!(12.50)).is_ok());
        assert!(Price::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_price_times_quantity() {
        let price = Price::new(dec!(2.25)).unwrap();
        let qty = Quantity::new(4).unwrap();
        assert_eq!(price.times(qty), dec!(9.00));
    }

    #[test]
    fn test_price_deserialize_rejects_negative() {
        let parsed: Result<Price, _> = serde_json::from_str("\"-3\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(Quantity::new(0).is_err());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);

        let parsed: Result<Quantity, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_quantity_saturating_add() {
        let big = Quantity::new(u32::MAX).unwrap();
        assert_eq!(big.saturating_add(Quantity::ONE).get(), u32::MAX);
    }

    #[test]
    fn test_quantity_checked_sub() {
        let five = Quantity::new(5).unwrap();
        assert_eq!(five.checked_sub(Quantity::new(3).unwrap()), Some(Quantity::new(2).unwrap()));
        assert_eq!(five.checked_sub(five), None);
        assert_eq!(five.checked_sub(Quantity::new(6).unwrap()), None);
    }

    #[test]
    fn test_stock_level_checked_sub() {
        let stock = StockLevel(10);
        assert_eq!(stock.checked_sub(Quantity::new(3).unwrap()), Some(StockLevel(7)));
        assert_eq!(stock.checked_sub(Quantity::new(10).unwrap()), Some(StockLevel::ZERO));
        assert_eq!(stock.checked_sub(Quantity::new(11).unwrap()), None);
    }

    #[test]
    fn test_item_id_for_first_listing() {
        assert_eq!(ItemId::next_for(SellerId(4), None), ItemId(4001));
    }

    #[test]
    fn test_item_id_follows_highest() {
        assert_eq!(ItemId::next_for(SellerId(4), Some(ItemId(4007))), ItemId(4008));
        // Hand-seeded ids outside the seller block still count
        assert_eq!(ItemId::next_for(SellerId(4), Some(ItemId(2))), ItemId(3));
    }

    #[test]
    fn test_product_id_display_and_parse() {
        let id = ProductId::new(4, 17);
        assert_eq!(id.to_string(), "4:17");
        assert_eq!("4:17".parse::<ProductId>().unwrap(), id);
        assert!("417".parse::<ProductId>().is_err());
        assert!("a:17".parse::<ProductId>().is_err());
    }
}
