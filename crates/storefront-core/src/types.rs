//! # Domain Types
//!
//! Core domain types of the storefront checkout.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │   StockEntry    │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user_id        │   │  seller_id      │   │  code (unique)  │       │
//! │  │  balance_cents  │   │  product_id     │   │  product_id     │       │
//! │  │                 │   │  quantity       │   │  seller_id      │       │
//! │  │  shared, mutated│   │  available      │   │  percent_off    │       │
//! │  │  in checkout    │   │                 │   │  expiration     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Cart       │──►│  CartLineItem   │◄──│    Purchase     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  owner_user_id  │   │  product_id     │   │  line_item_id   │       │
//! │  │  status         │   │  seller_id      │   │  buyer_id       │       │
//! │  │  coupon code    │   │  quantity       │   │  cart_id        │       │
//! │  │                 │   │  unit_price     │   │  price_paid     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cents Fields
//! Rows store money as `*_cents: i64` columns; accessors return [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Account
// =============================================================================

/// A user's monetary balance.
///
/// Buyers are debited and sellers credited during checkout; the balance is
/// never negative after a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    pub user_id: String,
    pub balance_cents: i64,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Stock Entry
// =============================================================================

/// Quantity of one product offered by one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockEntry {
    pub id: String,
    pub seller_id: String,
    pub product_id: String,
    /// Units on hand; never negative.
    pub quantity: i64,
    /// False once the seller withdraws the listing.
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Coupon
// =============================================================================

/// A percentage discount scoped to exactly one (product, seller) pair.
///
/// Coupons are immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub code: String,
    pub product_id: String,
    pub seller_id: String,
    /// Whole percent, 1-100.
    pub percent_off: u32,
    pub expiration_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// A coupon is expired strictly after its expiration instant.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_date
    }

    /// Whether this coupon is scoped to the given (product, seller) pair.
    #[inline]
    pub fn applies_to(&self, product_id: &str, seller_id: &str) -> bool {
        self.product_id == product_id && self.seller_id == seller_id
    }

    #[inline]
    pub fn applies_to_line(&self, item: &CartLineItem) -> bool {
        self.applies_to(&item.product_id, &item.seller_id)
    }
}

// =============================================================================
// Cart Status
// =============================================================================

/// Lifecycle of a cart. `Purchased` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Items may be added, changed or removed.
    #[default]
    Open,
    /// Checked out; line items are frozen.
    Purchased,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "open",
            CartStatus::Purchased => "purchased",
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's shopping cart. Each user has exactly one open cart at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub owner_user_id: String,
    pub status: CartStatus,
    pub applied_coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub purchased_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Creates a new, empty open cart for `owner_user_id`.
    pub fn open_for(owner_user_id: &str, now: DateTime<Utc>) -> Self {
        Cart {
            id: Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            status: CartStatus::Open,
            applied_coupon_code: None,
            created_at: now,
            purchased_at: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == CartStatus::Open
    }
}

// =============================================================================
// Cart Line Item
// =============================================================================

/// One (product, seller, quantity) entry in a cart.
///
/// Uses the snapshot pattern: `unit_price_cents` is frozen from the catalog
/// when the item is added, so later price changes do not affect an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLineItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    pub seller_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Creates a single-unit line item at the given catalog price.
    pub fn single_unit(
        cart_id: &str,
        product_id: &str,
        seller_id: &str,
        unit_price: Money,
        now: DateTime<Utc>,
    ) -> Self {
        CartLineItem {
            id: Uuid::new_v4().to_string(),
            cart_id: cart_id.to_string(),
            product_id: product_id.to_string(),
            seller_id: seller_id.to_string(),
            quantity: 1,
            unit_price_cents: unit_price.cents(),
            added_at: now,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Undiscounted total (unit price × quantity), or `None` if it
    /// overflows.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price().checked_mul(self.quantity)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Immutable audit record of one purchased line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    pub line_item_id: String,
    pub buyer_id: String,
    pub cart_id: String,
    pub price_paid_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn price_paid(&self) -> Money {
        Money::from_cents(self.price_paid_cents)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Catalog product, read by the cart when snapshotting prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Current list price in cents.
    pub price_cents: i64,
    /// Soft-delete flag.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn coupon(expiration_date: DateTime<Utc>) -> Coupon {
        Coupon {
            code: "SPRING20".to_string(),
            product_id: "p1".to_string(),
            seller_id: "s1".to_string(),
            percent_off: 20,
            expiration_date,
            created_at: expiration_date - Duration::days(30),
        }
    }

    #[test]
    fn test_coupon_expiry_is_strict() {
        let expires = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let coupon = coupon(expires);

        assert!(!coupon.is_expired(expires - Duration::seconds(1)));
        assert!(!coupon.is_expired(expires));
        assert!(coupon.is_expired(expires + Duration::seconds(1)));
    }

    #[test]
    fn test_coupon_scope() {
        let coupon = coupon(Utc::now());
        assert!(coupon.applies_to("p1", "s1"));
        assert!(!coupon.applies_to("p1", "s2"));
        assert!(!coupon.applies_to("p2", "s1"));
    }

    #[test]
    fn test_line_item_totals() {
        let mut item = CartLineItem::single_unit("c1", "p1", "s1", Money::from_cents(1000), Utc::now());
        assert_eq!(item.quantity, 1);
        assert_eq!(item.line_total(), Some(Money::from_cents(1000)));

        item.quantity = 2;
        assert_eq!(item.unit_price_cents, 1000);
        assert_eq!(item.line_total(), Some(Money::from_cents(2000)));

        item.unit_price_cents = i64::MAX / 2 + 1;
        assert_eq!(item.line_total(), None);
    }

    #[test]
    fn test_cart_status_default_and_wire_form() {
        assert_eq!(CartStatus::default(), CartStatus::Open);
        assert_eq!(
            serde_json::to_string(&CartStatus::Purchased).unwrap(),
            "\"purchased\""
        );
        assert_eq!(CartStatus::Open.as_str(), "open");
    }

    #[test]
    fn test_new_cart_is_open_and_empty() {
        let cart = Cart::open_for("u1", Utc::now());
        assert!(cart.is_open());
        assert!(cart.applied_coupon_code.is_none());
        assert!(cart.purchased_at.is_none());
    }
}
