//! # storefront-core: Pure Business Logic for the Storefront
//!
//! This crate holds the checkout rules of the storefront as pure functions
//! with zero I/O dependencies. The database crate drives these rules inside
//! a transaction; nothing in here ever touches a connection.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             Order-placement endpoint (collaborator)             │   │
//! │  │   identity (Option<UserId>) ──► place_order(identity, now)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  coupon   │  │ checkout  │  │   │
//! │  │   │  Cart     │  │   Money   │  │ validate  │  │ Checkout  │  │   │
//! │  │   │  Coupon   │  │ percent   │  │ discount  │  │   Plan    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                storefront-db (Database Layer)                   │   │
//! │  │      SQLite repositories + the checkout transaction             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Account, StockEntry, Coupon, Cart, Purchase, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`coupon`] - Coupon evaluation: checkout validation and discounted prices
//! - [`checkout`] - Checkout context and the per-line pricing plan
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//!
//! // $10.00 × 2 with 20% off
//! let line_total = Money::from_cents(1000).checked_mul(2).unwrap();
//! assert_eq!(line_total.apply_percent_off(20).cents(), 1600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod coupon;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutContext, CheckoutPlan, PlannedLine};
pub use error::{CheckoutError, CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct line items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Upper bound on an account balance reachable through deposits ($1,000,000.00).
///
/// Enforced by account management only; checkout credits to sellers are
/// not capped.
pub const MAX_ACCOUNT_BALANCE_CENTS: i64 = 100_000_000;

/// Highest catalog price of a single unit ($100,000.00).
pub const MAX_PRICE_CENTS: i64 = 10_000_000;
