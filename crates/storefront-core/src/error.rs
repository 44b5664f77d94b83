//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── CheckoutError    - Why a checkout was refused or aborted          │
//! │  ├── CoreError        - Account / stock / cart rule violations         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── StoreError       - Any of the above, as returned by repositories  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │        CheckoutError ───────────────┼─► StoreError → caller            │
//! │        DbError ─────────────────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every checkout failure is recoverable by the caller: the cart stays open
//! and no balance or stock has moved.

use thiserror::Error;

use crate::money::Money;
use crate::types::CartStatus;

// =============================================================================
// Checkout Error
// =============================================================================

/// Reasons a checkout is refused or rolled back.
///
/// ## User Workflow
/// ```text
/// Place order
///      │
///      ▼
/// commit_checkout(cart)
///      │
///      ├── no items ─────────────► EmptyCart           (no transaction)
///      ├── line 2: balance short ► InsufficientFunds   (rollback all)
///      ├── line 3: stock short ──► InsufficientStock   (rollback all)
///      │
///      ▼
/// UI shows the reason, cart stays open for retry
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// No authenticated user; checkout is not attempted.
    #[error("You must be signed in to place an order")]
    NotAuthenticated,

    /// Cart does not exist or belongs to another user.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Cart was already checked out.
    #[error("Cart {0} has already been purchased")]
    CartNotOpen(String),

    #[error("You have nothing in your cart!")]
    EmptyCart,

    /// The buyer's balance does not cover this line item.
    #[error("Not enough money to pay for line item {line_item_id}")]
    InsufficientFunds { line_item_id: String },

    /// The line's price does not fit in the money type.
    #[error("Line item {line_item_id} costs more than can be charged")]
    PriceOverflow { line_item_id: String },

    /// The seller cannot supply the requested quantity.
    #[error("Not enough inventory for product {product_id} from seller {seller_id}")]
    InsufficientStock {
        product_id: String,
        seller_id: String,
    },

    #[error("Coupon {0} does not exist")]
    CouponNotFound(String),

    #[error("Coupon {code} has expired")]
    CouponExpired { code: String },

    /// No line item matches the coupon's (product, seller) scope.
    #[error("Coupon {code} is for product {product_id} from seller {seller_id}, which is not in your cart")]
    CouponNotApplicable {
        code: String,
        product_id: String,
        seller_id: String,
    },
}

impl CheckoutError {
    /// The line item a mid-transaction failure is attributed to, if any.
    pub fn line_item_id(&self) -> Option<&str> {
        match self {
            CheckoutError::InsufficientFunds { line_item_id }
            | CheckoutError::PriceOverflow { line_item_id } => Some(line_item_id),
            _ => None,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations outside the checkout transaction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Account balance too low for a debit.
    ///
    /// ## When This Occurs
    /// - Withdrawing more than the balance
    /// - A checkout debit (mapped to [`CheckoutError::InsufficientFunds`])
    #[error("Insufficient funds for {user_id}: balance {available}, requested {requested}")]
    InsufficientFunds {
        user_id: String,
        available: Money,
        requested: Money,
    },

    /// Seller stock too low for a decrement.
    #[error("Insufficient stock of {product_id} from {seller_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        seller_id: String,
        available: i64,
        requested: i64,
    },

    /// A deposit would push the balance past the account maximum.
    #[error("Balance cannot exceed {max}")]
    BalanceLimitExceeded { max: Money },

    /// Cart is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing items of a purchased cart
    /// - Applying a coupon to a purchased cart
    #[error("Cart {cart_id} is {status:?}, cannot perform operation")]
    InvalidCartStatus { cart_id: String, status: CartStatus },

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is missing or soft-deleted.
    #[error("Product not available: {0}")]
    ProductUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
