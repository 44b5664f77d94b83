//! # Validation Module
//!
//! Input validation for the operations around checkout.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler (collaborator)                               │
//! │  └── Form parsing, field presence                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation (quantities, amounts, coupon codes)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (balance_cents >= 0), CHECK (quantity >= 0)                 │
//! │  ├── UNIQUE (seller_id, product_id), one open cart per user            │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_ACCOUNT_BALANCE_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock quantity (zero allowed).
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items); the upper
/// bound is [`MAX_PRICE_CENTS`].
///
/// ```rust
/// use storefront_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a deposit or withdrawal amount; must be positive.
pub fn validate_transfer_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a coupon's percent off (1 to 100).
pub fn validate_percent_off(percent: u32) -> ValidationResult<()> {
    if percent == 0 || percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "percent_off".to_string(),
            min: 1,
            max: 100,
        });
    }

    Ok(())
}

/// Checks that depositing `amount` keeps the balance within
/// [`MAX_ACCOUNT_BALANCE_CENTS`] and returns the new balance.
///
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::validation::validate_deposit;
///
/// let new_balance = validate_deposit(Money::from_cents(500), Money::from_cents(250)).unwrap();
/// assert_eq!(new_balance.cents(), 750);
/// ```
pub fn validate_deposit(balance: Money, amount: Money) -> CoreResult<Money> {
    validate_transfer_amount(amount)?;

    let max = Money::from_cents(MAX_ACCOUNT_BALANCE_CENTS);
    let new_balance = balance + amount;
    if new_balance > max {
        return Err(CoreError::BalanceLimitExceeded { max });
    }

    Ok(new_balance)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 32 characters
/// - Letters and digits only
///
/// ## Returns
/// The trimmed code.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: 32,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(code.to_string())
}

/// Validates a product name (1 to 200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line item fits in the cart.
pub fn validate_cart_size(current_items: usize) -> CoreResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
