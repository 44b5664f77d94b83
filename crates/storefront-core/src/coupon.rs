//! # Coupon Evaluator
//!
//! Turns an optional coupon into per-line prices.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Coupon SAVE20 → (product P1, seller S1), 20% off                       │
//! │                                                                         │
//! │  Cart line            matches?     price                                │
//! │  ──────────────────   ─────────    ─────────────────────────            │
//! │  P1 / S1  $10 × 2     yes          $20.00 × (1 − 0.20) = $16.00         │
//! │  P1 / S2  $10 × 1     no           $10.00                               │
//! │  P2 / S1  $30 × 1     no           $30.00                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout-time validation ([`validate_for_checkout`]) is authoritative.
//! [`preview_total`] only recomputes a display total and ignores expiry.

use chrono::{DateTime, Utc};

use crate::error::CheckoutError;
use crate::money::Money;
use crate::types::{CartLineItem, Coupon};

/// Checks that `coupon` may be used for a cart holding `items` at `now`.
///
/// ## Errors
/// - [`CheckoutError::CouponExpired`] if `now` is past the expiration date
/// - [`CheckoutError::CouponNotApplicable`] if no line matches the coupon's
///   (product, seller) scope
pub fn validate_for_checkout(
    coupon: &Coupon,
    items: &[CartLineItem],
    now: DateTime<Utc>,
) -> Result<(), CheckoutError> {
    if coupon.is_expired(now) {
        return Err(CheckoutError::CouponExpired {
            code: coupon.code.clone(),
        });
    }

    if !items.iter().any(|item| coupon.applies_to_line(item)) {
        return Err(CheckoutError::CouponNotApplicable {
            code: coupon.code.clone(),
            product_id: coupon.product_id.clone(),
            seller_id: coupon.seller_id.clone(),
        });
    }

    Ok(())
}

/// Price of one line item with the coupon applied where it matches.
///
/// A coupon never affects lines outside its (product, seller) scope, even
/// within the same cart.
///
/// ## Errors
/// [`CheckoutError::PriceOverflow`] if unit price × quantity does not fit.
pub fn price_after_discount(
    item: &CartLineItem,
    coupon: Option<&Coupon>,
) -> Result<Money, CheckoutError> {
    let line_total = item.line_total().ok_or_else(|| CheckoutError::PriceOverflow {
        line_item_id: item.id.clone(),
    })?;

    Ok(match coupon {
        Some(coupon) if coupon.applies_to_line(item) => {
            line_total.apply_percent_off(coupon.percent_off)
        }
        _ => line_total,
    })
}

/// Display-time cart total.
///
/// Reapplies the discount without checking expiry; the figure is a preview
/// and the checkout recomputes prices on its own.
pub fn preview_total(
    items: &[CartLineItem],
    coupon: Option<&Coupon>,
) -> Result<Money, CheckoutError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        total
            .checked_add(price_after_discount(item, coupon)?)
            .ok_or_else(|| CheckoutError::PriceOverflow {
                line_item_id: item.id.clone(),
            })
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn line(id: &str, product: &str, seller: &str, qty: i64, unit_cents: i64) -> CartLineItem {
        CartLineItem {
            id: id.to_string(),
            cart_id: "c1".to_string(),
            product_id: product.to_string(),
            seller_id: seller.to_string(),
            quantity: qty,
            unit_price_cents: unit_cents,
            added_at: Utc::now(),
        }
    }

    fn coupon(now: DateTime<Utc>, expires_in: Duration) -> Coupon {
        Coupon {
            code: "SAVE20".to_string(),
            product_id: "P1".to_string(),
            seller_id: "S1".to_string(),
            percent_off: 20,
            expiration_date: now + expires_in,
            created_at: now - Duration::days(1),
        }
    }

    #[test]
    fn test_discount_applies_only_to_matching_line() {
        let now = Utc::now();
        let coupon = coupon(now, Duration::days(7));
        let matching = line("a", "P1", "S1", 2, 1000);
        let other_seller = line("b", "P1", "S2", 1, 1000);
        let other_product = line("c", "P2", "S1", 1, 3000);

        assert_eq!(price_after_discount(&matching, Some(&coupon)).unwrap().cents(), 1600);
        assert_eq!(price_after_discount(&other_seller, Some(&coupon)).unwrap().cents(), 1000);
        assert_eq!(price_after_discount(&other_product, Some(&coupon)).unwrap().cents(), 3000);
        assert_eq!(price_after_discount(&matching, None).unwrap().cents(), 2000);
    }

    #[test]
    fn test_validate_for_checkout() {
        let now = Utc::now();
        let items = vec![line("a", "P1", "S1", 1, 500)];

        assert!(validate_for_checkout(&coupon(now, Duration::hours(1)), &items, now).is_ok());

        let expired = coupon(now, -Duration::hours(1));
        assert_eq!(
            validate_for_checkout(&expired, &items, now),
            Err(CheckoutError::CouponExpired {
                code: "SAVE20".to_string()
            })
        );

        let unrelated = vec![line("b", "P2", "S1", 1, 500)];
        assert!(matches!(
            validate_for_checkout(&coupon(now, Duration::hours(1)), &unrelated, now),
            Err(CheckoutError::CouponNotApplicable { .. })
        ));
    }

    #[test]
    fn test_expiry_checked_before_applicability() {
        let now = Utc::now();
        let expired = coupon(now, -Duration::days(1));
        let unrelated = vec![line("b", "P2", "S1", 1, 500)];

        assert!(matches!(
            validate_for_checkout(&expired, &unrelated, now),
            Err(CheckoutError::CouponExpired { .. })
        ));
    }

    #[test]
    fn test_preview_total_ignores_expiry() {
        let now = Utc::now();
        let expired = coupon(now, -Duration::days(1));
        let items = vec![line("a", "P1", "S1", 2, 1000), line("b", "P2", "S1", 1, 3000)];

        assert_eq!(preview_total(&items, Some(&expired)).unwrap().cents(), 4600);
        assert_eq!(preview_total(&items, None).unwrap().cents(), 5000);
        assert_eq!(preview_total(&[], None), Ok(Money::zero()));
    }

    #[test]
    fn test_overflowing_line_is_rejected() {
        let huge = line("big", "P9", "S1", 2, i64::MAX / 2 + 1);
        let overflow = Err(CheckoutError::PriceOverflow {
            line_item_id: "big".to_string(),
        });

        assert_eq!(price_after_discount(&huge, None), overflow);

        // Each line fits on its own but the sum does not
        let halves = vec![
            line("a", "P1", "S1", 1, i64::MAX / 2 + 1),
            line("b", "P2", "S1", 1, i64::MAX / 2 + 1),
        ];
        assert_eq!(
            preview_total(&halves, None),
            Err(CheckoutError::PriceOverflow {
                line_item_id: "b".to_string()
            })
        );
    }
}
