//! # Checkout Planning
//!
//! The pure half of checkout: who is buying and what each line costs. The
//! database crate executes a [`CheckoutPlan`] line by line inside one
//! transaction.
//!
//! ## Plan → Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutPlan::check_cart(ctx, cart, items)      ← THIS MODULE          │
//! │       ├── cart owned by ctx.buyer_id and open?                          │
//! │       └── any items?                     (EmptyCart, no transaction)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE, re-read the cart       ← storefront-db                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutPlan::build(ctx, cart, items, coupon)   ← THIS MODULE          │
//! │       ├── check_cart again on the locked snapshot                       │
//! │       ├── coupon usable at ctx.now?      (unusable → full price)        │
//! │       └── price every line, in insertion order (checked arithmetic)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │    for line in plan.lines:                                              │
//! │      debit buyer → decrement stock → credit seller → insert purchase    │
//! │    mark cart purchased, open a new cart                                 │
//! │  COMMIT (or ROLLBACK on the first failure)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coupon::{price_after_discount, validate_for_checkout};
use crate::error::CheckoutError;
use crate::money::Money;
use crate::types::{Cart, CartLineItem, CartStatus, Coupon, Purchase};

// =============================================================================
// Checkout Context
// =============================================================================

/// Explicit request context for a checkout: the authenticated buyer and the
/// instant used for coupon expiry and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutContext {
    pub buyer_id: String,
    pub now: DateTime<Utc>,
}

impl CheckoutContext {
    pub fn new(buyer_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        CheckoutContext {
            buyer_id: buyer_id.into(),
            now,
        }
    }

    /// Builds the context from the identity collaborator's answer.
    ///
    /// ## Errors
    /// [`CheckoutError::NotAuthenticated`] when there is no signed-in user.
    pub fn from_identity(
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, CheckoutError> {
        match user_id {
            Some(id) if !id.trim().is_empty() => Ok(CheckoutContext::new(id, now)),
            _ => Err(CheckoutError::NotAuthenticated),
        }
    }
}

// =============================================================================
// Checkout Plan
// =============================================================================

/// One priced line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLine {
    pub line_item_id: String,
    pub product_id: String,
    pub seller_id: String,
    pub quantity: i64,
    /// What the buyer pays and the seller receives for this line.
    pub price: Money,
    /// Whether the coupon discounted this line.
    pub discounted: bool,
}

/// Priced checkout of one cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub cart_id: String,
    pub buyer_id: String,
    /// Lines in cart insertion order.
    pub lines: Vec<PlannedLine>,
    /// Coupon actually applied to the prices.
    pub applied_coupon: Option<String>,
    /// Why the cart's coupon was not applied, if it had one.
    pub rejected_coupon: Option<CheckoutError>,
}

impl CheckoutPlan {
    /// Checks that `ctx.buyer_id` may check out `cart` holding `items`.
    ///
    /// ## Errors
    /// - [`CheckoutError::CartNotFound`] if the cart belongs to someone else
    /// - [`CheckoutError::CartNotOpen`] if it was already purchased
    /// - [`CheckoutError::EmptyCart`] if it has no line items
    pub fn check_cart(
        ctx: &CheckoutContext,
        cart: &Cart,
        items: &[CartLineItem],
    ) -> Result<(), CheckoutError> {
        if cart.owner_user_id != ctx.buyer_id {
            return Err(CheckoutError::CartNotFound(cart.id.clone()));
        }
        if cart.status != CartStatus::Open {
            return Err(CheckoutError::CartNotOpen(cart.id.clone()));
        }
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(())
    }

    /// Prices a cart for checkout.
    ///
    /// An expired or out-of-scope coupon does not fail the checkout; the
    /// lines are simply charged full price and the reason is kept in
    /// [`CheckoutPlan::rejected_coupon`].
    ///
    /// ## Errors
    /// - anything [`check_cart`](Self::check_cart) returns
    /// - [`CheckoutError::PriceOverflow`] if a line or the cart total does
    ///   not fit in [`Money`]
    pub fn build(
        ctx: &CheckoutContext,
        cart: &Cart,
        items: &[CartLineItem],
        coupon: Option<&Coupon>,
    ) -> Result<Self, CheckoutError> {
        Self::check_cart(ctx, cart, items)?;

        let (coupon, rejected_coupon) = match coupon {
            Some(coupon) => match validate_for_checkout(coupon, items, ctx.now) {
                Ok(()) => (Some(coupon), None),
                Err(reason) => (None, Some(reason)),
            },
            None => (None, None),
        };

        let mut lines = Vec::with_capacity(items.len());
        let mut total = Money::zero();
        for item in items {
            let price = price_after_discount(item, coupon)?;
            total = total
                .checked_add(price)
                .ok_or_else(|| CheckoutError::PriceOverflow {
                    line_item_id: item.id.clone(),
                })?;

            lines.push(PlannedLine {
                line_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                seller_id: item.seller_id.clone(),
                quantity: item.quantity,
                price,
                discounted: coupon.is_some_and(|c| c.applies_to_line(item)),
            });
        }

        Ok(CheckoutPlan {
            cart_id: cart.id.clone(),
            buyer_id: ctx.buyer_id.clone(),
            lines,
            applied_coupon: coupon.map(|c| c.code.clone()),
            rejected_coupon,
        })
    }

    /// Total debited from the buyer. Never overflows for a built plan.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|line| line.price).sum()
    }

    /// The audit record for a planned line.
    pub fn purchase_for(&self, line: &PlannedLine, now: DateTime<Utc>) -> Purchase {
        Purchase {
            id: Uuid::new_v4().to_string(),
            line_item_id: line.line_item_id.clone(),
            buyer_id: self.buyer_id.clone(),
            cart_id: self.cart_id.clone(),
            price_paid_cents: line.price.cents(),
            created_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cart(owner: &str) -> Cart {
        Cart {
            id: "c1".to_string(),
            owner_user_id: owner.to_string(),
            status: CartStatus::Open,
            applied_coupon_code: None,
            created_at: Utc::now(),
            purchased_at: None,
        }
    }

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
    fn test_context_requires_identity() {
        let now = Utc::now();
        assert_eq!(
            CheckoutContext::from_identity(None, now),
            Err(CheckoutError::NotAuthenticated)
        );
        assert_eq!(
            CheckoutContext::from_identity(Some("  "), now),
            Err(CheckoutError::NotAuthenticated)
        );
        assert_eq!(
            CheckoutContext::from_identity(Some("u1"), now).unwrap().buyer_id,
            "u1"
        );
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let ctx = CheckoutContext::new("u1", Utc::now());
        assert_eq!(
            CheckoutPlan::build(&ctx, &cart("u1"), &[], None),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_foreign_or_purchased_cart_is_rejected() {
        let ctx = CheckoutContext::new("u1", Utc::now());
        let items = vec![line("a", "P1", "S1", 1, 100)];

        assert_eq!(
            CheckoutPlan::build(&ctx, &cart("u2"), &items, None),
            Err(CheckoutError::CartNotFound("c1".to_string()))
        );

        let mut purchased = cart("u1");
        purchased.status = CartStatus::Purchased;
        assert_eq!(
            CheckoutPlan::build(&ctx, &purchased, &items, None),
            Err(CheckoutError::CartNotOpen("c1".to_string()))
        );
    }

    #[test]
    fn test_plan_prices_lines_in_order() {
        let now = Utc::now();
        let ctx = CheckoutContext::new("buyer", now);
        let items = vec![
            line("a", "P1", "S1", 2, 1000),
            line("b", "P2", "S2", 1, 3000),
            line("c", "P3", "S1", 3, 250),
        ];
        let coupon = coupon(now, Duration::days(1));

        let plan = CheckoutPlan::build(&ctx, &cart("buyer"), &items, Some(&coupon)).unwrap();

        let ids: Vec<&str> = plan.lines.iter().map(|l| l.line_item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(plan.lines[0].price.cents(), 1600);
        assert!(plan.lines[0].discounted);
        assert_eq!(plan.lines[1].price.cents(), 3000);
        assert!(!plan.lines[1].discounted);
        assert_eq!(plan.total().cents(), 1600 + 3000 + 750);
        assert_eq!(plan.applied_coupon.as_deref(), Some("SAVE20"));
        assert!(plan.rejected_coupon.is_none());
    }

    #[test]
    fn test_expired_coupon_charges_full_price() {
        let now = Utc::now();
        let ctx = CheckoutContext::new("buyer", now);
        let items = vec![line("a", "P1", "S1", 2, 1000)];
        let expired = coupon(now, -Duration::minutes(5));

        let plan = CheckoutPlan::build(&ctx, &cart("buyer"), &items, Some(&expired)).unwrap();

        assert_eq!(plan.total().cents(), 2000);
        assert!(plan.applied_coupon.is_none());
        assert!(matches!(
            plan.rejected_coupon,
            Some(CheckoutError::CouponExpired { .. })
        ));
    }

    #[test]
    fn test_overflowing_price_is_rejected() {
        let ctx = CheckoutContext::new("buyer", Utc::now());
        let huge = i64::MAX / 2 + 1;

        let items = vec![line("a", "P1", "S1", 2, huge)];
        assert_eq!(
            CheckoutPlan::build(&ctx, &cart("buyer"), &items, None),
            Err(CheckoutError::PriceOverflow {
                line_item_id: "a".to_string()
            })
        );

        let items = vec![line("a", "P1", "S1", 1, huge), line("b", "P2", "S1", 1, huge)];
        assert_eq!(
            CheckoutPlan::build(&ctx, &cart("buyer"), &items, None),
            Err(CheckoutError::PriceOverflow {
                line_item_id: "b".to_string()
            })
        );
    }

    #[test]
    fn test_check_cart_accepts_open_owned_cart() {
        let ctx = CheckoutContext::new("u1", Utc::now());
        let items = vec![line("a", "P1", "S1", 1, 100)];
        assert!(CheckoutPlan::check_cart(&ctx, &cart("u1"), &items).is_ok());
        assert_eq!(
            CheckoutPlan::check_cart(&ctx, &cart("u1"), &[]),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_purchase_records_price_paid() {
        let now = Utc::now();
        let ctx = CheckoutContext::new("buyer", now);
        let items = vec![line("a", "P1", "S1", 2, 1000)];
        let coupon = coupon(now, Duration::days(1));
        let plan = CheckoutPlan::build(&ctx, &cart("buyer"), &items, Some(&coupon)).unwrap();

        let purchase = plan.purchase_for(&plan.lines[0], now);

        assert_eq!(purchase.line_item_id, "a");
        assert_eq!(purchase.buyer_id, "buyer");
        assert_eq!(purchase.cart_id, "c1");
        assert_eq!(purchase.price_paid_cents, 1600);
    }
}
