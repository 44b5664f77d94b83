//! # Checkout Coordinator
//!
//! Executes a [`CheckoutPlan`] inside one SQLite transaction.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_checkout(ctx, cart_id)                                          │
//! │       │                                                                 │
//! │       ├── load cart and line items                   (pool reads)       │
//! │       ├── CheckoutPlan::check_cart ── EmptyCart? return, no transaction │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                           (write lock held from here)  │
//! │   re-read cart, line items, applied coupon                              │
//! │   CheckoutPlan::build on what was read under the lock                   │
//! │   ┌─ for each line, in insertion order ───────────────────────────┐     │
//! │   │  debit buyer            ── short?  InsufficientFunds{line}    │     │
//! │   │  decrement seller stock ── short?  InsufficientStock{p, s}    │     │
//! │   │  credit seller                                                │     │
//! │   │  insert purchase                                              │     │
//! │   └───────────────────────────────────────────────────────────────┘     │
//! │   mark cart purchased (open → purchased, conditional)                   │
//! │   create the buyer's next open cart                                     │
//! │       │                                                                 │
//! │       ├── Ok  ──► COMMIT, return purchases                              │
//! │       └── Err ──► ROLLBACK once, return the first failure               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is built from rows read after the write lock is taken, so a
//! line item added while the checkout waited is either purchased with the
//! rest or rejected along with it. Only database statements are awaited
//! inside the transaction.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::pool::begin_immediate;
use crate::repository::account::AccountRepository;
use crate::repository::cart::CartRepository;
use crate::repository::coupon::CouponRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::purchase::PurchaseRepository;
use storefront_core::{CheckoutContext, CheckoutError, CheckoutPlan, CoreError, Purchase};

/// Runs checkouts against the database.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    accounts: AccountRepository,
    inventory: InventoryRepository,
    carts: CartRepository,
    coupons: CouponRepository,
    purchases: PurchaseRepository,
    pool: SqlitePool,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService {
            accounts: AccountRepository::new(pool.clone()),
            inventory: InventoryRepository::new(pool.clone()),
            carts: CartRepository::new(pool.clone()),
            coupons: CouponRepository::new(pool.clone()),
            purchases: PurchaseRepository::new(pool.clone()),
            pool,
        }
    }

    /// Places an order for the signed-in user's open cart.
    ///
    /// ## Errors
    /// - `CheckoutError::NotAuthenticated` when `user_id` is `None`
    /// - `CheckoutError::EmptyCart` when the user has no open cart or it
    ///   holds no items
    /// - anything [`commit_checkout`](Self::commit_checkout) returns
    pub async fn place_order(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Purchase>> {
        let ctx = CheckoutContext::from_identity(user_id, now)?;

        let cart = self
            .carts
            .get_open_cart(&ctx.buyer_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        self.commit_checkout(&ctx, &cart.id).await
    }

    /// Atomically purchases every line item of a cart.
    ///
    /// On success the cart is purchased, the buyer has a fresh open cart,
    /// and one [`Purchase`] per line item is returned in line order. On
    /// failure nothing has changed: no debit, credit, stock decrement or
    /// purchase persists and the cart stays open.
    pub async fn commit_checkout(
        &self,
        ctx: &CheckoutContext,
        cart_id: &str,
    ) -> StoreResult<Vec<Purchase>> {
        let cart = self
            .carts
            .get_by_id(cart_id)
            .await?
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))?;
        let items = self.carts.get_line_items(cart_id).await?;
        CheckoutPlan::check_cart(ctx, &cart, &items)?;

        let mut tx = begin_immediate(&self.pool).await?;
        let applied = self.checkout_in_tx(&mut tx, ctx, cart_id).await;

        match applied {
            Ok((plan, purchases)) => {
                tx.commit().await?;
                info!(
                    cart_id = %plan.cart_id,
                    buyer_id = %plan.buyer_id,
                    lines = purchases.len(),
                    total = %plan.total(),
                    "Checkout committed"
                );
                Ok(purchases)
            }
            Err(err) => {
                warn!(
                    cart_id = %cart_id,
                    line_item_id = ?err.as_checkout().and_then(|e| e.line_item_id()),
                    error = %err,
                    "Checkout aborted, rolling back"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    error!(cart_id = %cart_id, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Re-reads the cart under the write lock, plans against that snapshot
    /// and applies the plan.
    async fn checkout_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        ctx: &CheckoutContext,
        cart_id: &str,
    ) -> StoreResult<(CheckoutPlan, Vec<Purchase>)> {
        let cart = self
            .carts
            .get_by_id_in_tx(tx, cart_id)
            .await?
            .ok_or_else(|| CheckoutError::CartNotFound(cart_id.to_string()))?;
        let items = self.carts.get_line_items_in_tx(tx, cart_id).await?;

        let coupon = match &cart.applied_coupon_code {
            Some(code) => {
                let coupon = self.coupons.get_in_tx(tx, code).await?;
                if coupon.is_none() {
                    warn!(cart_id = %cart_id, code = %code, "Applied coupon no longer exists");
                }
                coupon
            }
            None => None,
        };

        let plan = CheckoutPlan::build(ctx, &cart, &items, coupon.as_ref())?;

        if let Some(reason) = &plan.rejected_coupon {
            warn!(cart_id = %cart_id, reason = %reason, "Coupon not applied at checkout");
        }

        let purchases = self.apply_plan(tx, &plan, ctx.now).await?;
        Ok((plan, purchases))
    }

    /// Every mutation of a checkout. Stops at the first failure and leaves
    /// the transaction for the caller to roll back.
    async fn apply_plan(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        plan: &CheckoutPlan,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Purchase>> {
        let mut purchases = Vec::with_capacity(plan.lines.len());

        for line in &plan.lines {
            self.accounts
                .debit(tx, &plan.buyer_id, line.price, now)
                .await
                .map_err(|err| match err {
                    StoreError::Core(CoreError::InsufficientFunds { .. }) => {
                        CheckoutError::InsufficientFunds {
                            line_item_id: line.line_item_id.clone(),
                        }
                        .into()
                    }
                    other => other,
                })?;

            self.inventory
                .reserve_and_decrement(tx, &line.seller_id, &line.product_id, line.quantity, now)
                .await
                .map_err(|err| match err {
                    StoreError::Core(CoreError::InsufficientStock { .. }) => {
                        CheckoutError::InsufficientStock {
                            product_id: line.product_id.clone(),
                            seller_id: line.seller_id.clone(),
                        }
                        .into()
                    }
                    other => other,
                })?;

            self.accounts
                .credit(tx, &line.seller_id, line.price, now)
                .await?;

            let purchase = plan.purchase_for(line, now);
            self.purchases.insert(tx, &purchase).await?;
            purchases.push(purchase);
        }

        self.carts
            .mark_purchased(tx, &plan.cart_id, &plan.buyer_id, now)
            .await?;
        self.carts
            .create_open_cart(tx, &plan.buyer_id, now)
            .await?;

        Ok(purchases)
    }
}
